//! Markdown for the paper table rows and the generated README.

use crate::domain::model::{Paper, PaperIndex};
use chrono::NaiveDate;
use std::fmt::Write;

#[derive(Debug, Clone)]
pub struct ReadmeSettings<'a> {
    pub description: &'a str,
    pub github_repo: &'a str,
    pub seed_lookback_days: i64,
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// One table row, newline-terminated. The date is always the first cell.
pub fn format_row(paper: &Paper) -> String {
    let code_cell = match &paper.code_url {
        Some(url) => format!("**[{}]({})**", url, url),
        None => "null".to_string(),
    };
    format!(
        "|**{}**|**{}**|{}|{}|[{}]({})|{}|\n",
        paper.updated.format("%Y-%m-%d"),
        escape_cell(&paper.title),
        escape_cell(&paper.categories.join(", ")),
        escape_cell(&paper.summary),
        paper.id,
        paper.abs_url,
        code_cell
    )
}

fn date_cell(row: &str) -> &str {
    row.split('|').nth(1).unwrap_or("")
}

fn lookback_phrase(days: i64) -> String {
    if days > 0 && days % 365 == 0 {
        let years = days / 365;
        if years == 1 {
            "the last year".to_string()
        } else {
            format!("the last {} years", years)
        }
    } else {
        format!("the last {} days", days)
    }
}

pub fn render_readme(index: &PaperIndex, today: NaiveDate, settings: &ReadmeSettings<'_>) -> String {
    let stamp = today.format("%Y.%m.%d").to_string();
    let anchor = today.format("%Y%m%d").to_string();
    let repo = settings.github_repo;
    let mut md = String::new();

    // Writing into a String cannot fail.
    let _ = write!(md, "## Last updated on {}\n\n", stamp);

    md.push_str("\n## About\n");
    let _ = writeln!(md, "{}", settings.description);
    let _ = writeln!(
        md,
        "- **Seeding:** Initial population covers papers from {} (run with --seed).",
        lookback_phrase(settings.seed_lookback_days)
    );
    md.push_str("- **Daily Updates:** Adds papers since the last run (stored in last_run.txt).\n");
    md.push_str("- **Backfill:** Edit last_run.txt to an earlier date to fetch missed papers.\n\n");

    for (topic, papers) in index {
        if papers.is_empty() {
            continue;
        }
        let _ = write!(md, "## {}\n\n", topic);
        md.push_str("| Date | Title | Categories | Abstract | PDF | Code |\n");
        md.push_str("|:-----|:------|:-----------|:---------|:----|:----|\n");

        let mut rows: Vec<&String> = papers.values().collect();
        rows.sort_by(|a, b| date_cell(b).cmp(date_cell(a)));
        for row in rows {
            md.push_str(row);
        }

        let _ = write!(
            md,
            "<p align=right>(<a href=#Updated-on-{}>back to top</a>)</p>\n\n",
            anchor
        );
    }

    let _ = writeln!(
        md,
        "[contributors-shield]: https://img.shields.io/github/contributors/{}.svg?style=for-the-badge",
        repo
    );
    let _ = writeln!(md, "[contributors-url]: https://github.com/{}/graphs/contributors", repo);
    let _ = writeln!(
        md,
        "[forks-shield]: https://img.shields.io/github/forks/{}.svg?style=for-the-badge",
        repo
    );
    let _ = writeln!(md, "[forks-url]: https://github.com/{}/network/members", repo);
    let _ = writeln!(
        md,
        "[stars-shield]: https://img.shields.io/github/stars/{}.svg?style=for-the-badge",
        repo
    );
    let _ = writeln!(md, "[stars-url]: https://github.com/{}/stargazers", repo);
    let _ = writeln!(
        md,
        "[issues-shield]: https://img.shields.io/github/issues/{}.svg?style=for-the-badge",
        repo
    );
    let _ = writeln!(md, "[issues-url]: https://github.com/{}/issues", repo);

    md
}
