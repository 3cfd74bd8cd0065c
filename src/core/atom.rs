//! Minimal reader for the Atom feeds served by the arXiv query API.

use crate::domain::model::Paper;
use crate::utils::error::{MonitorError, Result};
use chrono::{DateTime, NaiveDate};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomFeed {
    /// `opensearch:totalResults`, the size of the whole result set.
    pub total_results: usize,
    pub entries: Vec<AtomEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub updated: Option<String>,
    pub published: Option<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    TotalResults,
    Id,
    Title,
    Summary,
    Updated,
    Published,
}

impl Field {
    fn from_tag(local_name: &[u8], in_entry: bool) -> Option<Self> {
        match (local_name, in_entry) {
            (b"totalResults", false) => Some(Field::TotalResults),
            (b"id", true) => Some(Field::Id),
            (b"title", true) => Some(Field::Title),
            (b"summary", true) => Some(Field::Summary),
            (b"updated", true) => Some(Field::Updated),
            (b"published", true) => Some(Field::Published),
            _ => None,
        }
    }
}

pub fn parse_feed(xml: &str) -> Result<AtomFeed> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = AtomFeed::default();
    let mut entry: Option<AtomEntry> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"entry" => entry = Some(AtomEntry::default()),
                b"category" => push_category(&mut entry, &e)?,
                name => {
                    field = Field::from_tag(name, entry.is_some());
                    text.clear();
                }
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"category" {
                    push_category(&mut entry, &e)?;
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"entry" {
                    if let Some(done) = entry.take() {
                        feed.entries.push(done);
                    }
                    continue;
                }
                let Some(done) = field.take() else {
                    continue;
                };
                let value = text.trim().to_string();
                match (done, entry.as_mut()) {
                    (Field::TotalResults, _) => {
                        feed.total_results = value.parse().unwrap_or(0);
                    }
                    (Field::Id, Some(entry)) => entry.id = Some(value),
                    (Field::Title, Some(entry)) => entry.title = Some(value),
                    (Field::Summary, Some(entry)) => entry.summary = Some(value),
                    (Field::Updated, Some(entry)) => entry.updated = Some(value),
                    (Field::Published, Some(entry)) => entry.published = Some(value),
                    (_, None) => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(feed)
}

fn push_category(entry: &mut Option<AtomEntry>, tag: &BytesStart<'_>) -> Result<()> {
    let Some(entry) = entry.as_mut() else {
        return Ok(());
    };
    for attr in tag.attributes().flatten() {
        if attr.key.as_ref() == b"term" {
            entry.categories.push(attr.unescape_value()?.into_owned());
        }
    }
    Ok(())
}

impl AtomEntry {
    /// The query API reports malformed queries as a single entry with an errors id.
    pub fn is_api_error(&self) -> bool {
        self.id
            .as_deref()
            .map(|id| id.contains("/api/errors"))
            .unwrap_or(false)
    }

    pub fn into_paper(self) -> Result<Paper> {
        let abs_url = require(self.id, "id")?;
        let title = require(self.title, "title")?;
        let summary = require(self.summary, "summary")?;
        let updated_raw = require(self.updated, "updated")?;

        Ok(Paper {
            id: strip_version(short_id(&abs_url)).to_string(),
            title: collapse_whitespace(&title),
            updated: parse_atom_date(&updated_raw)?,
            summary: summary.replace('\n', " "),
            categories: self.categories,
            code_url: None,
            abs_url,
        })
    }
}

fn require(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MonitorError::ProcessingError {
            message: format!("entry is missing field '{}'", field),
        })
}

/// `http://arxiv.org/abs/2401.00001v2` -> `2401.00001v2`
pub fn short_id(entry_id: &str) -> &str {
    entry_id
        .split_once("/abs/")
        .map(|(_, id)| id)
        .unwrap_or(entry_id)
}

/// `2401.00001v2` -> `2401.00001`, `cs/0112017v1` -> `cs/0112017`
pub fn strip_version(id: &str) -> &str {
    match id.rfind('v') {
        Some(pos)
            if pos > 0
                && pos + 1 < id.len()
                && id[pos + 1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            &id[..pos]
        }
        _ => id,
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn parse_atom_date(value: &str) -> Result<NaiveDate> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_utc().date())
        .map_err(|source| MonitorError::DateError {
            value: value.to_string(),
            source,
        })
}
