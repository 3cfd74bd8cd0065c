use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rendered table rows keyed by version-less arXiv id.
pub type PaperRows = BTreeMap<String, String>;

/// The cumulative paper index: topic name to its rows.
pub type PaperIndex = BTreeMap<String, PaperRows>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub updated: NaiveDate,
    pub abs_url: String,
    pub summary: String,
    pub categories: Vec<String>,
    pub code_url: Option<String>,
}

impl Paper {
    /// `https://arxiv.org/abs/2401.00001v2` becomes `https://arxiv.org/pdf/2401.00001v2.pdf`.
    pub fn pdf_url(&self) -> String {
        format!("{}.pdf", self.abs_url.replace("/abs/", "/pdf/"))
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub topic: String,
    pub rows: PaperRows,
}
