use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};

pub const CATEGORY_LEVELS: usize = 4;

/// Exported column order.
pub const COLUMNS: [&str; 8] = [
    "Name",
    "Author",
    "Category_1",
    "Category_2",
    "Category_3",
    "Category_4",
    "Price_original",
    "Price_special",
];

/// Category labels from broadest (level 1) to most specific (level 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPath([String; CATEGORY_LEVELS]);

impl CategoryPath {
    pub fn new(labels: Vec<String>) -> Result<Self> {
        let count = labels.len();
        let labels: [String; CATEGORY_LEVELS] = labels.try_into().map_err(|_| {
            ScrapeError::format(format!(
                "category path must have {CATEGORY_LEVELS} levels, got {count}"
            ))
        })?;
        if let Some(empty) = labels.iter().position(|label| label.trim().is_empty()) {
            return Err(ScrapeError::format(format!(
                "category level {} is empty: {labels:?}",
                empty + 1
            )));
        }
        Ok(Self(labels))
    }

    /// Label at 1-based `level`, `None` outside 1..=4.
    pub fn level(&self, level: usize) -> Option<&str> {
        self.0.get(level.checked_sub(1)?).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn into_labels(self) -> [String; CATEGORY_LEVELS] {
        self.0
    }
}

/// Fields filled by the listing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub author: String,
    pub url: String,
    pub price_special: u32,
}

/// Fields filled by the detail pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailInfo {
    pub category_path: CategoryPath,
    pub price_original: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub rank: usize,
    pub name: String,
    pub author: String,
    pub url: String,
    pub category_path: Option<CategoryPath>,
    pub price_original: Option<u32>,
    pub price_special: u32,
}

impl BookRecord {
    pub fn new(rank: usize, entry: ListingEntry, detail: Option<DetailInfo>) -> Self {
        let (category_path, price_original) = match detail {
            Some(detail) => (Some(detail.category_path), detail.price_original),
            None => (None, None),
        };
        Self {
            rank,
            name: entry.name,
            author: entry.author,
            url: entry.url,
            category_path,
            price_original,
            price_special: entry.price_special,
        }
    }
}

/// One row of the persisted table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Category_1")]
    pub category_1: Option<String>,
    #[serde(rename = "Category_2")]
    pub category_2: Option<String>,
    #[serde(rename = "Category_3")]
    pub category_3: Option<String>,
    #[serde(rename = "Category_4")]
    pub category_4: Option<String>,
    #[serde(rename = "Price_original")]
    pub price_original: Option<u32>,
    #[serde(rename = "Price_special")]
    pub price_special: u32,
}

impl TableRow {
    /// All four levels, or `None` if any level is missing.
    pub fn category_path(&self) -> Option<[&str; CATEGORY_LEVELS]> {
        Some([
            self.category_1.as_deref()?,
            self.category_2.as_deref()?,
            self.category_3.as_deref()?,
            self.category_4.as_deref()?,
        ])
    }
}

impl From<&BookRecord> for TableRow {
    fn from(record: &BookRecord) -> Self {
        let [category_1, category_2, category_3, category_4] = match &record.category_path {
            Some(path) => path.clone().into_labels().map(Some),
            None => [None, None, None, None],
        };
        Self {
            name: record.name.clone(),
            author: record.author.clone(),
            category_1,
            category_2,
            category_3,
            category_4,
            price_original: record.price_original,
            price_special: record.price_special,
        }
    }
}
