use crate::error::{Result, ScrapeError};
use crate::formats::{CATEGORY_LEVELS, CategoryPath, DetailInfo};
use crate::html::Document;
use crate::listing::parse_price;

pub fn extract_detail(doc: &Document) -> Result<DetailInfo> {
    Ok(DetailInfo {
        category_path: extract_category_path(doc)?,
        price_original: extract_original_price(doc)?,
    })
}

/// The breadcrumb starts with the site root, followed by the four category
/// levels.
fn extract_category_path(doc: &Document) -> Result<CategoryPath> {
    let breadcrumb = doc
        .find_first("ul", "container_24 type04_breadcrumb")?
        .ok_or_else(|| ScrapeError::format("missing category breadcrumb"))?;

    let crumbs: Vec<String> = breadcrumb
        .find_all("span", "")?
        .iter()
        .map(|span| span.text())
        .collect();

    if crumbs.len() != CATEGORY_LEVELS + 1 {
        return Err(ScrapeError::format(format!(
            "breadcrumb must have {} entries (root + {CATEGORY_LEVELS} levels), got {}: {crumbs:?}",
            CATEGORY_LEVELS + 1,
            crumbs.len()
        )));
    }

    CategoryPath::new(crumbs.into_iter().skip(1).collect())
}

/// `None` when the page lists no original price.
fn extract_original_price(doc: &Document) -> Result<Option<u32>> {
    let Some(price) = doc.find_first("ul", "price")? else {
        return Ok(None);
    };

    let text = match price.find_first("em", "")? {
        Some(em) => em.text(),
        None => price.text(),
    };
    parse_price(&text).map(Some)
}
