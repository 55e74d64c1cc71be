use url::Url;

use crate::error::{Result, ScrapeError};
use crate::formats::ListingEntry;
use crate::html::{Document, Element};

/// Separator between the author label and the author name.
pub const AUTHOR_SEPARATOR: char = '：';

/// Extracts every book entry on the bestseller listing page, in page order.
///
/// Relative detail links are resolved against `base_url`.
pub fn extract_listing(doc: &Document, base_url: &Url) -> Result<Vec<ListingEntry>> {
    let books = doc.find_all("div", "type02_bd-a")?;
    tracing::debug!(count = books.len(), "listing entries found");

    books
        .iter()
        .enumerate()
        .map(|(idx, book)| {
            extract_entry(book, base_url).map_err(|err| match err {
                ScrapeError::Format(message) => {
                    ScrapeError::format(format!("book #{}: {message}", idx + 1))
                }
                other => other,
            })
        })
        .collect()
}

fn extract_entry(book: &Element<'_>, base_url: &Url) -> Result<ListingEntry> {
    let anchor = book
        .select_first("h4 > a")?
        .or(book.select_first("h4 a")?)
        .ok_or_else(|| ScrapeError::format("missing title link"))?;

    let name = anchor.text();
    if name.is_empty() {
        return Err(ScrapeError::format("empty title"));
    }

    let href = anchor
        .attr("href")
        .ok_or_else(|| ScrapeError::format(format!("title link has no href: {name}")))?;
    let url = base_url
        .join(href.trim())
        .map_err(|err| ScrapeError::format(format!("invalid detail url `{href}`: {err}")))?;

    let author_label = book
        .select_first("ul li")?
        .ok_or_else(|| ScrapeError::format(format!("missing author label: {name}")))?
        .text();
    let author = parse_author(&author_label)?;

    let price_special = extract_special_price(book)?;

    Ok(ListingEntry {
        name,
        author,
        url: url.to_string(),
        price_special,
    })
}

pub fn parse_author(label: &str) -> Result<String> {
    let mut parts = label.split(AUTHOR_SEPARATOR);
    let _label = parts.next();
    match parts.next() {
        Some(author) => Ok(author.trim().to_owned()),
        None => Err(ScrapeError::format(format!(
            "author label has no `{AUTHOR_SEPARATOR}` separator: {label}"
        ))),
    }
}

/// One bold price means no discount; with two, the second is the current price.
fn extract_special_price(book: &Element<'_>) -> Result<u32> {
    let label = book
        .find_first("li", "price_a")?
        .ok_or_else(|| ScrapeError::format("missing price label"))?;
    let bold = label.find_all("b", "")?;

    match bold.as_slice() {
        [price] | [_, price] => parse_price(&price.text()),
        other => Err(ScrapeError::format(format!(
            "price label has {} bold children, expected 1 or 2",
            other.len()
        ))),
    }
}

/// Parses the leading number of `text` (thousands separators allowed) as a
/// positive price.
pub fn parse_price(text: &str) -> Result<u32> {
    let digits: String = text
        .trim()
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();

    match digits.parse::<u32>() {
        Ok(price) if price > 0 => Ok(price),
        _ => Err(ScrapeError::format(format!("invalid price: `{text}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.books.com.tw/web/sys_tdrntb/books/").expect("base url")
    }

    fn book(title: &str, href: &str, author: &str, price: &str) -> String {
        format!(
            r#"<div class="type02_bd-a">
  <h4><a href="{href}">{title}</a></h4>
  <ul class="msg"><li>{author}</li></ul>
  <ul class="price clearfix"><li class="price_a">{price}</li></ul>
</div>"#
        )
    }

    fn page(books: &[String]) -> String {
        format!("<html><body>{}</body></html>", books.concat())
    }

    #[test]
    fn special_price_follows_bold_child_count() -> anyhow::Result<()> {
        let html = page(&[
            book("A", "/products/A", "作者：甲", "優惠價：<b>500</b>折<b>350</b>元"),
            book("B", "/products/B", "作者：乙", "<b>200</b>元"),
        ]);
        let doc = Document::parse(&html)?;
        let entries = extract_listing(&doc, &base())?;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].price_special, 350);
        assert_eq!(entries[1].price_special, 200);
        assert_eq!(entries[0].author, "甲");
        assert_eq!(entries[1].url, "https://www.books.com.tw/products/B");
        Ok(())
    }

    #[test]
    fn unexpected_bold_count_is_a_format_error() -> anyhow::Result<()> {
        let html = page(&[book("A", "/a", "作者：甲", "<b>1</b><b>2</b><b>3</b>")]);
        let doc = Document::parse(&html)?;
        let err = extract_listing(&doc, &base()).unwrap_err();
        assert!(matches!(err, ScrapeError::Format(ref m) if m.contains("book #1")));

        let html = page(&[book("A", "/a", "作者：甲", "no bold")]);
        let doc = Document::parse(&html)?;
        assert!(matches!(
            extract_listing(&doc, &base()),
            Err(ScrapeError::Format(_))
        ));
        Ok(())
    }

    #[test]
    fn author_without_separator_is_a_format_error() {
        assert!(matches!(parse_author("無名氏"), Err(ScrapeError::Format(_))));
        assert_eq!(parse_author("作者： 村上春樹 ").ok().as_deref(), Some("村上春樹"));
    }

    #[test]
    fn missing_title_is_fatal() -> anyhow::Result<()> {
        let html = page(&[r#"<div class="type02_bd-a"><ul><li>作者：甲</li></ul></div>"#.to_owned()]);
        let doc = Document::parse(&html)?;
        assert!(matches!(
            extract_listing(&doc, &base()),
            Err(ScrapeError::Format(_))
        ));
        Ok(())
    }

    #[test]
    fn parse_price_accepts_thousands_separator() {
        assert_eq!(parse_price("1,200").ok(), Some(1200));
        assert_eq!(parse_price(" 79 元").ok(), Some(79));
        assert!(parse_price("0").is_err());
        assert!(parse_price("免費").is_err());
    }
}
