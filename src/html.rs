use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, ScrapeError};

/// A parsed HTML page.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(ScrapeError::parse("document is empty"));
        }
        if !text.contains('<') {
            return Err(ScrapeError::parse("document contains no markup"));
        }

        Ok(Self {
            html: Html::parse_document(text),
        })
    }

    pub fn find_all(&self, tag: &str, class: &str) -> Result<Vec<Element<'_>>> {
        let selector = tag_class_selector(tag, class)?;
        Ok(self.html.select(&selector).map(Element).collect())
    }

    pub fn find_first(&self, tag: &str, class: &str) -> Result<Option<Element<'_>>> {
        let selector = tag_class_selector(tag, class)?;
        Ok(self.html.select(&selector).next().map(Element))
    }
}

/// An element borrowed from a [`Document`].
#[derive(Clone, Copy)]
pub struct Element<'a>(ElementRef<'a>);

impl<'a> Element<'a> {
    pub fn find_all(&self, tag: &str, class: &str) -> Result<Vec<Element<'a>>> {
        let selector = tag_class_selector(tag, class)?;
        Ok(self.0.select(&selector).map(Element).collect())
    }

    pub fn find_first(&self, tag: &str, class: &str) -> Result<Option<Element<'a>>> {
        let selector = tag_class_selector(tag, class)?;
        Ok(self.0.select(&selector).next().map(Element))
    }

    /// Descendants matching a raw CSS selector (e.g. `h4 > a`).
    pub fn select_first(&self, css: &str) -> Result<Option<Element<'a>>> {
        let selector = parse_selector(css)?;
        Ok(self.0.select(&selector).next().map(Element))
    }

    /// Concatenated text content, trimmed.
    pub fn text(&self) -> String {
        self.0.text().collect::<String>().trim().to_owned()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }
}

fn tag_class_selector(tag: &str, class: &str) -> Result<Selector> {
    let mut css = tag.to_owned();
    for class in class.split_whitespace() {
        css.push('.');
        css.push_str(class);
    }
    parse_selector(&css)
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| ScrapeError::parse(format!("selector `{css}`: {err}")))
}
