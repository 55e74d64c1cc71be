#![forbid(unsafe_code)]

pub mod analyze;
pub mod chart;
pub mod cli;
pub mod collect;
pub mod crawl;
pub mod detail;
pub mod error;
pub mod export;
pub mod fetch;
pub mod formats;
pub mod html;
pub mod listing;
pub mod logging;
