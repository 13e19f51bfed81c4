use crate::error::{CrawlerError, Result};
use clap::Parser;

#[derive(Parser)]
#[command(name = "mufon-crawler")]
#[command(about = "Generates a CSV from MUFON sighting reports")]
#[command(version = "1.0")]
pub(crate) struct Args {
    /// Initial report id
    #[arg(short, long)]
    pub initial: Option<u64>,

    /// Final report id
    #[arg(short, long)]
    pub end: Option<u64>,

    /// Only reports including this term, e.g., country, shape, etc.
    #[arg(short, long)]
    pub term: Option<String>,

    /// Max number of reports by term
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Delay between requests in milliseconds
    #[arg(short, long, default_value = "5000")]
    pub delay: u64,

    /// Output CSV filename
    #[arg(short, long)]
    pub output: String,
}

/// How the crawl was invoked. When a term is passed, 'initial' and 'end'
/// are ignored.
pub(crate) enum CrawlMode {
    IdRange { initial: u64, end: u64 },
    TermSearch { term: String, limit: usize },
}

impl Args {
    /// Validates the invocation. Called before any network activity; a bad
    /// combination of arguments aborts the run.
    pub fn mode(&self) -> Result<CrawlMode> {
        if let Some(term) = &self.term {
            return Ok(CrawlMode::TermSearch {
                term: term.clone(),
                limit: self.limit,
            });
        }

        let (initial, end) = match (self.initial, self.end) {
            (Some(initial), Some(end)) => (initial, end),
            _ => {
                return Err(CrawlerError::config(
                    "'initial' and 'end' must be passed unless you specify a term",
                ));
            }
        };

        if initial > end {
            return Err(CrawlerError::config(
                "'initial' must be less than or equal to 'end'",
            ));
        }

        Ok(CrawlMode::IdRange { initial, end })
    }
}
