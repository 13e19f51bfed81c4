mod config;
mod error;
mod geo;
mod normalize;
mod parse;
mod record;
mod scraper;
mod util;

use crate::config::CrawlerConfig;
use crate::parse::{Args, CrawlMode};
use crate::record::SightingWriter;
use crate::scraper::{CrawlStats, UfoStalkerCrawler};
use crate::util::print_hms;
use clap::Parser;
use std::time::Instant;

pub fn print_summary(stats: &CrawlStats) {
    if stats.written == 0 {
        println!("No reports written");
        return;
    }

    println!("\nSummary:");
    println!("Reports written: {}", stats.written);
    if stats.skipped > 0 {
        println!("Reports skipped: {}", stats.skipped);
    }
    println!("Unique shapes: {}", stats.shapes.len());

    if let (Some(first), Some(last)) = (&stats.first_sighted, &stats.last_sighted) {
        println!("Date range: {} to {}", first, last);
    }

    // Top locations
    let mut sorted_locations: Vec<(&String, &usize)> = stats.location_counts.iter().collect();
    sorted_locations.sort_by(|a, b| b.1.cmp(a.1));

    println!("Top locations:");
    for (location, count) in sorted_locations.iter().take(3) {
        println!("  {}: {}", location, count);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::try_parse()?;
    // Initialize logger
    env_logger::init();

    // If something is wrong with the arguments, exit before any network
    // activity
    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let config = CrawlerConfig::default().with_delay(args.delay);
    let crawler = UfoStalkerCrawler::new(config)?;
    let mut out = SightingWriter::create(&args.output)?;

    let start = Instant::now();
    let stats = match mode {
        CrawlMode::IdRange { initial, end } => {
            crawler.crawl_id_range(initial, end, &mut out).await?
        }
        CrawlMode::TermSearch { term, limit } => {
            crawler.crawl_by_term(&term, limit, &mut out).await?
        }
    };

    print_hms(&start);
    print_summary(&stats);

    Ok(())
}
