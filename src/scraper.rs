use crate::config::{CrawlerConfig, USER_AGENT};
use crate::error::Result;
use crate::geo::{Geocoder, NominatimGeocoder};
use crate::normalize::{Normalizer, parse_event_body, parse_search_body};
use crate::record::{Sighting, SightingWriter};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::time::Duration;
use tokio::time::sleep;

/// Aggregate counters kept while records stream to the output file, so the
/// end-of-run summary does not need the full record set in memory.
#[derive(Debug, Default)]
pub struct CrawlStats {
    pub written: usize,
    pub skipped: usize,
    pub shapes: HashSet<String>,
    pub location_counts: HashMap<String, usize>,
    pub first_sighted: Option<String>,
    pub last_sighted: Option<String>,
}

impl CrawlStats {
    fn record(&mut self, sighting: &Sighting) {
        self.written += 1;

        if let Some(shape) = &sighting.shape {
            self.shapes.insert(shape.clone());
        }

        if !sighting.location.is_empty() {
            *self
                .location_counts
                .entry(sighting.location.clone())
                .or_insert(0) += 1;
        }

        if let Some(date) = &sighting.sighted_at {
            if self.first_sighted.as_ref().is_none_or(|d| date < d) {
                self.first_sighted = Some(date.clone());
            }
            if self.last_sighted.as_ref().is_none_or(|d| date > d) {
                self.last_sighted = Some(date.clone());
            }
        }
    }
}

/// Number of page requests needed to cover `limit` results.
pub(crate) fn page_count(limit: usize, page_size: usize) -> usize {
    limit.div_ceil(page_size)
}

pub struct UfoStalkerCrawler<G: Geocoder> {
    client: Client,
    config: CrawlerConfig,
    geocoder: G,
}

impl UfoStalkerCrawler<NominatimGeocoder> {
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        let geocoder = NominatimGeocoder::new(client.clone(), &config.geocode_url);

        Ok(Self {
            client,
            config,
            geocoder,
        })
    }
}

impl<G: Geocoder> UfoStalkerCrawler<G> {
    /// Fetches one event document body. A non-2xx status is logged and the
    /// body is still handed to the parser.
    async fn fetch_event(&self, id: u64) -> Result<String> {
        let response = self
            .client
            .get(&self.config.event_url)
            .query(&[("id", id.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "did not get a status OK for report {}: {}",
                id,
                response.status()
            );
        }

        Ok(response.text().await?)
    }

    /// Fetches one search page body, same non-2xx policy as events.
    async fn fetch_search_page(&self, term: &str, page: usize) -> Result<String> {
        let size = self.config.page_size.to_string();
        let page_number = page.to_string();
        let response = self
            .client
            .get(&self.config.search_url)
            .query(&[
                ("type", "all"),
                ("size", size.as_str()),
                ("term", term),
                ("page", page_number.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "did not get a status OK for term '{}' page {}: {}",
                term,
                page,
                response.status()
            );
        }

        Ok(response.text().await?)
    }

    async fn fetch_and_normalize(
        &self,
        normalizer: &Normalizer<'_, G>,
        id: u64,
    ) -> Result<Sighting> {
        let body = self.fetch_event(id).await?;
        let doc = parse_event_body(&body)?;
        normalizer.from_event(&doc).await
    }

    /// Crawls the inclusive id range in ascending order, writing each report
    /// the moment it is normalized. A report that cannot be fetched or
    /// parsed is skipped; the crawl keeps going.
    pub async fn crawl_id_range<W: Write>(
        &self,
        initial: u64,
        end: u64,
        out: &mut SightingWriter<W>,
    ) -> Result<CrawlStats> {
        let normalizer = Normalizer::new(&self.geocoder);
        let mut stats = CrawlStats::default();

        info!(
            "downloading reports {}..={} from {}",
            initial, end, self.config.event_url
        );

        let progress = ProgressBar::new(end - initial + 1);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {percent:>3}% ETA: {eta_precise} {msg}")
                .unwrap()
                .progress_chars("##-")
        );
        progress.set_message("Downloading reports by id");

        for id in initial..=end {
            match self.fetch_and_normalize(&normalizer, id).await {
                Ok(sighting) => {
                    out.write(&sighting)?;
                    stats.record(&sighting);
                }
                Err(e) => {
                    warn!("could not parse report {}: {}", id, e);
                    stats.skipped += 1;
                }
            }
            progress.inc(1);

            // Courtesy delay towards the upstream service, applied whether
            // or not the fetch succeeded
            sleep(self.config.request_delay).await;
        }

        progress.finish_and_clear();
        Ok(stats)
    }

    /// Crawls paginated search results for `term`, stopping the whole crawl
    /// as soon as `limit` reports have been written, even mid-page.
    pub async fn crawl_by_term<W: Write>(
        &self,
        term: &str,
        limit: usize,
        out: &mut SightingWriter<W>,
    ) -> Result<CrawlStats> {
        let normalizer = Normalizer::new(&self.geocoder);
        let mut stats = CrawlStats::default();
        let pages = page_count(limit, self.config.page_size);

        info!(
            "downloading up to {} reports for term '{}' across {} page(s)",
            limit, term, pages
        );

        let progress = ProgressBar::new(limit as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {percent:>3}% ETA: {eta_precise} {msg}")
                .unwrap()
                .progress_chars("##-")
        );
        progress.set_message("Downloading reports by term");

        for page in 1..=pages {
            let envelope = match self
                .fetch_search_page(term, page)
                .await
                .and_then(|body| parse_search_body(&body))
            {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!("could not parse search page {}: {}", page, e);
                    sleep(self.config.request_delay).await;
                    continue;
                }
            };

            for item in &envelope.content {
                match normalizer.from_search_item(item).await {
                    Ok(sighting) => {
                        out.write(&sighting)?;
                        stats.record(&sighting);
                        progress.inc(1);

                        if stats.written == limit {
                            progress.finish_and_clear();
                            return Ok(stats);
                        }
                    }
                    Err(e) => {
                        warn!("could not parse a report on page {}: {}", page, e);
                        stats.skipped += 1;
                    }
                }
            }

            sleep(self.config.request_delay).await;
        }

        progress.finish_and_clear();
        Ok(stats)
    }
}
