use crate::error::{CrawlerError, Result};
use log::debug;
use reqwest::Client;
use serde::Deserialize;

/// Resolves a free-text place name to a coordinate pair.
///
/// Failures are recoverable by contract: the normalizer catches them and
/// leaves both coordinates absent on the record.
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    async fn resolve(&self, city: &str, country: &str) -> Result<(f64, f64)>;
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Nominatim-backed resolver. One outbound request per lookup, no caching.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }
}

impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, city: &str, country: &str) -> Result<(f64, f64)> {
        // City and country are forwarded as-is, even when empty
        let query = format!("{}, {}", city, country);
        debug!("geocoding '{}'", query);

        let places: Vec<Place> = self
            .client
            .get(&self.base_url)
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| CrawlerError::geolocation(e.to_string()))?
            .json()
            .await
            .map_err(|e| CrawlerError::geolocation(e.to_string()))?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| CrawlerError::geolocation(format!("no match for '{}'", query)))?;

        let latitude = place
            .lat
            .parse::<f64>()
            .map_err(|e| CrawlerError::geolocation(e.to_string()))?;
        let longitude = place
            .lon
            .parse::<f64>()
            .map_err(|e| CrawlerError::geolocation(e.to_string()))?;

        Ok((latitude, longitude))
    }
}
