use crate::config::SOURCE;
use crate::error::{CrawlerError, Result};
use crate::geo::Geocoder;
use crate::record::{Sighting, clean, format_location};
use chrono::{Local, TimeZone};
use log::warn;
use serde::Deserialize;
use serde_json::Value;

/// Single-report document returned by the event endpoint.
///
/// Every leaf is optional; a missing node and an empty node are treated
/// the same way downstream.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventDocument {
    pub id: Option<String>,
    pub submitted: Option<String>,
    pub occurred: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub shape: Option<String>,
    pub duration: Option<String>,
    pub detailed_description: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub log_number: Option<String>,
}

/// Envelope returned by the paginated search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchEnvelope {
    pub content: Vec<SearchItem>,
}

/// One entry of a search page. The id, timestamps and case number arrive
/// as numbers or strings depending on the report, hence the loose values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchItem {
    pub id: Option<Value>,
    pub submitted: Option<Value>,
    pub occurred: Option<Value>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub shape: Option<String>,
    pub duration: Option<String>,
    pub detailed_description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub log_number: Option<Value>,
}

/// Parses the body returned by the event endpoint.
pub fn parse_event_body(body: &str) -> Result<EventDocument> {
    quick_xml::de::from_str(body)
        .map_err(|e| CrawlerError::malformed(format!("invalid event document: {}", e)))
}

/// Parses the body returned by the search endpoint.
pub fn parse_search_body(body: &str) -> Result<SearchEnvelope> {
    serde_json::from_str(body)
        .map_err(|e| CrawlerError::malformed(format!("invalid search envelope: {}", e)))
}

/// Converts either upstream payload shape into a canonical [`Sighting`].
///
/// Only a missing report id fails a record; every other problem degrades
/// the affected field and the record still comes out.
pub struct Normalizer<'a, G: Geocoder> {
    geocoder: &'a G,
}

impl<'a, G: Geocoder> Normalizer<'a, G> {
    pub fn new(geocoder: &'a G) -> Self {
        Self { geocoder }
    }

    /// Builds a record from an event document.
    pub async fn from_event(&self, doc: &EventDocument) -> Result<Sighting> {
        let id = non_empty(doc.id.as_deref())
            .ok_or_else(|| CrawlerError::malformed("event document has no id"))?
            .to_string();

        let city = non_empty(doc.city.as_deref()).unwrap_or_default();
        let country = non_empty(doc.country.as_deref()).unwrap_or_default();

        let latitude = non_empty(doc.latitude.as_deref()).and_then(|s| s.parse::<f64>().ok());
        let longitude = non_empty(doc.longitude.as_deref()).and_then(|s| s.parse::<f64>().ok());
        let (latitude, longitude) = self.coordinates(latitude, longitude, city, country).await;

        Ok(Sighting {
            id,
            sighted_at: non_empty(doc.occurred.as_deref()).map(str::to_string),
            reported_at: non_empty(doc.submitted.as_deref()).map(str::to_string),
            location: format_location(city, country),
            shape: non_empty(doc.shape.as_deref()).map(str::to_string),
            duration: non_empty(doc.duration.as_deref()).map(str::to_string),
            description: clean(doc.detailed_description.as_deref().unwrap_or_default()),
            latitude,
            longitude,
            case_number: non_empty(doc.log_number.as_deref()).map(str::to_string),
            source: SOURCE.to_string(),
        })
    }

    /// Builds a record from a search-result item. Both timestamps are
    /// millisecond epochs upstream.
    pub async fn from_search_item(&self, item: &SearchItem) -> Result<Sighting> {
        let id = item
            .id
            .as_ref()
            .and_then(value_to_string)
            .ok_or_else(|| CrawlerError::malformed("search result has no id"))?;

        let reported_at = match epoch_millis_to_local(item.submitted.as_ref()) {
            Ok(stamp) => Some(stamp),
            Err(e) => {
                warn!("could not generate a valid report date: {}", e);
                None
            }
        };
        let sighted_at = match epoch_millis_to_local(item.occurred.as_ref()) {
            Ok(stamp) => Some(stamp),
            Err(e) => {
                warn!("could not generate a valid sighting date: {}", e);
                None
            }
        };

        let city = non_empty(item.city.as_deref()).unwrap_or_default();
        let country = non_empty(item.country.as_deref()).unwrap_or_default();
        let (latitude, longitude) = self
            .coordinates(item.latitude, item.longitude, city, country)
            .await;

        Ok(Sighting {
            id,
            sighted_at,
            reported_at,
            location: format_location(city, country),
            shape: non_empty(item.shape.as_deref()).map(str::to_string),
            duration: non_empty(item.duration.as_deref()).map(str::to_string),
            description: clean(item.detailed_description.as_deref().unwrap_or_default()),
            latitude,
            longitude,
            case_number: item.log_number.as_ref().and_then(value_to_string),
            source: SOURCE.to_string(),
        })
    }

    /// Payload coordinates win when both are present; otherwise one
    /// geocoding lookup is attempted. Both come out set, or both absent.
    async fn coordinates(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
        city: &str,
        country: &str,
    ) -> (Option<f64>, Option<f64>) {
        if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
            return (Some(latitude), Some(longitude));
        }

        match self.geocoder.resolve(city, country).await {
            Ok((latitude, longitude)) => (Some(latitude), Some(longitude)),
            Err(e) => {
                warn!("could not geolocate the sighting: {}", e);
                (None, None)
            }
        }
    }
}

/// Formats a millisecond epoch as a local `YYYY-MM-DD HH:MM:SS` string.
/// Upstream sometimes serializes the epoch as a string.
fn epoch_millis_to_local(value: Option<&Value>) -> Result<String> {
    let millis = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| CrawlerError::timestamp(format!("not an integer: {}", n)))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CrawlerError::timestamp(format!("not a number: '{}'", s)))?,
        Some(other) => {
            return Err(CrawlerError::timestamp(format!(
                "unexpected value: {}",
                other
            )));
        }
        None => return Err(CrawlerError::timestamp("value is missing")),
    };

    let stamp = Local
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| CrawlerError::timestamp(format!("epoch out of range: {}", millis)))?;

    Ok(stamp.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Test double standing in for the Nominatim resolver.
    struct StubGeocoder {
        coordinates: Option<(f64, f64)>,
    }

    impl Geocoder for StubGeocoder {
        async fn resolve(&self, _city: &str, _country: &str) -> Result<(f64, f64)> {
            self.coordinates
                .ok_or_else(|| CrawlerError::geolocation("no match"))
        }
    }

    const EVENT_XML: &str = "<event>\
        <id>82631</id>\
        <submitted>2017-03-02 20:01:12</submitted>\
        <occurred>2017-02-28 21:30:00</occurred>\
        <city>Phoenix</city>\
        <country>United States</country>\
        <shape>Disc</shape>\
        <duration>00:05:00</duration>\
        <detailedDescription>Saw a light\r\n in the sky\t</detailedDescription>\
        <latitude>33.448</latitude>\
        <longitude>-112.074</longitude>\
        <logNumber>82631</logNumber>\
        </event>";

    fn search_item(value: Value) -> SearchItem {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_from_event_maps_all_fields() {
        let geocoder = StubGeocoder { coordinates: None };
        let normalizer = Normalizer::new(&geocoder);

        let doc = parse_event_body(EVENT_XML).unwrap();
        let sighting = normalizer.from_event(&doc).await.unwrap();

        assert_eq!(sighting.id, "82631");
        assert_eq!(sighting.reported_at.as_deref(), Some("2017-03-02 20:01:12"));
        assert_eq!(sighting.sighted_at.as_deref(), Some("2017-02-28 21:30:00"));
        assert_eq!(sighting.location, "Phoenix (United States)");
        assert_eq!(sighting.shape.as_deref(), Some("Disc"));
        assert_eq!(sighting.duration.as_deref(), Some("00:05:00"));
        assert_eq!(sighting.description, "Saw a light in the sky");
        assert_eq!(sighting.latitude, Some(33.448));
        assert_eq!(sighting.longitude, Some(-112.074));
        assert_eq!(sighting.case_number.as_deref(), Some("82631"));
        assert_eq!(sighting.source, "MUFON");
    }

    #[tokio::test]
    async fn test_from_event_is_idempotent() {
        let geocoder = StubGeocoder {
            coordinates: Some((12.3, 45.6)),
        };
        let normalizer = Normalizer::new(&geocoder);

        let doc = parse_event_body(EVENT_XML).unwrap();
        let first = normalizer.from_event(&doc).await.unwrap();
        let second = normalizer.from_event(&doc).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_from_event_missing_id_is_malformed() {
        let geocoder = StubGeocoder { coordinates: None };
        let normalizer = Normalizer::new(&geocoder);

        let doc = parse_event_body("<event><city>Phoenix</city></event>").unwrap();
        let result = normalizer.from_event(&doc).await;

        assert!(matches!(result, Err(CrawlerError::MalformedDocument(_))));
    }

    #[test]
    fn test_parse_event_body_rejects_garbage() {
        let result = parse_event_body("{\"content\": []}");
        assert!(matches!(result, Err(CrawlerError::MalformedDocument(_))));
    }

    #[tokio::test]
    async fn test_from_event_geocoding_fallback() {
        let geocoder = StubGeocoder {
            coordinates: Some((12.3, 45.6)),
        };
        let normalizer = Normalizer::new(&geocoder);

        let doc = parse_event_body(
            "<event><id>1</id><city>Lyon</city><country>France</country></event>",
        )
        .unwrap();
        let sighting = normalizer.from_event(&doc).await.unwrap();

        assert_eq!(sighting.latitude, Some(12.3));
        assert_eq!(sighting.longitude, Some(45.6));
    }

    #[tokio::test]
    async fn test_coordinates_never_mixed() {
        let geocoder = StubGeocoder { coordinates: None };
        let normalizer = Normalizer::new(&geocoder);

        // Latitude supplied upstream but longitude missing, and geocoding
        // finds no match: both must come out absent
        let doc = parse_event_body(
            "<event><id>2</id><city>Lyon</city><country>France</country>\
             <latitude>45.76</latitude><longitude></longitude></event>",
        )
        .unwrap();
        let sighting = normalizer.from_event(&doc).await.unwrap();

        assert_eq!(sighting.latitude, None);
        assert_eq!(sighting.longitude, None);
    }

    #[tokio::test]
    async fn test_from_search_item_converts_epochs() {
        let geocoder = StubGeocoder { coordinates: None };
        let normalizer = Normalizer::new(&geocoder);

        let submitted: i64 = 1488484872000;
        let occurred: i64 = 1488317400000;
        let item = search_item(json!({
            "id": 82631,
            "submitted": submitted,
            "occurred": occurred,
            "city": "Phoenix",
            "country": "United States",
            "shape": "Disc",
            "duration": "00:05:00",
            "detailedDescription": "Saw a light\r\n in the sky\t",
            "latitude": 33.448,
            "longitude": -112.074,
            "logNumber": 82631
        }));
        let sighting = normalizer.from_search_item(&item).await.unwrap();

        let expected_reported = Local
            .timestamp_millis_opt(submitted)
            .unwrap()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let expected_sighted = Local
            .timestamp_millis_opt(occurred)
            .unwrap()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        assert_eq!(sighting.id, "82631");
        assert_eq!(sighting.reported_at, Some(expected_reported));
        assert_eq!(sighting.sighted_at, Some(expected_sighted));
        assert_eq!(sighting.description, "Saw a light in the sky");
        assert_eq!(sighting.latitude, Some(33.448));
        assert_eq!(sighting.longitude, Some(-112.074));
        assert_eq!(sighting.case_number.as_deref(), Some("82631"));
    }

    #[tokio::test]
    async fn test_from_search_item_bad_epoch_degrades_field() {
        let geocoder = StubGeocoder { coordinates: None };
        let normalizer = Normalizer::new(&geocoder);

        let item = search_item(json!({
            "id": "82632",
            "submitted": "not-a-number",
            "city": "Phoenix",
            "country": "United States",
            "latitude": 33.448,
            "longitude": -112.074
        }));
        let sighting = normalizer.from_search_item(&item).await.unwrap();

        assert_eq!(sighting.id, "82632");
        assert_eq!(sighting.reported_at, None);
        assert_eq!(sighting.sighted_at, None);
    }

    #[tokio::test]
    async fn test_from_search_item_missing_id_is_malformed() {
        let geocoder = StubGeocoder { coordinates: None };
        let normalizer = Normalizer::new(&geocoder);

        let item = search_item(json!({
            "city": "Phoenix",
            "country": "United States"
        }));
        let result = normalizer.from_search_item(&item).await;

        assert!(matches!(result, Err(CrawlerError::MalformedDocument(_))));
    }

    #[test]
    fn test_epoch_string_is_accepted() {
        let value = json!("1488484872000");
        let stamp = epoch_millis_to_local(Some(&value)).unwrap();
        assert_eq!(stamp.len(), "2017-03-02 20:01:12".len());
    }

    #[tokio::test]
    async fn test_payload_coordinates_skip_geocoding() {
        // A failing geocoder must not matter when the payload already has
        // both coordinates
        let geocoder = StubGeocoder { coordinates: None };
        let normalizer = Normalizer::new(&geocoder);

        let item = search_item(json!({
            "id": 7,
            "latitude": 1.5,
            "longitude": 2.5
        }));
        let sighting = normalizer.from_search_item(&item).await.unwrap();

        assert_eq!(sighting.latitude, Some(1.5));
        assert_eq!(sighting.longitude, Some(2.5));
        assert_eq!(sighting.location, " ()");
    }
}
