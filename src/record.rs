use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Write;

/// A single UFO report in canonical form.
///
/// Built once per retrieved item, written straight to the output file,
/// then discarded. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sighting {
    pub id: String,
    pub sighted_at: Option<String>,
    pub reported_at: Option<String>,
    pub location: String,
    pub shape: Option<String>,
    pub duration: Option<String>,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub case_number: Option<String>,
    /// Organization tag; kept on the record but not a CSV column
    #[serde(skip_serializing)]
    pub source: String,
}

/// Formats a location as "city (country)".
pub fn format_location(city: &str, country: &str) -> String {
    format!("{} ({})", city, country)
}

/// Removes all line breaks, carriage returns and tabs, then trims
/// surrounding whitespace.
pub fn clean(text: &str) -> String {
    text.replace(['\r', '\n', '\t'], "").trim().to_string()
}

/// Appends reports to a CSV file as they arrive. Comma delimited, all
/// fields quoted, absent values written as empty fields.
pub struct SightingWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl SightingWriter<File> {
    pub fn create(path: &str) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> SightingWriter<W> {
    pub fn from_writer(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(inner);
        Self { writer }
    }

    /// Serializes one record and flushes it, so a crash mid-crawl loses at
    /// most the in-flight report.
    pub fn write(&mut self, sighting: &Sighting) -> Result<()> {
        self.writer.serialize(sighting)?;
        self.writer.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer.into_inner().expect("flush failed")
    }
}
