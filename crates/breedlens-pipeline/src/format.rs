//! Presentation formatting and CSV export
//!
//! Truncates the ranked prediction sequence to the top N entries, renders
//! confidences as percentages rounded to two decimal places, and serializes
//! the result to the downloadable CSV table.

use breedlens_core::{Error, PredictionItem, Result};
use serde::{Deserialize, Serialize};

/// Download filename for the exported table
pub const EXPORT_FILE_NAME: &str = "animal_predictions.csv";

/// Export header row
const CSV_HEADER: [&str; 2] = ["Breed", "Confidence (%)"];

/// Number of predictions displayed by default
pub const DEFAULT_TOP_N: usize = 3;

/// One display row: label plus confidence as a rounded percentage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    /// Predicted label
    pub label: String,

    /// Confidence in [0.00, 100.00], rounded to 2 decimal places
    pub confidence_pct: f32,
}

/// Formatted, truncated prediction table ready for display and export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionReport {
    rows: Vec<DisplayRow>,
}

impl PredictionReport {
    /// An empty report (suppressed or failed runs export an empty table)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Format the ranked predictions, keeping the first `top_n` entries.
    ///
    /// The input is always a ranked sequence; the report is its prefix, so
    /// display order equals rank order.
    pub fn format(predictions: &[PredictionItem], top_n: usize) -> Self {
        let rows = predictions
            .iter()
            .take(top_n)
            .map(|p| DisplayRow {
                label: p.label.clone(),
                confidence_pct: round2(p.confidence_pct()),
            })
            .collect();

        Self { rows }
    }

    /// Display rows, in rank order
    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    /// Whether the report holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of display rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Serialize to the exported CSV form, header row first
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(CSV_HEADER)
            .map_err(|e| Error::internal(format!("csv write failed: {e}")))?;

        for row in &self.rows {
            writer
                .write_record([row.label.as_str(), &format!("{:.2}", row.confidence_pct)])
                .map_err(|e| Error::internal(format!("csv write failed: {e}")))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::internal(format!("csv flush failed: {e}")))?;
        String::from_utf8(bytes).map_err(|e| Error::internal(format!("csv not utf-8: {e}")))
    }

    /// Parse a previously exported CSV back into a report
    pub fn from_csv(data: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(data.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| Error::internal(format!("csv parse failed: {e}")))?;
        if headers.iter().collect::<Vec<_>>() != CSV_HEADER {
            return Err(Error::internal(format!("unexpected csv header: {headers:?}")));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Error::internal(format!("csv parse failed: {e}")))?;
            let label = record.get(0).unwrap_or_default().to_string();
            let confidence_pct: f32 = record
                .get(1)
                .unwrap_or_default()
                .parse()
                .map_err(|e| Error::internal(format!("bad confidence field: {e}")))?;
            rows.push(DisplayRow {
                label,
                confidence_pct,
            });
        }

        Ok(Self { rows })
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(items: &[(&str, f32)]) -> Vec<PredictionItem> {
        items
            .iter()
            .map(|(label, confidence)| PredictionItem::new(*label, *confidence))
            .collect()
    }

    #[test]
    fn truncates_to_top_n_in_rank_order() {
        let predictions = ranked(&[
            ("golden retriever", 0.82),
            ("Labrador retriever", 0.10),
            ("kuvasz", 0.04),
            ("Great Pyrenees", 0.02),
            ("Samoyed", 0.01),
        ]);

        let report = PredictionReport::format(&predictions, 3);
        assert_eq!(report.len(), 3);
        assert_eq!(report.rows()[0].label, "golden retriever");
        assert_eq!(report.rows()[2].label, "kuvasz");
    }

    #[test]
    fn top_n_larger_than_input_keeps_everything() {
        let predictions = ranked(&[("pug", 0.9), ("beagle", 0.1)]);
        let report = PredictionReport::format(&predictions, 5);
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn confidence_is_a_percentage_rounded_to_two_places() {
        let predictions = ranked(&[("pug", 0.87654), ("beagle", 0.00049)]);
        let report = PredictionReport::format(&predictions, 3);

        assert_eq!(report.rows()[0].confidence_pct, 87.65);
        assert_eq!(report.rows()[1].confidence_pct, 0.05);
        for row in report.rows() {
            assert!((0.0..=100.0).contains(&row.confidence_pct));
        }
    }

    #[test]
    fn empty_input_yields_header_only_csv() {
        let report = PredictionReport::format(&[], 3);
        assert!(report.is_empty());

        let csv = report.to_csv().unwrap();
        assert_eq!(csv.trim_end(), "Breed,Confidence (%)");
    }

    #[test]
    fn csv_round_trip_preserves_rows_and_order() {
        let predictions = ranked(&[
            ("golden retriever", 0.8211),
            ("Labrador retriever", 0.1049),
            ("kuvasz", 0.0407),
        ]);
        let report = PredictionReport::format(&predictions, 3);

        let exported = report.to_csv().unwrap();
        let parsed = PredictionReport::from_csv(&exported).unwrap();

        assert_eq!(parsed.rows(), report.rows());
    }

    #[test]
    fn csv_labels_with_commas_survive_round_trip() {
        let predictions = ranked(&[("Saint Bernard, rough coat", 0.61)]);
        let report = PredictionReport::format(&predictions, 3);

        let exported = report.to_csv().unwrap();
        let parsed = PredictionReport::from_csv(&exported).unwrap();

        assert_eq!(parsed.rows()[0].label, "Saint Bernard, rough coat");
    }

    #[test]
    fn rejects_foreign_csv_header() {
        assert!(PredictionReport::from_csv("a,b\nx,1.0\n").is_err());
    }
}
