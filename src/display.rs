//! Presentation rows produced by route previews and transfer info lookups

use serde::{Deserialize, Serialize};

/// Placeholder for values that are not known yet
pub const NO_INPUT: &str = "—";

/// Whether a displayed value is final or an approximation that may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueStatus {
    #[default]
    Final,
    Estimate,
}

/// One (title, value) row with optional nested rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub title: String,
    pub value: String,
    #[serde(default)]
    pub status: ValueStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<DisplayRow>,
}

impl DisplayRow {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            status: ValueStatus::Final,
            rows: Vec::new(),
        }
    }

    pub fn estimate(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            status: ValueStatus::Estimate,
            ..Self::new(title, value)
        }
    }

    pub fn with_rows(mut self, rows: Vec<DisplayRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn is_estimate(&self) -> bool {
        self.status == ValueStatus::Estimate
    }
}

/// Ordered rows describing a transfer
pub type TransferDisplayData = Vec<DisplayRow>;

/// Find a top-level row by title
pub fn find_row<'a>(data: &'a [DisplayRow], title: &str) -> Option<&'a DisplayRow> {
    data.iter().find(|row| row.title == title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_lookup() {
        let data = vec![
            DisplayRow::new("Amount", "97 USDC"),
            DisplayRow::estimate("Native gas token", "0.01 ETH"),
            DisplayRow::new("Total fee estimates", "2 USDC")
                .with_rows(vec![DisplayRow::new("Relayer fee", "2 USDC")]),
        ];

        assert!(!find_row(&data, "Amount").unwrap().is_estimate());
        assert!(find_row(&data, "Native gas token").unwrap().is_estimate());
        assert_eq!(find_row(&data, "Total fee estimates").unwrap().rows.len(), 1);
        assert!(find_row(&data, "Missing").is_none());
    }

    #[test]
    fn test_serialize_skips_empty_rows() {
        let json = serde_json::to_value(DisplayRow::new("Amount", "1 ETH")).unwrap();
        assert!(json.get("rows").is_none());
        assert_eq!(json["status"], "Final");
    }
}
