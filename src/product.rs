//! Product records extracted from shop pages
//!
//! `ProductRecord` is the one record shape every page handler emits. Fields
//! a site does not publish stay `None` (or empty) instead of varying the
//! shape per site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tractor part as listed by one shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product name as shown by the shop
    pub name: String,

    /// Shop's own product code (SKU), if published
    pub number: Option<String>,

    /// Absolute URL of the product page
    pub link: String,

    /// Normalized decimal price, e.g. "12.50"
    pub price: Option<String>,

    /// OEM part numbers in page order
    pub oem_numbers: Option<Vec<String>>,

    /// Tractor models this part fits
    #[serde(default)]
    pub compatible: Vec<Compatibility>,

    /// Stock status text, e.g. "Varastossa"
    pub availability: Option<String>,

    /// Shop's category for the part
    pub category: Option<String>,

    /// Site identifier (the configured site name)
    pub site: String,

    /// ISO country codes the shop sells to
    #[serde(default)]
    pub country: Vec<String>,

    /// When the record was scraped
    pub scraped_date: DateTime<Utc>,
}

/// One compatibility row: a machine type and make with its models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    pub kind: String,
    pub make: String,
    pub models: Vec<String>,
}

impl ProductRecord {
    /// Creates a record with only the required fields set
    pub fn new(name: impl Into<String>, link: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: None,
            link: link.into(),
            price: None,
            oem_numbers: None,
            compatible: Vec::new(),
            availability: None,
            category: None,
            site: site.into(),
            country: Vec::new(),
            scraped_date: Utc::now(),
        }
    }

    /// The product code used in the uniqueness key; empty when absent
    pub fn number_key(&self) -> &str {
        self.number.as_deref().unwrap_or("")
    }
}

/// Normalizes a scraped price text into a plain decimal string
///
/// Whitespace (including non-breaking spaces) and currency symbols are
/// dropped. The last `,` or `.` is the decimal separator unless it also
/// appears earlier, in which case every separator groups thousands. A
/// trailing `,-` marks a whole amount. Returns None when what is left is
/// not a number.
///
/// # Examples
///
/// ```
/// use partcrawl::product::normalize_price;
///
/// assert_eq!(normalize_price("1 234,50 €"), Some("1234.50".to_string()));
/// assert_eq!(normalize_price("12.90"), Some("12.90".to_string()));
/// assert_eq!(normalize_price("12,- €"), Some("12".to_string()));
/// assert_eq!(normalize_price("1.234,50"), Some("1234.50".to_string()));
/// assert_eq!(normalize_price("Kysy hintaa"), None);
/// ```
pub fn normalize_price(text: &str) -> Option<String> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    let kept = kept
        .trim_end_matches('-')
        .trim_matches(|c| c == ',' || c == '.');

    let normalized = match kept.rfind([',', '.']) {
        Some(pos) if !kept[..pos].contains(&kept[pos..=pos]) => {
            format!("{}.{}", without_separators(&kept[..pos]), &kept[pos + 1..])
        }
        _ => without_separators(kept),
    };

    if normalized.is_empty() || normalized.parse::<f64>().is_err() {
        return None;
    }

    Some(normalized)
}

fn without_separators(part: &str) -> String {
    part.chars().filter(|c| *c != ',' && *c != '.').collect()
}

/// Collapses runs of whitespace and trims; empty results become None
pub fn clean_text(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = ProductRecord::new("Bolt", "https://x.fi/bolt", "X");
        assert_eq!(record.name, "Bolt");
        assert_eq!(record.number_key(), "");
        assert!(record.oem_numbers.is_none());
        assert!(record.compatible.is_empty());
    }

    #[test]
    fn test_number_key() {
        let mut record = ProductRecord::new("Bolt", "https://x.fi/bolt", "X");
        record.number = Some("123".to_string());
        assert_eq!(record.number_key(), "123");
    }

    #[test]
    fn test_normalize_price_variants() {
        assert_eq!(normalize_price("10"), Some("10".to_string()));
        assert_eq!(normalize_price(" 24,90\u{a0}€ "), Some("24.90".to_string()));
        assert_eq!(normalize_price("€ 5.5"), Some("5.5".to_string()));
        assert_eq!(normalize_price(""), None);
        assert_eq!(normalize_price("Price Not Available"), None);
    }

    #[test]
    fn test_normalize_price_whole_amounts() {
        assert_eq!(normalize_price("12,-"), Some("12".to_string()));
        assert_eq!(normalize_price("149.- €"), Some("149".to_string()));
        assert_eq!(normalize_price("12,–"), Some("12".to_string()));
    }

    #[test]
    fn test_normalize_price_thousands_separators() {
        assert_eq!(normalize_price("1.234,50"), Some("1234.50".to_string()));
        assert_eq!(normalize_price("1,234.50"), Some("1234.50".to_string()));
        assert_eq!(normalize_price("1.234.567"), Some("1234567".to_string()));
        assert_eq!(normalize_price("2 100,00 €"), Some("2100.00".to_string()));
    }

    #[test]
    fn test_normalize_price_rejects_ranges() {
        assert_eq!(normalize_price("10-20"), None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("  Öljynsuodatin \n\t Valtra  "),
            Some("Öljynsuodatin Valtra".to_string())
        );
        assert_eq!(clean_text(" \n "), None);
    }

    #[test]
    fn test_record_json_roundtrip_keeps_compatibility() {
        let mut record = ProductRecord::new("Hihna", "https://x.fi/hihna", "Hankkija");
        record.compatible.push(Compatibility {
            kind: "Traktori".to_string(),
            make: "Valtra".to_string(),
            models: vec!["6400".to_string(), "6600".to_string()],
        });
        let json = serde_json::to_string(&record).unwrap();
        let back: ProductRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
