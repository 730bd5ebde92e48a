//! Telemetry time-series data types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplace site a product roster belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiteCode {
    Us,
    Ca,
    Uk,
    De,
}

impl SiteCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteCode::Us => "US",
            SiteCode::Ca => "CA",
            SiteCode::Uk => "UK",
            SiteCode::De => "DE",
        }
    }

    /// All supported sites, for error messages.
    pub const ALL: [SiteCode; 4] = [SiteCode::Us, SiteCode::Ca, SiteCode::Uk, SiteCode::De];
}

impl fmt::Display for SiteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteCode {
    type Err = UnsupportedSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(SiteCode::Us),
            "CA" => Ok(SiteCode::Ca),
            "UK" => Ok(SiteCode::Uk),
            "DE" => Ok(SiteCode::De),
            other => Err(UnsupportedSite(other.to_string())),
        }
    }
}

/// Error for a site code outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedSite(pub String);

impl fmt::Display for UnsupportedSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported site: {:?} (expected one of US, CA, UK, DE)", self.0)
    }
}

impl std::error::Error for UnsupportedSite {}

/// One day of telemetry for one tracked product on one site.
///
/// Unique on (site, asin, date); the merge writer overwrites every other
/// column on conflict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryRow {
    pub site: SiteCode,
    pub asin: String,
    pub date: NaiveDate,
    pub buybox_price: f64,
    pub price: f64,
    pub prime_price: Option<f64>,
    pub coupon_price: Option<f64>,
    pub coupon_discount: Option<f64>,
    pub child_sales: Option<i64>,
    pub fba_price: Option<f64>,
    pub fbm_price: Option<f64>,
    pub strikethrough_price: Option<f64>,
    pub rank: Option<i64>,
    pub category_rank_variant: Option<i64>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub seller_count: Option<i64>,
}

impl TelemetryRow {
    /// A row with the merge key set and every telemetry column empty
    /// (prices at their 0 defaults).
    pub fn empty(site: SiteCode, asin: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            site,
            asin: asin.into(),
            date,
            buybox_price: 0.0,
            price: 0.0,
            prime_price: None,
            coupon_price: None,
            coupon_discount: None,
            child_sales: None,
            fba_price: None,
            fbm_price: None,
            strikethrough_price: None,
            rank: None,
            category_rank_variant: None,
            rating: None,
            rating_count: None,
            seller_count: None,
        }
    }
}

/// One tracked product in the latest roster snapshot for a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTarget {
    pub asin: String,
    pub product_url: String,
    pub rank: i64,
    pub snapshot_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_code_parse() {
        assert_eq!("us".parse::<SiteCode>().unwrap(), SiteCode::Us);
        assert_eq!(" DE ".parse::<SiteCode>().unwrap(), SiteCode::De);
        assert!("FR".parse::<SiteCode>().is_err());
        assert!("".parse::<SiteCode>().is_err());
    }

    #[test]
    fn test_site_code_roundtrip() {
        for site in SiteCode::ALL {
            assert_eq!(site.as_str().parse::<SiteCode>().unwrap(), site);
        }
    }

    #[test]
    fn test_site_code_serde_uppercase() {
        let json = serde_json::to_string(&SiteCode::Uk).unwrap();
        assert_eq!(json, "\"UK\"");
        let parsed: SiteCode = serde_json::from_str("\"CA\"").unwrap();
        assert_eq!(parsed, SiteCode::Ca);
    }

    #[test]
    fn test_empty_row_defaults() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let row = TelemetryRow::empty(SiteCode::Us, "B0TEST00AA", date);
        assert_eq!(row.buybox_price, 0.0);
        assert_eq!(row.price, 0.0);
        assert!(row.rank.is_none());
        assert!(row.rating.is_none());
    }
}
