/// Product-name parsing
///
/// Satellite products carry their acquisition time in the product name;
/// this module recovers the satellite and timestamp from the two supported
/// naming schemes.
use crate::domain::Satellite;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Satellite and acquisition time recovered from a raw product name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductInfo {
    pub satellite: Satellite,
    pub acquisition: DateTime<Utc>,
}

fn s2_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\w+_V(\d{8}T\d{6})_\w+\.SAFE$").expect("valid regex"))
}

fn lc8_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^LC8\d{6}(\d{7})LGN\d{2}$").expect("valid regex"))
}

/// Parses a product name into satellite and acquisition time.
///
/// Sentinel-2 names embed a full `yyyymmddThhmmss` timestamp; Landsat-8
/// names embed the acquisition as `yyyyDDD` (year + day of year), which
/// resolves to midnight UTC of that day. Names matching neither scheme,
/// or carrying an impossible date, return `None`.
pub fn parse_product_name(name: &str) -> Option<ProductInfo> {
    if name.starts_with("S2") {
        let captures = s2_re().captures(name)?;
        let stamp = NaiveDateTime::parse_from_str(&captures[1], "%Y%m%dT%H%M%S").ok()?;
        return Some(ProductInfo {
            satellite: Satellite::Sentinel2,
            acquisition: stamp.and_utc(),
        });
    }
    if name.starts_with("LC8") {
        let captures = lc8_re().captures(name)?;
        let field = &captures[1];
        let year: i32 = field[0..4].parse().ok()?;
        let doy: u32 = field[4..7].parse().ok()?;
        let date = NaiveDate::from_yo_opt(year, doy)?;
        return Some(ProductInfo {
            satellite: Satellite::Landsat8,
            acquisition: date.and_hms_opt(0, 0, 0)?.and_utc(),
        });
    }
    None
}
