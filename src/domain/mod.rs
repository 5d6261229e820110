/// Domain models for AOI acquisition tracking
use crate::errors::{TrackerError, TrackerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported acquisition satellites with their database identifiers.
///
/// The parameter-key prefix selects the per-satellite downloader settings
/// (`downloader.s2.max-retries` vs `downloader.l8.max-retries`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Satellite {
    Sentinel2,
    Landsat8,
}

impl Satellite {
    pub const ALL: [Satellite; 2] = [Satellite::Sentinel2, Satellite::Landsat8];

    pub fn id(&self) -> i16 {
        match self {
            Satellite::Sentinel2 => 1,
            Satellite::Landsat8 => 2,
        }
    }

    pub fn param_prefix(&self) -> &'static str {
        match self {
            Satellite::Sentinel2 => "s2.",
            Satellite::Landsat8 => "l8.",
        }
    }
}

impl fmt::Display for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Satellite::Sentinel2 => write!(f, "Sentinel-2"),
            Satellite::Landsat8 => write!(f, "Landsat-8"),
        }
    }
}

/// Download/processing status of a product, as stored in
/// `downloader_history.status_id`.
///
/// `Processed` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Downloading,
    Downloaded,
    Failed,
    Aborted,
    Processed,
}

impl Status {
    pub fn id(&self) -> i16 {
        match self {
            Status::Downloading => 1,
            Status::Downloaded => 2,
            Status::Failed => 3,
            Status::Aborted => 4,
            Status::Processed => 5,
        }
    }

    /// Maps a raw status id back to a status; unknown ids are rejected
    /// before any write happens.
    pub fn from_id(id: i16) -> TrackerResult<Status> {
        match id {
            1 => Ok(Status::Downloading),
            2 => Ok(Status::Downloaded),
            3 => Ok(Status::Failed),
            4 => Ok(Status::Aborted),
            5 => Ok(Status::Processed),
            other => Err(TrackerError::UnknownStatus(other)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Processed | Status::Aborted)
    }
}

/// A recurring acquisition season given as calendar month/day bounds.
///
/// Only range checks apply (month 1..=12, day 1..=31); the season may wrap
/// the new year, e.g. November through February.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Season {
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
}

impl Season {
    /// Parses the configuration wire format: a pair of `MMDD` strings
    /// such as `("0601", "0831")`.
    pub fn parse(start: &str, end: &str) -> TrackerResult<Season> {
        let field = |s: &str, lo: usize, hi: usize| -> TrackerResult<u32> {
            s.get(lo..hi)
                .and_then(|f| f.parse::<u32>().ok())
                .ok_or_else(|| {
                    TrackerError::InvalidSeasonBounds(format!(
                        "expected MMDD, got '{}' / '{}'",
                        start, end
                    ))
                })
        };
        Ok(Season {
            start_month: field(start, 0, 2)?,
            start_day: field(start, 2, 4)?,
            end_month: field(end, 0, 2)?,
            end_day: field(end, 2, 4)?,
        })
    }
}

/// Start/end years a season resolves to for a particular "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonSpan {
    pub start_year: i32,
    pub end_year: i32,
}

/// One row of the site catalog.
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i16,
    pub short_name: String,
    /// Footprint as WKT.
    pub polygon: String,
}

/// One row of `downloader_history`.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: i32,
    pub site_id: i16,
    pub satellite_id: i16,
    pub product_name: String,
    pub full_path: String,
    pub status: Status,
    pub retries: i16,
    pub product_date: DateTime<Utc>,
}

/// Everything a downloader instance needs to know about one site for one
/// run: resolved season, acquisition limits, output location, the products
/// already accounted for, and the tiles to request.
///
/// Built per site per invocation, immutable afterwards.
#[derive(Debug, Clone)]
pub struct AoiContext {
    pub site_id: i16,
    pub site_name: String,
    pub polygon: String,
    pub season: Season,
    pub span: SeasonSpan,
    pub max_cloud_coverage: i32,
    pub max_retries: i16,
    pub write_dir: String,
    pub history_products: Vec<String>,
    pub tiles: Vec<String>,
}

impl AoiContext {
    /// Whether a product has already been recorded for this site, other than
    /// in-flight or retryable states.
    pub fn has_product(&self, product_name: &str) -> bool {
        self.history_products.iter().any(|p| p == product_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ids_round_trip() {
        for status in [
            Status::Downloading,
            Status::Downloaded,
            Status::Failed,
            Status::Aborted,
            Status::Processed,
        ] {
            assert_eq!(Status::from_id(status.id()).unwrap(), status);
        }
    }

    #[test]
    fn test_status_unknown_id_rejected() {
        assert!(matches!(
            Status::from_id(6),
            Err(TrackerError::UnknownStatus(6))
        ));
        assert!(matches!(
            Status::from_id(0),
            Err(TrackerError::UnknownStatus(0))
        ));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(Status::Processed.is_terminal());
        assert!(Status::Aborted.is_terminal());
        assert!(!Status::Failed.is_terminal());
        assert!(!Status::Downloading.is_terminal());
    }

    #[test]
    fn test_season_parse() {
        let season = Season::parse("0601", "0831").unwrap();
        assert_eq!(season.start_month, 6);
        assert_eq!(season.start_day, 1);
        assert_eq!(season.end_month, 8);
        assert_eq!(season.end_day, 31);
    }

    #[test]
    fn test_season_parse_rejects_garbage() {
        assert!(Season::parse("06", "0831").is_err());
        assert!(Season::parse("junk", "0831").is_err());
        assert!(Season::parse("", "").is_err());
    }

    #[test]
    fn test_has_product() {
        let ctx = AoiContext {
            site_id: 1,
            site_name: "Timisoara".to_string(),
            polygon: "POLYGON((0 0,1 0,1 1,0 0))".to_string(),
            season: Season {
                start_month: 6,
                start_day: 1,
                end_month: 8,
                end_day: 31,
            },
            span: SeasonSpan {
                start_year: 2024,
                end_year: 2024,
            },
            max_cloud_coverage: 80,
            max_retries: 3,
            write_dir: "/mnt/archive/Timisoara".to_string(),
            history_products: vec!["LC81850292024200LGN00".to_string()],
            tiles: vec!["34TFQ".to_string()],
        };
        assert!(ctx.has_product("LC81850292024200LGN00"));
        assert!(!ctx.has_product("LC81850292024216LGN00"));
    }

    #[test]
    fn test_satellite_prefixes() {
        assert_eq!(Satellite::Sentinel2.param_prefix(), "s2.");
        assert_eq!(Satellite::Landsat8.param_prefix(), "l8.");
        assert_eq!(Satellite::Sentinel2.id(), 1);
        assert_eq!(Satellite::Landsat8.id(), 2);
    }
}
