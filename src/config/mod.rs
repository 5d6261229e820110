/// Application and per-site configuration
use crate::domain::{Satellite, Season};
use crate::errors::{TrackerError, TrackerResult};
use std::env;

/// Process-level configuration shared by every run.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?;
        let max_connections = env_u32("DATABASE_MAX_CONNECTIONS", 5);

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

const PARAM_SUMMER_START: &str = "downloader.summer-season.start";
const PARAM_SUMMER_END: &str = "downloader.summer-season.end";
const PARAM_WINTER_START: &str = "downloader.winter-season.start";
const PARAM_WINTER_END: &str = "downloader.winter-season.end";
const PARAM_MAX_CLOUD_COVERAGE: &str = "downloader.max-cloud-coverage";

/// One row of the `config` key/value table: key, owning site (NULL for the
/// global default), value.
pub type ParameterRow = (String, Option<i16>, String);

/// The seven downloader settings a site needs before it can be resolved
/// into an AOI context.
///
/// Populated from a single batched fetch of the key/value table; a
/// site-scoped row overrides the global default, and a key with neither is
/// a hard failure for that site.
#[derive(Debug, Clone)]
pub struct SiteParameters {
    pub summer: Season,
    pub winter: Season,
    pub max_cloud_coverage: i32,
    pub max_retries: i16,
    pub write_dir: String,
}

impl SiteParameters {
    /// Every key the batched fetch must cover for one site/satellite pair.
    /// Retry limit and write dir are satellite-scoped, the rest are shared.
    pub fn keys(satellite: Satellite) -> [String; 7] {
        let prefix = satellite.param_prefix();
        [
            PARAM_SUMMER_START.to_string(),
            PARAM_SUMMER_END.to_string(),
            PARAM_WINTER_START.to_string(),
            PARAM_WINTER_END.to_string(),
            PARAM_MAX_CLOUD_COVERAGE.to_string(),
            format!("downloader.{}max-retries", prefix),
            format!("downloader.{}write-dir", prefix),
        ]
    }

    /// Folds fetched parameter rows into the typed struct for one site.
    pub fn from_rows(
        site_id: i16,
        satellite: Satellite,
        rows: &[ParameterRow],
    ) -> TrackerResult<SiteParameters> {
        let keys = Self::keys(satellite);
        let lookup = |key: &str| lookup_value(rows, site_id, key);

        let summer = Season::parse(lookup(&keys[0])?, lookup(&keys[1])?)?;
        let winter = Season::parse(lookup(&keys[2])?, lookup(&keys[3])?)?;
        let max_cloud_coverage = parse_value(&keys[4], lookup(&keys[4])?)?;
        let max_retries = parse_value(&keys[5], lookup(&keys[5])?)?;
        let write_dir = lookup(&keys[6])?.to_string();

        Ok(SiteParameters {
            summer,
            winter,
            max_cloud_coverage,
            max_retries,
            write_dir,
        })
    }
}

/// A site-scoped row wins over the global default; a key with neither is a
/// hard failure for that site.
fn lookup_value<'a>(rows: &'a [ParameterRow], site_id: i16, key: &str) -> TrackerResult<&'a str> {
    rows.iter()
        .find(|(k, s, _)| k == key && *s == Some(site_id))
        .or_else(|| rows.iter().find(|(k, s, _)| k == key && s.is_none()))
        .map(|(_, _, v)| v.as_str())
        .ok_or_else(|| TrackerError::MissingParameter {
            key: key.to_string(),
            site_id,
        })
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> TrackerResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TrackerError::InvalidParameter {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// Normalizes a write-dir root to end with a path separator and suffixes
/// the site name, yielding the per-site output directory.
pub fn site_write_dir(root: &str, site_name: &str) -> String {
    if root.ends_with('/') {
        format!("{}{}", root, site_name)
    } else {
        format!("{}/{}", root, site_name)
    }
}
