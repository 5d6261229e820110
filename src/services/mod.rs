/// Business logic services layer
use crate::config::{site_write_dir, SiteParameters};
use crate::domain::{AoiContext, Satellite, Season, SeasonSpan, Status};
use crate::errors::TrackerResult;
use crate::history::Transition;
use crate::repo::{HistoryRepo, SiteRepo};
use crate::season::check_season;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

/// Months past season end during which late acquisitions are still accepted.
pub const GRACE_MONTHS: u32 = 2;

/// Statuses excluded when loading a site's "already seen" products: in-flight
/// and retryable products must stay eligible for reattempt.
const UNSETTLED: [Status; 2] = [Status::Downloading, Status::Failed];

/// Picks the active season for a site, trying summer first, then winter.
///
/// `Ok(None)` means the site is out of both seasons for this run.
fn resolve_site_season(
    params: &SiteParameters,
    today: NaiveDate,
) -> TrackerResult<Option<(Season, SeasonSpan)>> {
    if let Some(span) = check_season(&params.summer, GRACE_MONTHS, today)? {
        return Ok(Some((params.summer, span)));
    }
    if let Some(span) = check_season(&params.winter, GRACE_MONTHS, today)? {
        return Ok(Some((params.winter, span)));
    }
    Ok(None)
}

/// Builds ready-to-use AOI contexts for the sites that are currently in
/// season.
pub struct AoiService {
    sites: SiteRepo,
    history: HistoryRepo,
}

impl AoiService {
    pub fn new(sites: SiteRepo, history: HistoryRepo) -> Self {
        Self { sites, history }
    }

    /// Resolves the eligible AOI contexts for one satellite, relative to the
    /// current day.
    pub async fn resolve_aois(&self, satellite: Satellite) -> TrackerResult<Vec<AoiContext>> {
        self.resolve_aois_at(satellite, Utc::now().date_naive())
            .await
    }

    /// Same as [`resolve_aois`](Self::resolve_aois) with an injected day.
    ///
    /// A failure to read the site catalog fails the whole call; callers can
    /// rely on `Ok(vec![])` meaning "no eligible sites", never "could not
    /// query". Per-site failures drop that site/satellite pair entirely and
    /// processing continues with the remaining sites.
    pub async fn resolve_aois_at(
        &self,
        satellite: Satellite,
        today: NaiveDate,
    ) -> TrackerResult<Vec<AoiContext>> {
        let sites = self.sites.list_sites().await?;
        let keys = SiteParameters::keys(satellite);

        let mut contexts = Vec::new();
        for site in sites {
            let rows = match self.sites.fetch_parameters(site.id, &keys).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(site = %site.short_name, %satellite, "parameter fetch failed, dropping site: {e}");
                    continue;
                }
            };
            let params = match SiteParameters::from_rows(site.id, satellite, &rows) {
                Ok(params) => params,
                Err(e) => {
                    warn!(site = %site.short_name, %satellite, "unusable site configuration: {e}");
                    continue;
                }
            };
            let (season, span) = match resolve_site_season(&params, today) {
                Ok(Some(resolved)) => resolved,
                Ok(None) => {
                    info!(site = %site.short_name, %satellite, "out of season, no request will be made");
                    continue;
                }
                Err(e) => {
                    warn!(site = %site.short_name, %satellite, "season resolution failed: {e}");
                    continue;
                }
            };

            let history_products = match self
                .history
                .list_product_names(site.id, satellite, &UNSETTLED)
                .await
            {
                Ok(names) => names,
                Err(e) => {
                    warn!(site = %site.short_name, %satellite, "history read failed, dropping site: {e}");
                    continue;
                }
            };
            let tiles = match self.sites.list_tiles(site.id, satellite).await {
                Ok(tiles) => tiles,
                Err(e) => {
                    warn!(site = %site.short_name, %satellite, "tile read failed, dropping site: {e}");
                    continue;
                }
            };

            info!(
                site = %site.short_name,
                %satellite,
                start_year = span.start_year,
                end_year = span.end_year,
                products = history_products.len(),
                tiles = tiles.len(),
                "site in season"
            );
            contexts.push(AoiContext {
                site_id: site.id,
                site_name: site.short_name.clone(),
                polygon: site.polygon,
                season,
                span,
                max_cloud_coverage: params.max_cloud_coverage,
                max_retries: params.max_retries,
                write_dir: site_write_dir(&params.write_dir, &site.short_name),
                history_products,
                tiles,
            });
        }
        Ok(contexts)
    }
}

/// Records product lifecycle events and processed outputs.
pub struct HistoryService {
    repo: HistoryRepo,
}

impl HistoryService {
    pub fn new(repo: HistoryRepo) -> Self {
        Self { repo }
    }

    /// Records a status event for a product (insert on first observation,
    /// retry-limited update otherwise).
    #[allow(clippy::too_many_arguments)]
    pub async fn record_event(
        &self,
        site_id: i16,
        satellite: Satellite,
        product_name: &str,
        status: Status,
        product_date: DateTime<Utc>,
        full_path: &str,
        max_retries: i16,
    ) -> TrackerResult<()> {
        let plan = self
            .repo
            .upsert_event(
                site_id,
                satellite,
                product_name,
                status,
                product_date,
                full_path,
                max_retries,
            )
            .await?;
        match plan {
            Transition::Insert { status, .. } => {
                info!(product = product_name, ?status, "history record created");
            }
            Transition::UpdateStatus { status } => {
                info!(product = product_name, ?status, "history status updated");
            }
            Transition::UpdateStatusAndRetries { status, retries } => {
                if status == Status::Aborted {
                    warn!(
                        product = product_name,
                        retries, "retry budget exhausted, aborting product"
                    );
                } else {
                    info!(product = product_name, retries, "download failure recorded");
                }
            }
        }
        Ok(())
    }

    /// Marks a downloaded product as processed; a non-empty tile list also
    /// registers the output in the product catalog, in the same transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn mark_processed(
        &self,
        processor_id: i16,
        site_id: i16,
        history_id: i32,
        tiles: &[String],
        full_path: &str,
        product_name: &str,
        footprint: &str,
        satellite: Satellite,
        acquisition_date: DateTime<Utc>,
    ) -> TrackerResult<()> {
        self.repo
            .mark_processed(
                processor_id,
                site_id,
                history_id,
                tiles,
                full_path,
                product_name,
                footprint,
                satellite,
                acquisition_date,
            )
            .await?;
        info!(
            product = product_name,
            site_id,
            tiles = tiles.len(),
            "product marked processed"
        );
        Ok(())
    }
}
