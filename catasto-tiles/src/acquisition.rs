//! Orchestration d'un run d'acquisition
//!
//! normalisation → grille → préfiltre → téléchargement cadencé →
//! réconciliation. Les erreurs de normalisation et de planification
//! interrompent le run avant toute requête ; ensuite, plus rien n'échoue.

use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use crate::area::{AreaNormalizer, AreaRequest};
use crate::config::Config;
use crate::error::AcquisitionError;
use crate::fetch::{CancelSignal, FetchRun, PacedFetcher, TileSource};
use crate::reconcile::reconcile;
use crate::report::AcquisitionReport;
use crate::tiling::{prefilter, TileGridPlanner, TilePlan};
use crate::types::{AreaOfInterest, ReconciledFeature};

/// Zone normalisée et grille préfiltrée, prêtes à être téléchargées
#[derive(Debug, Clone)]
pub struct PlannedRun {
    pub area: AreaOfInterest,
    pub plan: TilePlan,
    pub pacing: Duration,
}

impl PlannedRun {
    /// Durée estimée du téléchargement
    pub fn estimated_duration(&self) -> Duration {
        self.plan.estimated_duration(self.pacing)
    }
}

/// Résultat final : features réconciliées et rapport complet
#[derive(Debug)]
pub struct AcquisitionResult {
    pub features: Vec<ReconciledFeature>,
    pub report: AcquisitionReport,
}

/// Prépare un run sans aucune requête réseau (utilisé tel quel par `--dry-run`)
pub fn plan(config: &Config, request: &AreaRequest) -> Result<PlannedRun, AcquisitionError> {
    config.validate()?;

    let area = AreaNormalizer::new(config.service_crs).normalize(request)?;
    let planner = TileGridPlanner::new(config.max_tile_area_km2)?.with_max_tiles(config.max_tiles);
    let mut plan = planner.plan(&area.bbox)?;
    let skipped = prefilter(&mut plan, area.filter.as_ref());

    info!(
        bbox = %area.bbox,
        area_km2 = %format!("{:.2}", plan.area_km2),
        grid = %format!("{}x{}", plan.rows, plan.cols),
        tiles = plan.len(),
        skipped,
        "Grille calculée"
    );

    Ok(PlannedRun {
        area,
        plan,
        pacing: config.pacing(),
    })
}

/// Télécharge et réconcilie un run planifié ; ne peut pas échouer
pub async fn execute<S>(planned: &PlannedRun, source: &S, cancel: &CancelSignal) -> AcquisitionResult
where
    S: TileSource + ?Sized,
{
    let start = Instant::now();

    let mut report = AcquisitionReport::new();
    report.record_plan(planned.area.bbox, &planned.plan);

    let fetcher = PacedFetcher::new(planned.pacing);
    let FetchRun {
        features,
        mut report,
    } = fetcher
        .run(source, &planned.plan.tiles, cancel, FetchRun::new(report))
        .await;

    let features = reconcile(features, planned.area.filter.as_ref(), &mut report);

    report.set_duration(start.elapsed());
    report.finalize(features.len());
    info!(summary = %report.summary(), "Acquisition terminée");

    AcquisitionResult { features, report }
}

/// `plan` puis `execute`
pub async fn acquire<S>(
    config: &Config,
    request: &AreaRequest,
    source: &S,
    cancel: &CancelSignal,
) -> Result<AcquisitionResult, AcquisitionError>
where
    S: TileSource + ?Sized,
{
    let planned = plan(config, request)?;
    Ok(execute(&planned, source, cancel).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Crs;
    use geo::{polygon, Coord, MultiPolygon};

    #[test]
    fn test_plan_rectangle() {
        let config = Config::default();
        // ~ 0.0384° x 0.027° autour de Rome ≈ 3.2 x 3.0 km
        let request = AreaRequest::Rectangle {
            a: Coord { x: 12.46, y: 41.88 },
            b: Coord { x: 12.4984, y: 41.907 },
            crs: Crs::RDN2008,
        };
        let planned = plan(&config, &request).unwrap();
        assert!(planned.plan.area_km2 > 4.0);
        assert_eq!(planned.plan.rows, planned.plan.cols);
        assert_eq!(planned.plan.len(), planned.plan.rows * planned.plan.cols);
        assert_eq!(
            planned.estimated_duration(),
            Duration::from_secs(5 * planned.plan.len() as u64)
        );
    }

    #[test]
    fn test_plan_polygon_skips_tiles() {
        let config = Config {
            max_tile_area_km2: 1.0,
            ..Default::default()
        };
        // triangle : le coin nord-est de son emprise est vide
        let shape = MultiPolygon::new(vec![polygon![
            (x: 12.40, y: 41.80), (x: 12.50, y: 41.80), (x: 12.40, y: 41.90), (x: 12.40, y: 41.80)
        ]]);
        let planned = plan(
            &config,
            &AreaRequest::Polygon {
                shape,
                crs: Crs::RDN2008,
            },
        )
        .unwrap();
        assert!(planned.plan.skipped > 0);
        assert!(planned.area.filter.is_some());
    }

    #[test]
    fn test_plan_rejects_invalid_config() {
        let config = Config {
            max_tile_area_km2: -1.0,
            ..Default::default()
        };
        let request = AreaRequest::Rectangle {
            a: Coord { x: 12.0, y: 41.0 },
            b: Coord { x: 12.01, y: 41.01 },
            crs: Crs::RDN2008,
        };
        assert!(matches!(
            plan(&config, &request),
            Err(AcquisitionError::Config(_))
        ));
    }
}
