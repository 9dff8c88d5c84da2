//! Boucle de téléchargement séquentielle
//!
//! Une seule requête en vol, une pause fixe entre deux requêtes, et
//! l'annulation observée pendant la requête comme pendant la pause. L'état
//! accumulé (features et rapport) traverse la boucle par valeur.

use std::time::Duration;

use tracing::{info, warn};

use super::{CancelSignal, TileSource};
use crate::report::AcquisitionReport;
use crate::types::{RawFeature, TileSpec};

/// État accumulé d'un run
#[derive(Debug, Default)]
pub struct FetchRun {
    pub features: Vec<RawFeature>,
    pub report: AcquisitionReport,
}

impl FetchRun {
    pub fn new(report: AcquisitionReport) -> Self {
        Self {
            features: Vec::new(),
            report,
        }
    }
}

/// Téléchargeur cadencé
#[derive(Debug, Clone, Copy)]
pub struct PacedFetcher {
    pacing: Duration,
}

impl PacedFetcher {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Télécharge les tuiles dans l'ordre de la grille.
    ///
    /// Une tuile en échec est enregistrée puis la boucle continue. Une
    /// annulation arrête tout : la tuile en vol est abandonnée et n'est pas
    /// comptée comme traitée.
    pub async fn run<S>(
        &self,
        source: &S,
        tiles: &[TileSpec],
        cancel: &CancelSignal,
        mut run: FetchRun,
    ) -> FetchRun
    where
        S: TileSource + ?Sized,
    {
        let total = tiles.len();

        for (index, tile) in tiles.iter().enumerate() {
            if cancel.is_cancelled() {
                run.report.record_cancelled();
                break;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = source.fetch(&tile.bbox) => Some(result),
            };

            match result {
                None => {
                    info!(tile = index + 1, total, "Annulé pendant la requête");
                    run.report.record_cancelled();
                    break;
                }
                Some(Ok(payload)) => {
                    info!(
                        tile = index + 1,
                        total,
                        row = tile.row,
                        col = tile.col,
                        features = payload.features.len(),
                        "Tuile téléchargée"
                    );
                    run.report.record_tile_success(
                        tile,
                        payload.features.len(),
                        payload.geometry_errors,
                        payload.truncated,
                    );
                    run.features.extend(payload.features);
                }
                Some(Err(e)) => {
                    warn!(
                        tile = index + 1,
                        total,
                        row = tile.row,
                        col = tile.col,
                        error = %e,
                        "Tuile en échec"
                    );
                    run.report.record_tile_failure(tile, &e);
                }
            }

            // pas de pause après la dernière tuile
            if index + 1 < total {
                let interrupted = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(self.pacing) => false,
                };
                if interrupted {
                    info!(processed = index + 1, total, "Annulé pendant la pause");
                    run.report.record_cancelled();
                    break;
                }
            }
        }

        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::TilePayload;
    use crate::types::{BoundingBox, Crs};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Source qui échoue sur les colonnes listées et note l'instant de chaque appel
    struct Scripted {
        failing_cols: Vec<usize>,
        calls: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl TileSource for Scripted {
        async fn fetch(&self, bbox: &BoundingBox) -> Result<TilePayload, FetchError> {
            self.calls.lock().unwrap().push(Instant::now());
            let col = bbox.min_x() as usize;
            if self.failing_cols.contains(&col) {
                Err(FetchError::Http(503))
            } else {
                Ok(TilePayload::default())
            }
        }
    }

    fn tiles(n: usize) -> Vec<TileSpec> {
        (0..n)
            .map(|col| TileSpec {
                row: 0,
                col,
                bbox: BoundingBox::new(col as f64, 0.0, col as f64 + 1.0, 1.0, Crs::WGS84).unwrap(),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_requests() {
        let source = Scripted {
            failing_cols: vec![],
            calls: Mutex::new(Vec::new()),
        };
        let fetcher = PacedFetcher::new(Duration::from_secs(5));
        let start = Instant::now();
        let run = fetcher
            .run(&source, &tiles(3), &CancelSignal::new(), FetchRun::default())
            .await;

        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(5));
        }
        // deux pauses seulement
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(run.report.tiles_processed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_run() {
        let source = Scripted {
            failing_cols: vec![1],
            calls: Mutex::new(Vec::new()),
        };
        let fetcher = PacedFetcher::new(Duration::from_secs(1));
        let run = fetcher
            .run(&source, &tiles(3), &CancelSignal::new(), FetchRun::default())
            .await;

        assert_eq!(run.report.tiles_processed, 3);
        assert_eq!(run.report.tiles_failed, 1);
        assert_eq!(run.report.outcomes[1].error_kind, Some("TileFetchError"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_pause() {
        let source = Scripted {
            failing_cols: vec![],
            calls: Mutex::new(Vec::new()),
        };
        let fetcher = PacedFetcher::new(Duration::from_secs(5));
        let cancel = CancelSignal::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let run = fetcher
            .run(&source, &tiles(4), &cancel, FetchRun::default())
            .await;

        // tuiles à t=0 et t=5, annulation à t=7 pendant la deuxième pause
        assert_eq!(run.report.tiles_processed, 2);
        assert!(run.report.cancelled);
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let source = Scripted {
            failing_cols: vec![],
            calls: Mutex::new(Vec::new()),
        };
        let cancel = CancelSignal::new();
        cancel.cancel();
        let run = PacedFetcher::new(Duration::from_secs(5))
            .run(&source, &tiles(2), &cancel, FetchRun::default())
            .await;

        assert!(source.calls.lock().unwrap().is_empty());
        assert_eq!(run.report.tiles_processed, 0);
        assert!(run.report.cancelled);
    }
}
