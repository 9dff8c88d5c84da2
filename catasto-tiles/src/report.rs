//! Rapport d'acquisition avec graceful degradation
//!
//! Le rapport est alimenté tout au long du run et reste produit en cas
//! d'annulation ou d'échec partiel : chaque tuile ignorée, chaque erreur et
//! chaque suppression y est comptée.

use std::time::Duration;

use geo::{BoundingRect, Rect};
use serde::Serialize;

use crate::error::FetchError;
use crate::reconcile::geometry::group_count;
use crate::tiling::TilePlan;
use crate::types::{BoundingBox, ReconciledFeature, TileSpec};

/// Groupes de doublons détaillés dans le rapport
pub const DUPLICATE_SAMPLES: usize = 10;

/// Statut global de l'acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AcquisitionStatus {
    /// Toutes les tuiles ont répondu
    Complete,
    /// Certaines tuiles ont échoué
    Partial,
    /// Interrompue par l'utilisateur (résultat partiel valide)
    Cancelled,
    /// Aucune feature retenue
    Empty,
}

/// Résultat du téléchargement d'une tuile
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub row: usize,
    pub col: usize,
    pub bbox: BoundingBox,
    /// Features retenues pour cette tuile
    pub feature_count: usize,
    /// Features ignorées pour géométrie invalide
    pub geometry_errors: usize,
    /// Le serveur a atteint sa limite de features
    pub truncated: bool,
    /// Catégorie d'erreur (TileFetchError, TileResponseRejected)
    pub error_kind: Option<&'static str>,
    pub error: Option<String>,
}

/// Groupe de géométries identiques, pour diagnostic
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroupSample {
    pub group_id: u32,
    /// Clés d'identité des membres
    pub members: Vec<String>,
    /// Emprise [min_x, min_y, max_x, max_y]
    pub bbox: Option<[f64; 4]>,
}

/// Rapport complet d'acquisition
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionReport {
    /// Statut global
    pub status: AcquisitionStatus,
    /// Durée du run
    pub duration_secs: f64,
    /// Emprise demandée (CRS du service)
    pub bbox: Option<BoundingBox>,
    /// Aire estimée (km²)
    pub area_km2: f64,

    // Tuiles
    pub tiles_planned: usize,
    pub tiles_skipped_by_prefilter: usize,
    pub tiles_processed: usize,
    pub tiles_failed: usize,
    pub tiles_truncated: usize,
    pub cancelled: bool,

    // Features
    pub features_fetched: usize,
    pub geometry_parse_errors: usize,
    pub features_after_identity_dedup: usize,
    pub identity_duplicates_removed: usize,
    pub features_after_geometry_dedup: usize,
    pub duplicate_groups: usize,
    pub duplicate_geometry_features: usize,
    pub spatial_filter_removed: usize,
    pub features_final: usize,

    /// Détail par tuile, dans l'ordre de traitement
    pub outcomes: Vec<FetchOutcome>,
    /// Les premiers groupes de doublons géométriques
    pub duplicate_samples: Vec<DuplicateGroupSample>,
}

impl Default for AcquisitionReport {
    fn default() -> Self {
        Self {
            status: AcquisitionStatus::Complete,
            duration_secs: 0.0,
            bbox: None,
            area_km2: 0.0,
            tiles_planned: 0,
            tiles_skipped_by_prefilter: 0,
            tiles_processed: 0,
            tiles_failed: 0,
            tiles_truncated: 0,
            cancelled: false,
            features_fetched: 0,
            geometry_parse_errors: 0,
            features_after_identity_dedup: 0,
            identity_duplicates_removed: 0,
            features_after_geometry_dedup: 0,
            duplicate_groups: 0,
            duplicate_geometry_features: 0,
            spatial_filter_removed: 0,
            features_final: 0,
            outcomes: Vec::new(),
            duplicate_samples: Vec::new(),
        }
    }
}

impl AcquisitionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre la grille (après préfiltre)
    pub fn record_plan(&mut self, bbox: BoundingBox, plan: &TilePlan) {
        self.bbox = Some(bbox);
        self.area_km2 = plan.area_km2;
        self.tiles_planned = plan.planned();
        self.tiles_skipped_by_prefilter = plan.skipped;
    }

    /// Enregistre une tuile téléchargée
    pub fn record_tile_success(
        &mut self,
        tile: &TileSpec,
        feature_count: usize,
        geometry_errors: usize,
        truncated: bool,
    ) {
        self.tiles_processed += 1;
        self.features_fetched += feature_count;
        self.geometry_parse_errors += geometry_errors;
        if truncated {
            self.tiles_truncated += 1;
        }
        self.outcomes.push(FetchOutcome {
            row: tile.row,
            col: tile.col,
            bbox: tile.bbox,
            feature_count,
            geometry_errors,
            truncated,
            error_kind: None,
            error: None,
        });
    }

    /// Enregistre une tuile en échec
    pub fn record_tile_failure(&mut self, tile: &TileSpec, error: &FetchError) {
        self.tiles_processed += 1;
        self.tiles_failed += 1;
        self.outcomes.push(FetchOutcome {
            row: tile.row,
            col: tile.col,
            bbox: tile.bbox,
            feature_count: 0,
            geometry_errors: 0,
            truncated: false,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
        });
    }

    /// Enregistre l'annulation par l'utilisateur
    pub fn record_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Phase 1
    pub fn record_identity_dedup(&mut self, before: usize, after: usize) {
        self.features_after_identity_dedup = after;
        self.identity_duplicates_removed = before - after;
    }

    /// Phase 2
    pub fn record_geometry_dedup(&mut self, features: &[ReconciledFeature]) {
        self.features_after_geometry_dedup = features.len();
        self.record_groups(features);
    }

    /// Phase 3 : les groupes sont recalculés sur les survivants
    pub fn record_spatial_filter(&mut self, removed: usize, features: &[ReconciledFeature]) {
        self.spatial_filter_removed = removed;
        self.record_groups(features);
    }

    fn record_groups(&mut self, features: &[ReconciledFeature]) {
        self.duplicate_groups = group_count(features);
        self.duplicate_geometry_features =
            features.iter().filter(|f| f.is_duplicate_geometry).count();
        self.duplicate_samples = duplicate_samples(features, DUPLICATE_SAMPLES);
    }

    /// Définit la durée du run
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self, features_final: usize) {
        self.features_final = features_final;
        self.status = if self.cancelled {
            AcquisitionStatus::Cancelled
        } else if self.tiles_failed > 0 {
            AcquisitionStatus::Partial
        } else if features_final == 0 {
            AcquisitionStatus::Empty
        } else {
            AcquisitionStatus::Complete
        };
    }

    /// Affiche le rapport (stderr : stdout porte le GeoJSON)
    pub fn display(&self) {
        eprintln!("\n{}", "=".repeat(60));
        eprintln!("ACQUISITION REPORT");
        eprintln!("{}", "=".repeat(60));

        eprintln!("\nStatus: {:?}", self.status);
        eprintln!("Duration: {:.2}s", self.duration_secs);
        if let Some(bbox) = &self.bbox {
            eprintln!("Area: {} (~{:.2} km²)", bbox, self.area_km2);
        }

        eprintln!("\n--- TILES ---");
        eprintln!(
            "{} planned, {} skipped by prefilter, {} processed, {} failed, {} truncated",
            self.tiles_planned,
            self.tiles_skipped_by_prefilter,
            self.tiles_processed,
            self.tiles_failed,
            self.tiles_truncated
        );
        if self.cancelled {
            eprintln!("Cancelled by user: partial result");
        }

        eprintln!("\n--- FEATURES ---");
        eprintln!(
            "{} fetched, {} invalid geometries dropped",
            self.features_fetched, self.geometry_parse_errors
        );
        eprintln!(
            "Identity dedup: {} removed, {} kept",
            self.identity_duplicates_removed, self.features_after_identity_dedup
        );
        eprintln!(
            "Geometry dedup: {} groups, {} features tagged",
            self.duplicate_groups, self.duplicate_geometry_features
        );
        eprintln!("Spatial filter: {} removed", self.spatial_filter_removed);
        eprintln!("Final: {}", self.features_final);

        if !self.duplicate_samples.is_empty() {
            eprintln!("\n--- DUPLICATE GEOMETRIES ({}) ---", self.duplicate_groups);
            for g in &self.duplicate_samples {
                let bbox = g
                    .bbox
                    .map(|b| format!("[{:.6}, {:.6}, {:.6}, {:.6}]", b[0], b[1], b[2], b[3]))
                    .unwrap_or_default();
                eprintln!("  #{} {} {}", g.group_id, g.members.join(", "), bbox);
            }
            if self.duplicate_groups > self.duplicate_samples.len() {
                eprintln!(
                    "  ... and {} more",
                    self.duplicate_groups - self.duplicate_samples.len()
                );
            }
        }

        let failures: Vec<_> = self.outcomes.iter().filter(|o| o.error.is_some()).collect();
        if !failures.is_empty() {
            eprintln!("\n--- ERRORS ({}) ---", failures.len());
            for o in failures.iter().take(20) {
                eprintln!(
                    "  [{},{}] {} {}",
                    o.row,
                    o.col,
                    o.error_kind.unwrap_or_default(),
                    o.error.as_deref().unwrap_or_default()
                );
            }
            if failures.len() > 20 {
                eprintln!("  ... and {} more", failures.len() - 20);
            }
        }

        eprintln!("\n{}", "=".repeat(60));
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{:?}: {} features ({} tiles, {} failed, {} duplicate groups)",
            self.status,
            self.features_final,
            self.tiles_processed,
            self.tiles_failed,
            self.duplicate_groups
        )
    }
}

/// Les `limit` premiers groupes : membres et emprise commune
fn duplicate_samples(features: &[ReconciledFeature], limit: usize) -> Vec<DuplicateGroupSample> {
    let mut samples: Vec<(DuplicateGroupSample, Option<Rect>)> = Vec::new();

    for f in features {
        let Some(id) = f.duplicate_group_id else {
            continue;
        };
        let rect = f.feature.geometry.bounding_rect();
        if let Some(pos) = samples.iter().position(|(s, _)| s.group_id == id) {
            let (sample, acc) = &mut samples[pos];
            sample.members.push(f.feature.identity_key.clone());
            *acc = merge_rect(*acc, rect);
        } else if samples.len() < limit {
            samples.push((
                DuplicateGroupSample {
                    group_id: id,
                    members: vec![f.feature.identity_key.clone()],
                    bbox: None,
                },
                rect,
            ));
        }
    }

    samples
        .into_iter()
        .map(|(mut sample, rect)| {
            sample.bbox = rect.map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]);
            sample
        })
        .collect()
}

fn merge_rect(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Rect::new(
            geo::Coord {
                x: a.min().x.min(b.min().x),
                y: a.min().y.min(b.min().y),
            },
            geo::Coord {
                x: a.max().x.max(b.max().x),
                y: a.max().y.max(b.max().y),
            },
        )),
        (a, None) => a,
        (None, b) => b,
    }
}
