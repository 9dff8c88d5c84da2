//! Planification de la grille de tuiles
//!
//! L'aire est estimée par approximation équirectangulaire : l'étendue en
//! longitude est pondérée par cos(latitude moyenne), 1° de latitude ≈ 111 km.
//! Au-delà de `max_tile_area_km2`, la zone est découpée en une grille carrée
//! `side × side` avec `side = ceil(sqrt(ceil(aire / max)))`.

use std::time::Duration;

use serde::Serialize;

use crate::error::AcquisitionError;
use crate::types::{BoundingBox, TileSpec};

/// Kilomètres par degré de latitude
pub const KM_PER_DEGREE: f64 = 111.0;

/// Aire approchée d'une emprise géographique, en km²
pub fn estimate_area_km2(bbox: &BoundingBox) -> f64 {
    let mean_lat = (bbox.min_y() + bbox.max_y()) / 2.0;
    let width_km = bbox.width() * KM_PER_DEGREE * mean_lat.to_radians().cos();
    let height_km = bbox.height() * KM_PER_DEGREE;
    (width_km * height_km).abs()
}

/// Grille calculée pour une zone d'intérêt
#[derive(Debug, Clone, Serialize)]
pub struct TilePlan {
    /// Aire estimée de la zone (km²)
    pub area_km2: f64,
    /// Nombre de tuiles strictement nécessaire : ceil(aire / max)
    pub required: usize,
    pub rows: usize,
    pub cols: usize,
    /// Tuiles en ordre ligne par ligne (latitude croissante), puis colonne
    pub tiles: Vec<TileSpec>,
    /// Tuiles écartées par le préfiltre spatial
    pub skipped: usize,
}

impl TilePlan {
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Nombre de tuiles prévues avant préfiltrage
    pub fn planned(&self) -> usize {
        self.tiles.len() + self.skipped
    }

    /// Durée estimée du téléchargement : une pause par tuile restante
    pub fn estimated_duration(&self, pacing: Duration) -> Duration {
        pacing * self.tiles.len() as u32
    }
}

/// Planificateur de grille
#[derive(Debug, Clone, Copy)]
pub struct TileGridPlanner {
    max_tile_area_km2: f64,
    max_tiles: usize,
}

impl TileGridPlanner {
    pub fn new(max_tile_area_km2: f64) -> Result<Self, AcquisitionError> {
        if !max_tile_area_km2.is_finite() || max_tile_area_km2 <= 0.0 {
            return Err(AcquisitionError::Config(format!(
                "max tile area must be > 0, got {}",
                max_tile_area_km2
            )));
        }
        Ok(Self {
            max_tile_area_km2,
            max_tiles: usize::MAX,
        })
    }

    /// Refuse les grilles de plus de `max_tiles` tuiles
    pub fn with_max_tiles(mut self, max_tiles: usize) -> Self {
        self.max_tiles = max_tiles;
        self
    }

    pub fn max_tile_area_km2(&self) -> f64 {
        self.max_tile_area_km2
    }

    /// Calcule la grille couvrant exactement `bbox`.
    ///
    /// Le plafond est vérifié avant toute allocation de la grille.
    pub fn plan(&self, bbox: &BoundingBox) -> Result<TilePlan, AcquisitionError> {
        let area_km2 = estimate_area_km2(bbox);

        if area_km2 <= self.max_tile_area_km2 {
            return Ok(TilePlan {
                area_km2,
                required: 1,
                rows: 1,
                cols: 1,
                tiles: vec![TileSpec {
                    row: 0,
                    col: 0,
                    bbox: *bbox,
                }],
                skipped: 0,
            });
        }

        let required = (area_km2 / self.max_tile_area_km2).ceil();
        let side = required.sqrt().ceil();
        let count = side * side;
        if count > self.max_tiles as f64 {
            return Err(AcquisitionError::TooManyTiles {
                tiles: count.min(usize::MAX as f64) as usize,
                max: self.max_tiles,
            });
        }
        let required = required as usize;
        let side = side as usize;

        // bords partagés : deux tuiles voisines ont exactement la même frontière
        let lat_edges = edges(bbox.min_y(), bbox.max_y(), side);
        let lon_edges = edges(bbox.min_x(), bbox.max_x(), side);

        let mut tiles = Vec::with_capacity(side * side);
        for row in 0..side {
            for col in 0..side {
                // bords croissants : une erreur ici trahit un bug d'interpolation
                let tile_bbox = BoundingBox::new(
                    lon_edges[col],
                    lat_edges[row],
                    lon_edges[col + 1],
                    lat_edges[row + 1],
                    bbox.crs(),
                )?;
                tiles.push(TileSpec {
                    row,
                    col,
                    bbox: tile_bbox,
                });
            }
        }

        Ok(TilePlan {
            area_km2,
            required,
            rows: side,
            cols: side,
            tiles,
            skipped: 0,
        })
    }
}

/// `n + 1` bords par interpolation linéaire, extrémités exactes
fn edges(min: f64, max: f64, n: usize) -> Vec<f64> {
    let mut edges: Vec<f64> = (0..=n)
        .map(|i| min + (max - min) * i as f64 / n as f64)
        .collect();
    edges[0] = min;
    edges[n] = max;
    edges
}
