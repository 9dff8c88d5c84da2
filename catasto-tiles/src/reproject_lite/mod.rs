//! Reprojection légère en Rust pur (sans dépendances externes)
//!
//! Supporte les CRS courants pour dessiner une zone d'intérêt en Italie :
//! - Web Mercator (EPSG:3857)
//! - UTM WGS84 (EPSG:326xx / 327xx)
//! - UTM ETRS89 (EPSG:25828 à 25838)
//! - UTM RDN2008 (EPSG:7791-7793, 6707-6709)
//!
//! Cibles supportées : les CRS géographiques WGS84 (4326), ETRS89 (4258) et
//! RDN2008 (6706), considérés équivalents (écart sub-métrique).

mod ellipsoid;
mod mercator;
mod smart;
mod utm;

pub use smart::SmartReprojector;

use anyhow::{bail, Result};
use geo::{Coord, Geometry, MapCoords};

pub use ellipsoid::Ellipsoid;
use utm::UtmZone;

/// CRS géographiques traités comme un même datum
const EQUIVALENT_GEOGRAPHIC: &[u32] = &[4326, 4258, 6706];

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }
}

/// Projection source prise en charge
#[derive(Debug, Clone, Copy)]
enum Source {
    Geographic,
    WebMercator,
    Utm(UtmZone),
}

/// Reprojection légère vers un CRS géographique
pub struct ReprojectorLite {
    source: Source,
}

impl ReprojectorLite {
    /// Crée un nouveau reprojector
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if !Self::is_supported_target(target_epsg) {
            bail!(
                "EPSG:{} non supporté. Cibles supportées: 4326, 4258, 6706",
                target_epsg
            );
        }
        let Some(source) = Self::source_of(source_epsg) else {
            bail!(
                "EPSG:{} non supporté. Sources supportées: 4326, 4258, 6706, 3857, \
                 326xx/327xx, 25828-25838, 7791-7793, 6707-6709",
                source_epsg
            );
        };
        Ok(Self { source })
    }

    fn source_of(epsg: u32) -> Option<Source> {
        if EQUIVALENT_GEOGRAPHIC.contains(&epsg) {
            return Some(Source::Geographic);
        }
        if epsg == 3857 {
            return Some(Source::WebMercator);
        }
        UtmZone::from_epsg(epsg).map(Source::Utm)
    }

    /// Vérifie si l'EPSG cible est supporté
    pub fn is_supported_target(epsg: u32) -> bool {
        EQUIVALENT_GEOGRAPHIC.contains(&epsg)
    }

    /// Vérifie si la reprojection est supportée
    pub fn is_supported(source: u32, target: u32) -> bool {
        Self::source_of(source).is_some() && Self::is_supported_target(target)
    }

    /// Transforme un point (x, y) de la source en (longitude, latitude) en degrés
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        match &self.source {
            Source::Geographic => (x, y),
            Source::WebMercator => mercator::web_mercator_to_geographic(x, y).to_degrees(),
            Source::Utm(zone) => utm::utm_to_geographic(x, y, zone).to_degrees(),
        }
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Geometry {
        geom.map_coords(|c| {
            let (x, y) = self.transform_point(c.x, c.y);
            Coord { x, y }
        })
    }
}
