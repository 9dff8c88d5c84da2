//! Projection Web Mercator (EPSG:3857)
//!
//! Aussi connu sous le nom de Pseudo-Mercator ou Spherical Mercator.
//! Seul le sens inverse est nécessaire : les fonds de carte en 3857 servent à
//! dessiner des zones qui sont ensuite ramenées en géographique.

use super::ellipsoid::Ellipsoid;
use super::Geographic;

/// Convertit Web Mercator vers coordonnées géographiques (sphère de rayon `a`)
pub fn web_mercator_to_geographic(x: f64, y: f64) -> Geographic {
    let radius = Ellipsoid::WGS84.a;
    // Fonction de Gudermann
    let lat = (y / radius).sinh().atan();
    Geographic::new(x / radius, lat)
}
