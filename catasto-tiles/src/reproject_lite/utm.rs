//! Projection UTM (Universal Transverse Mercator), sens inverse
//!
//! Zones utiles pour l'Italie : 32N, 33N, 34N, sur WGS84 (326xx), ETRS89 (258xx)
//! ou RDN2008 (7791-7793). Le calcul est valable pour toute zone.

use super::ellipsoid::Ellipsoid;
use super::Geographic;

/// Facteur d'échelle sur le méridien central
const K0: f64 = 0.9996;
/// False easting
const X0: f64 = 500000.0;
/// False northing de l'hémisphère sud
const Y0_SOUTH: f64 = 10000000.0;

/// Paramètres d'une zone UTM
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmZone {
    pub zone: u32,
    pub south: bool,
    pub ellipsoid: Ellipsoid,
}

impl UtmZone {
    /// Zone UTM correspondant à un code EPSG, si elle est connue
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        let (zone, south, ellipsoid) = match epsg {
            32601..=32660 => (epsg - 32600, false, Ellipsoid::WGS84),
            32701..=32760 => (epsg - 32700, true, Ellipsoid::WGS84),
            // ETRS89 / UTM 28N..38N
            25828..=25838 => (epsg - 25800, false, Ellipsoid::GRS80),
            // RDN2008 / UTM 32N..34N (N-E)
            7791..=7793 => (epsg - 7791 + 32, false, Ellipsoid::GRS80),
            // RDN2008 / UTM 32N..34N (E-N)
            6707..=6709 => (epsg - 6707 + 32, false, Ellipsoid::GRS80),
            _ => return None,
        };
        Some(Self {
            zone,
            south,
            ellipsoid,
        })
    }
}

/// Latitude du pied de la normale pour une distance méridienne `m`
fn footpoint_latitude(m: f64, a: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e4 * e2 / 256.0));

    let root = (1.0 - e2).sqrt();
    let n = (1.0 - root) / (1.0 + root);
    let (n2, n3) = (n * n, n * n * n);
    let n4 = n2 * n2;

    mu + (1.5 * n - 27.0 / 32.0 * n3) * (2.0 * mu).sin()
        + (21.0 / 16.0 * n2 - 55.0 / 32.0 * n4) * (4.0 * mu).sin()
        + 151.0 / 96.0 * n3 * (6.0 * mu).sin()
        + 1097.0 / 512.0 * n4 * (8.0 * mu).sin()
}

/// Convertit UTM vers coordonnées géographiques
pub fn utm_to_geographic(x: f64, y: f64, zone: &UtmZone) -> Geographic {
    let ell = zone.ellipsoid;
    let (a, e2, ep2) = (ell.a, ell.e2(), ell.ep2());

    let northing = if zone.south { y - Y0_SOUTH } else { y };
    let easting = x - X0;
    let central = (zone.zone as f64 * 6.0 - 183.0).to_radians();

    let phi = footpoint_latitude(northing / K0, a, e2);
    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = sin_phi / cos_phi;

    let w = 1.0 - e2 * sin_phi * sin_phi;
    // Rayons de courbure : grande normale et méridien
    let nu = a / w.sqrt();
    let rho = a * (1.0 - e2) / (w * w.sqrt());

    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let d = easting / (nu * K0);
    let d2 = d * d;

    let lat_series = d2 / 2.0
        * (1.0 - d2 / 12.0 * (5.0 + 3.0 * t + 10.0 * c - 4.0 * c * c - 9.0 * ep2)
            + d2 * d2 / 360.0
                * (61.0 + 90.0 * t + 298.0 * c + 45.0 * t * t - 252.0 * ep2 - 3.0 * c * c));
    let lon_series = d
        * (1.0 - d2 / 6.0 * (1.0 + 2.0 * t + c)
            + d2 * d2 / 120.0
                * (5.0 - 2.0 * c + 28.0 * t - 3.0 * c * c + 8.0 * ep2 + 24.0 * t * t));

    Geographic::new(central + lon_series / cos_phi, phi - nu * tan_phi / rho * lat_series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_from_epsg() {
        let z = UtmZone::from_epsg(32633).unwrap();
        assert_eq!((z.zone, z.south), (33, false));
        assert_eq!(z.ellipsoid, Ellipsoid::WGS84);

        assert_eq!(UtmZone::from_epsg(7792).unwrap().zone, 33);
        assert_eq!(UtmZone::from_epsg(6707).unwrap().zone, 32);
        assert_eq!(UtmZone::from_epsg(25832).unwrap().ellipsoid, Ellipsoid::GRS80);
        assert!(UtmZone::from_epsg(32740).unwrap().south);
        assert!(UtmZone::from_epsg(2154).is_none());
    }

    #[test]
    fn test_roma() {
        // Colosseo, UTM 33N: 291946, 4640627
        let zone = UtmZone::from_epsg(32633).unwrap();
        let (lon, lat) = utm_to_geographic(291946.0, 4640627.0, &zone).to_degrees();

        // 12.4922°E, 41.8902°N
        assert!((lon - 12.4922).abs() < 0.001, "lon={}", lon);
        assert!((lat - 41.8902).abs() < 0.001, "lat={}", lat);
    }

    #[test]
    fn test_milano() {
        // Duomo, ETRS89 / UTM 32N: 514853, 5034537
        let zone = UtmZone::from_epsg(25832).unwrap();
        let (lon, lat) = utm_to_geographic(514853.0, 5034537.0, &zone).to_degrees();

        // 9.1900°E, 45.4642°N
        assert!((lon - 9.19).abs() < 0.001, "lon={}", lon);
        assert!((lat - 45.4642).abs() < 0.001, "lat={}", lat);
    }
}
