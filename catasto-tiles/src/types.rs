//! Types de données de l'acquisition

use std::fmt;
use std::str::FromStr;

use geo::{BoundingRect, Coord, Geometry, Intersects, MultiPolygon, Polygon, Rect};
use geozero::ToWkt;
use serde::{Deserialize, Serialize};

use crate::error::AcquisitionError;

/// CRS géographiques connus (degrés) ; tout autre code est considéré projeté
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4258, 4265, 4230, 4806, 4171, 4269, 6706];

/// Système de coordonnées identifié par son code EPSG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(u32);

impl Crs {
    /// WGS84 géographique
    pub const WGS84: Crs = Crs(4326);
    /// RDN2008 géographique, CRS du WFS cadastral
    pub const RDN2008: Crs = Crs(6706);

    pub const fn epsg(code: u32) -> Self {
        Self(code)
    }

    pub fn code(&self) -> u32 {
        self.0
    }

    /// Vrai pour un CRS en degrés
    pub fn is_geographic(&self) -> bool {
        GEOGRAPHIC_EPSG.contains(&self.0)
    }

    /// Forme URN utilisée dans les requêtes WFS et le GeoJSON
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.0)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = AcquisitionError;

    /// Accepte `EPSG:6706`, `6706` ou `urn:ogc:def:crs:EPSG::6706`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let code = s
            .rsplit(':')
            .next()
            .filter(|_| s.to_ascii_uppercase().contains("EPSG") || !s.contains(':'))
            .and_then(|c| c.parse::<u32>().ok())
            .filter(|c| *c > 0)
            .ok_or_else(|| AcquisitionError::Config(format!("Unknown CRS: {}", s)))?;
        Ok(Self(code))
    }
}

impl TryFrom<String> for Crs {
    type Error = AcquisitionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// Emprise rectangulaire dans un CRS déclaré, immuable (min <= max sur chaque axe)
///
/// En CRS géographique, x = longitude et y = latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    crs: Crs,
}

impl BoundingBox {
    pub fn new(
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        crs: Crs,
    ) -> Result<Self, AcquisitionError> {
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(AcquisitionError::InvalidBoundingBox(
                "non-finite coordinate".to_string(),
            ));
        }
        if min_x > max_x || min_y > max_y {
            return Err(AcquisitionError::InvalidBoundingBox(format!(
                "min > max in ({}, {}, {}, {})",
                min_x, min_y, max_x, max_y
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
            crs,
        })
    }

    /// Emprise de deux coins quelconques (ordre indifférent)
    pub fn from_corners(a: Coord, b: Coord, crs: Crs) -> Result<Self, AcquisitionError> {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y), crs)
    }

    /// Emprise d'une géométrie
    pub fn of_geometry(geom: &Geometry, crs: Crs) -> Result<Self, AcquisitionError> {
        let rect = geom
            .bounding_rect()
            .ok_or_else(|| AcquisitionError::InvalidArea("empty geometry".to_string()))?;
        Self::from_corners(rect.min(), rect.max(), crs)
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }

    /// Contour densifié (`per_edge` points par côté) pour la reprojection
    pub fn densified_ring(&self, per_edge: usize) -> Polygon {
        let n = per_edge.max(1);
        let corners = [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ];
        let mut coords = Vec::with_capacity(4 * n + 1);
        for i in 0..4 {
            let (x0, y0) = corners[i];
            let (x1, y1) = corners[(i + 1) % 4];
            for k in 0..n {
                let t = k as f64 / n as f64;
                coords.push(Coord {
                    x: x0 + (x1 - x0) * t,
                    y: y0 + (y1 - y0) * t,
                });
            }
        }
        coords.push(coords[0]);
        Polygon::new(coords.into(), vec![])
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}] {}",
            self.min_x, self.min_y, self.max_x, self.max_y, self.crs
        )
    }
}

/// Géométrie de filtrage précise (polygone, buffer de ligne), dans le CRS du service
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGeometry(Geometry);

impl FilterGeometry {
    pub fn new(shape: MultiPolygon) -> Self {
        Self(Geometry::MultiPolygon(shape))
    }

    pub fn geometry(&self) -> &Geometry {
        &self.0
    }

    pub fn intersects(&self, other: &Geometry) -> bool {
        self.0.intersects(other)
    }

    pub fn intersects_rect(&self, rect: Rect) -> bool {
        self.0.intersects(&Geometry::Polygon(rect.to_polygon()))
    }
}

impl From<Polygon> for FilterGeometry {
    fn from(p: Polygon) -> Self {
        Self::new(MultiPolygon::new(vec![p]))
    }
}

/// Zone d'intérêt normalisée dans le CRS du service
///
/// Le filtre ne remplace jamais l'emprise utilisée pour les requêtes.
#[derive(Debug, Clone)]
pub struct AreaOfInterest {
    pub bbox: BoundingBox,
    pub filter: Option<FilterGeometry>,
}

/// Une tuile de la grille ; identité `(row, col)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileSpec {
    pub row: usize,
    pub col: usize,
    pub bbox: BoundingBox,
}

/// Attributs ordonnés (ordre du document source)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valeur d'un attribut, sans tenir compte de la casse
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Remplace la valeur si l'attribut existe, sinon l'ajoute en fin
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(String, String)>> for Attributes {
    fn from(v: Vec<(String, String)>) -> Self {
        Self(v)
    }
}

/// Feature brute issue d'une tuile
#[derive(Debug, Clone)]
pub struct RawFeature {
    pub identity_key: String,
    pub attributes: Attributes,
    /// x = longitude, y = latitude
    pub geometry: Geometry,
}

impl RawFeature {
    /// WKT de la géométrie (précision complète)
    pub fn geometry_wkt(&self) -> String {
        self.geometry.to_wkt().unwrap_or_default()
    }
}

/// Feature réconciliée, remise au sink
#[derive(Debug, Clone)]
pub struct ReconciledFeature {
    pub feature: RawFeature,
    pub is_duplicate_geometry: bool,
    pub duplicate_group_id: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};

    #[test]
    fn test_crs_parsing() {
        assert_eq!("EPSG:6706".parse::<Crs>().unwrap(), Crs::RDN2008);
        assert_eq!("4326".parse::<Crs>().unwrap(), Crs::WGS84);
        assert_eq!(
            "urn:ogc:def:crs:EPSG::32633".parse::<Crs>().unwrap(),
            Crs::epsg(32633)
        );
        assert!("foo:bar".parse::<Crs>().is_err());
        assert!("EPSG:abc".parse::<Crs>().is_err());
    }

    #[test]
    fn test_crs_kind() {
        assert!(Crs::RDN2008.is_geographic());
        assert!(!Crs::epsg(32633).is_geographic());
        assert_eq!(Crs::RDN2008.urn(), "urn:ogc:def:crs:EPSG::6706");
    }

    #[test]
    fn test_bbox_invariants() {
        assert!(BoundingBox::new(1.0, 0.0, 0.0, 1.0, Crs::WGS84).is_err());
        assert!(BoundingBox::new(0.0, 0.0, f64::NAN, 1.0, Crs::WGS84).is_err());

        let b = BoundingBox::from_corners(
            Coord { x: 12.6, y: 41.8 },
            Coord { x: 12.4, y: 42.0 },
            Crs::RDN2008,
        )
        .unwrap();
        assert_eq!(b.min_x(), 12.4);
        assert_eq!(b.max_y(), 42.0);
    }

    #[test]
    fn test_densified_ring() {
        let b = BoundingBox::new(0.0, 0.0, 4.0, 2.0, Crs::WGS84).unwrap();
        let ring = b.densified_ring(4);
        assert_eq!(ring.exterior().0.len(), 17);
        assert_eq!(ring.exterior().0.first(), ring.exterior().0.last());
    }

    #[test]
    fn test_filter_intersects_rect() {
        let filter = FilterGeometry::from(polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)
        ]);
        let inside = BoundingBox::new(0.5, 0.5, 2.0, 2.0, Crs::WGS84).unwrap();
        let outside = BoundingBox::new(1.5, 1.5, 2.0, 2.0, Crs::WGS84).unwrap();
        assert!(filter.intersects_rect(inside.to_rect()));
        assert!(!filter.intersects_rect(outside.to_rect()));
        assert!(filter.intersects(&Geometry::Point(Point::new(0.5, 0.5))));
    }

    #[test]
    fn test_attributes_are_ordered() {
        let mut attrs = Attributes::new();
        attrs.set("b", "1");
        attrs.set("a", "2");
        attrs.set("b", "3");
        let keys: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(attrs.get("B"), Some("3"));
    }
}
