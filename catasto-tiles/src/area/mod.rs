//! Normalisation des zones d'intérêt
//!
//! Toute zone (rectangle, polygone, buffer de ligne) est ramenée à une emprise
//! dans le CRS du service, accompagnée si besoin d'une géométrie de filtrage
//! précise dans ce même CRS.

pub mod buffer;

use geo::{BooleanOps, Coord, Geometry, LineString, MultiLineString, MultiPolygon};
use tracing::debug;

use crate::error::AcquisitionError;
use crate::reproject_lite::SmartReprojector;
use crate::types::{AreaOfInterest, BoundingBox, Crs, FilterGeometry};

/// Points par côté lors de la reprojection d'une emprise rectangulaire
const DENSIFY_PER_EDGE: usize = 16;

/// Nature d'une géométrie, résolue une fois à l'entrée des données
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    /// `None` pour une collection hétérogène
    pub fn of(geom: &Geometry) -> Option<Self> {
        match geom {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(Self::Point),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                Some(Self::Line)
            }
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => Some(Self::Polygon),
            Geometry::GeometryCollection(_) => None,
        }
    }
}

/// Description d'une zone d'intérêt dans un CRS source quelconque
#[derive(Debug, Clone)]
pub enum AreaRequest {
    /// Deux coins opposés (ordre indifférent)
    Rectangle { a: Coord, b: Coord, crs: Crs },
    /// Polygone : son emprise sert aux requêtes, le polygone au filtrage
    Polygon { shape: MultiPolygon, crs: Crs },
    /// Ligne(s) en CRS métrique, bufferisée(s) de `distance_m`
    LineBuffer {
        lines: MultiLineString,
        crs: Crs,
        distance_m: f64,
    },
}

impl AreaRequest {
    /// Construit la requête adaptée à la nature de la géométrie
    pub fn from_geometry(
        geom: Geometry,
        crs: Crs,
        buffer_m: f64,
    ) -> Result<Self, AcquisitionError> {
        match geom {
            Geometry::Polygon(p) => Ok(Self::Polygon {
                shape: MultiPolygon::new(vec![p]),
                crs,
            }),
            Geometry::MultiPolygon(shape) => Ok(Self::Polygon { shape, crs }),
            Geometry::Rect(r) => Ok(Self::Polygon {
                shape: MultiPolygon::new(vec![r.to_polygon()]),
                crs,
            }),
            Geometry::Triangle(t) => Ok(Self::Polygon {
                shape: MultiPolygon::new(vec![t.to_polygon()]),
                crs,
            }),
            Geometry::Line(l) => Ok(Self::line_buffer(vec![LineString::from(l)], crs, buffer_m)),
            Geometry::LineString(ls) => Ok(Self::line_buffer(vec![ls], crs, buffer_m)),
            Geometry::MultiLineString(mls) => Ok(Self::line_buffer(mls.0, crs, buffer_m)),
            Geometry::Point(_) | Geometry::MultiPoint(_) => Err(AcquisitionError::InvalidArea(
                "a point does not delimit an area".to_string(),
            )),
            Geometry::GeometryCollection(_) => Err(AcquisitionError::InvalidArea(
                "geometry collections are not supported".to_string(),
            )),
        }
    }

    fn line_buffer(lines: Vec<LineString>, crs: Crs, distance_m: f64) -> Self {
        Self::LineBuffer {
            lines: MultiLineString::new(lines),
            crs,
            distance_m,
        }
    }

    pub fn crs(&self) -> Crs {
        match self {
            Self::Rectangle { crs, .. } | Self::Polygon { crs, .. } | Self::LineBuffer { crs, .. } => {
                *crs
            }
        }
    }
}

/// Convertit une zone d'intérêt vers le CRS du service
#[derive(Debug, Clone, Copy)]
pub struct AreaNormalizer {
    service_crs: Crs,
}

impl AreaNormalizer {
    pub fn new(service_crs: Crs) -> Self {
        Self { service_crs }
    }

    pub fn service_crs(&self) -> Crs {
        self.service_crs
    }

    /// Emprise (et filtre éventuel) dans le CRS du service
    ///
    /// # Errors
    ///
    /// `CoordinateTransform` si la transformation est impossible,
    /// `InvalidArea` pour un buffer demandé en CRS géographique ou une géométrie vide.
    pub fn normalize(&self, request: &AreaRequest) -> Result<AreaOfInterest, AcquisitionError> {
        match request {
            AreaRequest::Rectangle { a, b, crs } => {
                let source = BoundingBox::from_corners(*a, *b, *crs)?;
                if *crs == self.service_crs {
                    return Ok(AreaOfInterest {
                        bbox: source,
                        filter: None,
                    });
                }
                let ring = Geometry::Polygon(source.densified_ring(DENSIFY_PER_EDGE));
                let projected = self.transform(&ring, *crs)?;
                Ok(AreaOfInterest {
                    bbox: BoundingBox::of_geometry(&projected, self.service_crs)?,
                    filter: None,
                })
            }
            AreaRequest::Polygon { shape, crs } => {
                if shape.0.is_empty() {
                    return Err(AcquisitionError::InvalidArea("empty polygon".to_string()));
                }
                self.with_filter(Geometry::MultiPolygon(shape.clone()), *crs)
            }
            AreaRequest::LineBuffer {
                lines,
                crs,
                distance_m,
            } => {
                if crs.is_geographic() {
                    return Err(AcquisitionError::InvalidArea(format!(
                        "line buffer needs a projected CRS in metres, got {}",
                        crs
                    )));
                }
                let mut shape = MultiPolygon::new(Vec::new());
                for line in lines {
                    let piece = buffer::buffer_line(line, *distance_m).ok_or_else(|| {
                        AcquisitionError::InvalidArea(format!(
                            "cannot buffer line by {} m",
                            distance_m
                        ))
                    })?;
                    shape = shape.union(&piece);
                }
                if shape.0.is_empty() {
                    return Err(AcquisitionError::InvalidArea("empty line".to_string()));
                }
                debug!(distance_m, polygons = shape.0.len(), "Buffer calculé");
                self.with_filter(Geometry::MultiPolygon(shape), *crs)
            }
        }
    }

    fn with_filter(&self, shape: Geometry, crs: Crs) -> Result<AreaOfInterest, AcquisitionError> {
        let projected = self.transform(&shape, crs)?;
        let bbox = BoundingBox::of_geometry(&projected, self.service_crs)?;
        let filter = match projected {
            Geometry::MultiPolygon(mp) => FilterGeometry::new(mp),
            Geometry::Polygon(p) => FilterGeometry::from(p),
            other => {
                return Err(AcquisitionError::InvalidArea(format!(
                    "filter is not polygonal: {:?}",
                    GeometryKind::of(&other)
                )))
            }
        };
        Ok(AreaOfInterest {
            bbox,
            filter: Some(filter),
        })
    }

    /// Transformation vers le CRS du service ; identité si les CRS sont égaux
    pub fn transform(&self, geom: &Geometry, from: Crs) -> Result<Geometry, AcquisitionError> {
        let reprojector = SmartReprojector::new(from, self.service_crs)?;
        debug!(from = %from, to = %self.service_crs, via = reprojector.description(), "Reprojection");
        reprojector.transform_geometry(geom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, Contains, Point};

    #[test]
    fn test_geometry_kind() {
        assert_eq!(
            GeometryKind::of(&Geometry::Point(point!(x: 1.0, y: 2.0))),
            Some(GeometryKind::Point)
        );
        assert_eq!(
            GeometryKind::of(&Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)])),
            Some(GeometryKind::Line)
        );
        assert_eq!(
            GeometryKind::of(&Geometry::GeometryCollection(Default::default())),
            None
        );
    }

    #[test]
    fn test_rectangle_same_crs_passes_through() {
        let normalizer = AreaNormalizer::new(Crs::RDN2008);
        let aoi = normalizer
            .normalize(&AreaRequest::Rectangle {
                a: Coord { x: 12.51, y: 41.91 },
                b: Coord { x: 12.49, y: 41.89 },
                crs: Crs::RDN2008,
            })
            .unwrap();
        assert_eq!(aoi.bbox.min_x(), 12.49);
        assert_eq!(aoi.bbox.max_y(), 41.91);
        assert_eq!(aoi.bbox.crs(), Crs::RDN2008);
        assert!(aoi.filter.is_none());
    }

    #[test]
    fn test_rectangle_from_utm() {
        let normalizer = AreaNormalizer::new(Crs::RDN2008);
        let aoi = normalizer
            .normalize(&AreaRequest::Rectangle {
                a: Coord { x: 291000.0, y: 4640000.0 },
                b: Coord { x: 293000.0, y: 4642000.0 },
                crs: Crs::epsg(32633),
            })
            .unwrap();
        assert!(aoi.bbox.min_x() > 12.4 && aoi.bbox.max_x() < 12.6);
        assert!(aoi.bbox.min_y() > 41.8 && aoi.bbox.max_y() < 42.0);
    }

    #[test]
    fn test_polygon_becomes_filter() {
        let normalizer = AreaNormalizer::new(Crs::RDN2008);
        let triangle = polygon![(x: 12.0, y: 41.0), (x: 12.2, y: 41.0), (x: 12.0, y: 41.2), (x: 12.0, y: 41.0)];
        let request =
            AreaRequest::from_geometry(Geometry::Polygon(triangle), Crs::WGS84, 50.0).unwrap();
        let aoi = normalizer.normalize(&request).unwrap();

        assert!((aoi.bbox.max_x() - 12.2).abs() < 1e-12);
        let filter = aoi.filter.unwrap();
        assert!(filter.intersects(&Geometry::Point(Point::new(12.05, 41.05))));
        assert!(!filter.intersects(&Geometry::Point(Point::new(12.19, 41.19))));
    }

    #[test]
    fn test_line_buffer_in_projected_crs() {
        let normalizer = AreaNormalizer::new(Crs::RDN2008);
        // Sur le méridien central : pas de convergence des méridiens
        let line = line_string![(x: 499500.0, y: 4640000.0), (x: 500500.0, y: 4640000.0)];
        let request =
            AreaRequest::from_geometry(Geometry::LineString(line), Crs::epsg(32633), 50.0)
                .unwrap();
        let aoi = normalizer.normalize(&request).unwrap();

        let filter = aoi.filter.unwrap();
        match filter.geometry() {
            Geometry::MultiPolygon(mp) => assert!(!mp.0.is_empty()),
            other => panic!("expected multipolygon, got {:?}", other),
        }
        // 100 m de large ≈ 0.0009° de latitude
        let height = aoi.bbox.height();
        assert!(height > 0.0008 && height < 0.001, "height={}", height);
    }

    #[test]
    fn test_line_buffer_rejects_geographic_crs() {
        let normalizer = AreaNormalizer::new(Crs::RDN2008);
        let line = line_string![(x: 12.0, y: 41.0), (x: 12.1, y: 41.0)];
        let request =
            AreaRequest::from_geometry(Geometry::LineString(line), Crs::WGS84, 50.0).unwrap();
        assert!(matches!(
            normalizer.normalize(&request),
            Err(AcquisitionError::InvalidArea(_))
        ));
    }

    #[test]
    fn test_point_is_not_an_area() {
        assert!(AreaRequest::from_geometry(
            Geometry::Point(point!(x: 1.0, y: 1.0)),
            Crs::WGS84,
            50.0
        )
        .is_err());
    }

    #[cfg(not(feature = "reproject"))]
    #[test]
    fn test_unknown_crs_is_a_transform_error() {
        let normalizer = AreaNormalizer::new(Crs::RDN2008);
        let err = normalizer
            .normalize(&AreaRequest::Rectangle {
                a: Coord { x: 0.0, y: 0.0 },
                b: Coord { x: 1.0, y: 1.0 },
                crs: Crs::epsg(2154),
            })
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::CoordinateTransform { from: 2154, .. }));
    }

    #[test]
    fn test_filter_contains_buffer_axis() {
        let normalizer = AreaNormalizer::new(Crs::WGS84);
        let line = line_string![(x: 291000.0, y: 4640000.0), (x: 292000.0, y: 4640000.0)];
        let aoi = normalizer
            .normalize(&AreaRequest::LineBuffer {
                lines: MultiLineString::new(vec![line]),
                crs: Crs::epsg(32633),
                distance_m: 50.0,
            })
            .unwrap();
        let filter = aoi.filter.unwrap();
        let mid = normalizer
            .transform(&Geometry::Point(Point::new(291500.0, 4640000.0)), Crs::epsg(32633))
            .unwrap();
        match (filter.geometry(), mid) {
            (Geometry::MultiPolygon(mp), Geometry::Point(p)) => assert!(mp.contains(&p)),
            other => panic!("unexpected {:?}", other),
        }
    }
}
