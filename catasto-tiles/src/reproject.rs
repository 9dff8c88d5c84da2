//! Reprojection via PROJ (feature `reproject`)
//!
//! Couvre les CRS hors de portée de `reproject_lite` : Gauss-Boaga,
//! Cassini-Soldner catastali, datums locaux...

use geo::{Coord, Geometry, MapCoords};
use proj::Proj;

use crate::error::AcquisitionError;
use crate::types::Crs;

/// Transformation PROJ entre deux CRS EPSG
pub struct ProjTransform {
    proj: Proj,
    from: Crs,
    to: Crs,
}

impl ProjTransform {
    /// `new_known_crs` normalise l'ordre des axes : les CRS géographiques sont
    /// manipulés en (longitude, latitude), comme les géométries `geo`.
    pub fn new(from: Crs, to: Crs) -> Result<Self, AcquisitionError> {
        let proj = Proj::new_known_crs(&from.to_string(), &to.to_string(), None)
            .map_err(|e| AcquisitionError::transform(from.code(), to.code(), e.to_string()))?;
        Ok(Self { proj, from, to })
    }

    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry, AcquisitionError> {
        geom.try_map_coords(|c| {
            self.proj
                .convert((c.x, c.y))
                .map(|(x, y)| Coord { x, y })
        })
        .map_err(|e| AcquisitionError::transform(self.from.code(), self.to.code(), e.to_string()))
    }
}
