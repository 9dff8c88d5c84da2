//! Choix du moteur de reprojection pour un couple de CRS
//!
//! Résolu une seule fois : identité, Rust pur si possible, PROJ sinon.

use geo::Geometry;

use super::ReprojectorLite;
use crate::error::AcquisitionError;
use crate::types::Crs;

/// Moteur retenu
pub enum SmartReprojector {
    /// Source et cible identiques
    Identity,
    Lite(ReprojectorLite),
    #[cfg(feature = "reproject")]
    Proj(crate::reproject::ProjTransform),
}

impl SmartReprojector {
    pub fn new(from: Crs, to: Crs) -> Result<Self, AcquisitionError> {
        if from == to {
            return Ok(Self::Identity);
        }
        if ReprojectorLite::is_supported(from.code(), to.code()) {
            return ReprojectorLite::new(from.code(), to.code())
                .map(Self::Lite)
                .map_err(|e| AcquisitionError::transform(from.code(), to.code(), format!("{:#}", e)));
        }
        Self::fallback(from, to)
    }

    #[cfg(feature = "reproject")]
    fn fallback(from: Crs, to: Crs) -> Result<Self, AcquisitionError> {
        crate::reproject::ProjTransform::new(from, to).map(Self::Proj)
    }

    #[cfg(not(feature = "reproject"))]
    fn fallback(from: Crs, to: Crs) -> Result<Self, AcquisitionError> {
        Err(AcquisitionError::transform(
            from.code(),
            to.code(),
            "outside reproject_lite (sources 3857, 326xx/327xx, 258xx, 7791-7793; \
             targets 4326, 4258, 6706), build with the `reproject` feature",
        ))
    }

    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry, AcquisitionError> {
        match self {
            Self::Identity => Ok(geom.clone()),
            Self::Lite(lite) => Ok(lite.transform_geometry(geom)),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.transform_geometry(geom),
        }
    }

    /// Nom du moteur, pour les logs
    pub fn description(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Lite(_) => "lite",
            #[cfg(feature = "reproject")]
            Self::Proj(_) => "proj",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_crs_is_identity() {
        let r = SmartReprojector::new(Crs::RDN2008, Crs::RDN2008).unwrap();
        assert_eq!(r.description(), "identity");
    }

    #[test]
    fn test_lite_for_utm_and_mercator() {
        let utm = SmartReprojector::new(Crs::epsg(7792), Crs::RDN2008).unwrap();
        assert!(matches!(utm, SmartReprojector::Lite(_)));
        let mercator = SmartReprojector::new(Crs::epsg(3857), Crs::RDN2008).unwrap();
        assert_eq!(mercator.description(), "lite");
    }

    #[test]
    fn test_unknown_crs_fails() {
        assert!(SmartReprojector::new(Crs::epsg(99_999), Crs::RDN2008).is_err());
    }
}
