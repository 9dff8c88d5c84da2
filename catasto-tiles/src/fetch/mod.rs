//! Téléchargement des tuiles
//!
//! - `client` : client HTTP du service WFS
//! - `paced` : boucle séquentielle avec pause et annulation
//! - `cancel` : signal d'annulation partagé

pub mod cancel;
pub mod client;
pub mod paced;

pub use cancel::CancelSignal;
pub use client::WfsClient;
pub use paced::{FetchRun, PacedFetcher};

use async_trait::async_trait;

use crate::error::FetchError;
use crate::reconcile::identity::identity_key;
use crate::types::{Attributes, BoundingBox, RawFeature};

/// Contenu d'une tuile, prêt pour la réconciliation
#[derive(Debug, Default)]
pub struct TilePayload {
    pub features: Vec<RawFeature>,
    /// Features ignorées pour géométrie invalide
    pub geometry_errors: usize,
    /// Le serveur a atteint sa limite de features
    pub truncated: bool,
}

impl TilePayload {
    /// Convertit une réponse GML parsée ; la clé d'identité est calculée ici
    pub fn from_gml(result: wfs_gml::ParseResult, identity_fields: &[String]) -> Self {
        let truncated = result.is_truncated();
        let geometry_errors = result
            .errors
            .iter()
            .filter(|e| e.is_feature_level())
            .count();

        let features = result
            .features
            .into_iter()
            .map(|feature| {
                let attributes = Attributes::from(feature.properties);
                let identity_key = identity_key(&attributes, &feature.geometry, identity_fields);
                RawFeature {
                    identity_key,
                    attributes,
                    geometry: feature.geometry,
                }
            })
            .collect();

        Self {
            features,
            geometry_errors,
            truncated,
        }
    }
}

/// Source de features pour une emprise (le service WFS, ou un double en test)
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch(&self, bbox: &BoundingBox) -> Result<TilePayload, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};
    use wfs_gml::{Feature, ParseResult};

    fn feature(id: Option<&str>) -> Feature {
        let mut properties = vec![("label".to_string(), "45".to_string())];
        if let Some(id) = id {
            properties.insert(0, ("gml_id".to_string(), id.to_string()));
        }
        Feature {
            id: id.map(str::to_string),
            feature_type: "CP:CadastralParcel".to_string(),
            properties,
            geometry: Geometry::Polygon(polygon![
                (x: 12.0, y: 41.0), (x: 12.001, y: 41.0), (x: 12.0, y: 41.001), (x: 12.0, y: 41.0)
            ]),
        }
    }

    #[test]
    fn test_from_gml_identity() {
        let result = ParseResult {
            features: vec![feature(Some("IT.AGE.PLA.1")), feature(None)],
            errors: vec![wfs_gml::GmlError::invalid_geometry("IT.AGE.PLA.2", "open ring")],
            number_matched: Some(3),
            number_returned: Some(3),
        };
        let fields = vec!["gml_id".to_string()];
        let payload = TilePayload::from_gml(result, &fields);

        assert_eq!(payload.features.len(), 2);
        assert_eq!(payload.features[0].identity_key, "IT.AGE.PLA.1");
        assert!(payload.features[1].identity_key.starts_with("content:"));
        assert_eq!(payload.geometry_errors, 1);
        assert!(!payload.truncated);
    }
}
