//! Types d'erreurs pour le crate wfs-gml

use thiserror::Error;

/// Erreurs pouvant survenir lors du parsing d'une réponse WFS
#[derive(Debug, Clone, Error)]
pub enum GmlError {
    /// Document XML mal formé
    #[error("XML error at byte {position}: {reason}")]
    Xml { position: usize, reason: String },

    /// Encodage non supporté ou contenu non décodable
    #[error("Unsupported encoding: {0}")]
    Encoding(String),

    /// Le serveur a renvoyé un rapport d'exception au lieu de features
    #[error("Service exception: {0}")]
    ServiceException(String),

    /// Élément racine inattendu (ni FeatureCollection, ni rapport d'exception)
    #[error("Unexpected root element: {0}")]
    UnexpectedRoot(String),

    /// Géométrie invalide pour une feature (la feature est ignorée)
    #[error("Invalid geometry for {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },
}

impl GmlError {
    /// Crée une erreur XML avec sa position dans le flux
    pub fn xml(position: usize, reason: impl Into<String>) -> Self {
        Self::Xml {
            position,
            reason: reason.into(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(feature_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            feature_id: feature_id.into(),
            reason: reason.into(),
        }
    }

    /// Vrai si l'erreur ne concerne qu'une feature isolée
    pub fn is_feature_level(&self) -> bool {
        matches!(self, Self::InvalidGeometry { .. })
    }
}
