//! Types d'erreurs de l'acquisition

use thiserror::Error;

/// Erreurs fatales : elles interrompent le run avant toute requête réseau
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Transformation de coordonnées impossible (CRS incompatibles ou échec de la bibliothèque)
    #[error("Coordinate transform EPSG:{from} -> EPSG:{to} failed: {reason}")]
    CoordinateTransform { from: u32, to: u32, reason: String },

    /// Emprise invalide (min > max, valeur non finie)
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// Zone d'intérêt inexploitable (géométrie vide, buffer en CRS géographique...)
    #[error("Invalid area of interest: {0}")]
    InvalidArea(String),

    /// Configuration invalide
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Area needs {tiles} tiles, more than the configured maximum of {max}")]
    TooManyTiles { tiles: usize, max: usize },
}

impl AcquisitionError {
    pub fn transform(from: u32, to: u32, reason: impl Into<String>) -> Self {
        Self::CoordinateTransform {
            from,
            to,
            reason: reason.into(),
        }
    }
}

/// Erreurs d'une tuile : enregistrées dans le rapport, jamais fatales
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Échec réseau (connexion, timeout, lecture du corps)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Statut HTTP hors 2xx
    #[error("HTTP status {0}")]
    Http(u16),

    /// Le service a répondu par un rapport d'exception
    #[error("Service rejected the request: {0}")]
    Rejected(String),

    /// Corps illisible (XML mal formé, encodage inconnu)
    #[error("Unreadable payload: {0}")]
    Payload(String),
}

impl FetchError {
    /// Catégorie affichée dans le rapport
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) | Self::Http(_) | Self::Payload(_) => "TileFetchError",
            Self::Rejected(_) => "TileResponseRejected",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Http(status.as_u16()),
            None => Self::Transport(e.to_string()),
        }
    }
}

impl From<wfs_gml::GmlError> for FetchError {
    fn from(e: wfs_gml::GmlError) -> Self {
        match e {
            wfs_gml::GmlError::ServiceException(message) => Self::Rejected(message),
            other => Self::Payload(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_kind() {
        assert_eq!(FetchError::Http(503).kind(), "TileFetchError");
        assert_eq!(FetchError::Rejected("x".into()).kind(), "TileResponseRejected");
    }

    #[test]
    fn test_gml_exception_is_rejection() {
        let err: FetchError = wfs_gml::GmlError::ServiceException("too many".into()).into();
        assert!(matches!(err, FetchError::Rejected(ref m) if m == "too many"));

        let err: FetchError = wfs_gml::GmlError::xml(12, "eof").into();
        assert!(matches!(err, FetchError::Payload(_)));
    }
}
