//! Types de données pour le crate wfs-gml

use geo::Geometry;

use crate::GmlError;

/// Ordre des axes des coordonnées GML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AxisOrder {
    /// Latitude puis longitude (CRS géographiques EPSG en URN, ex: EPSG:6706)
    #[default]
    LatLon,
    /// X puis Y (longitude/est puis latitude/nord)
    LonLat,
}

/// Options de parsing
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Ordre des axes dans les `posList`
    pub axis_order: AxisOrder,

    /// Propriété portant la géométrie principale (les autres sont ignorées)
    pub geometry_property: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            axis_order: AxisOrder::LatLon,
            geometry_property: "geometry".to_string(),
        }
    }
}

/// Une feature WFS avec ses attributs aplatis et sa géométrie
#[derive(Debug, Clone)]
pub struct Feature {
    /// Valeur de l'attribut `gml:id` si présent
    pub id: Option<String>,

    /// Nom qualifié du type de feature (ex: "CP:CadastralParcel")
    pub feature_type: String,

    /// Attributs dans l'ordre du document (nom -> valeur)
    pub properties: Vec<(String, String)>,

    /// Géométrie, toujours en x = longitude, y = latitude
    pub geometry: Geometry,
}

impl Feature {
    /// Cherche un attribut par nom, sans tenir compte de la casse
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Résultat du parsing d'une réponse GetFeature
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Features valides, dans l'ordre du document
    pub features: Vec<Feature>,

    /// Erreurs non fatales (features ignorées)
    pub errors: Vec<GmlError>,

    /// Attribut `numberMatched` de la collection (absent ou "unknown" → None)
    pub number_matched: Option<u64>,

    /// Attribut `numberReturned` de la collection
    pub number_returned: Option<u64>,
}

impl ParseResult {
    /// Vrai si le serveur a tronqué la réponse (limite de features atteinte)
    pub fn is_truncated(&self) -> bool {
        match (self.number_matched, self.number_returned) {
            (Some(matched), Some(returned)) => matched > returned,
            _ => false,
        }
    }
}
