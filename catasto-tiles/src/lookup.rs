//! Interrogation ponctuelle d'une particelle
//!
//! Un point, une petite emprise autour de lui, et la première parcelle qui
//! le contient (à défaut, la première renvoyée). Le résultat est un tuple
//! ordonné de champs texte ; `N/D` quand rien n'est trouvé.

use std::sync::OnceLock;

use geo::{Coord, Geometry, Intersects, Point};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::area::AreaNormalizer;
use crate::error::{AcquisitionError, FetchError};
use crate::fetch::TileSource;
use crate::reconcile::geometry::fingerprint;
use crate::types::{Attributes, BoundingBox, Crs, RawFeature};

/// Valeur des champs absents
pub const NOT_AVAILABLE: &str = "N/D";

/// Demi-côté de l'emprise interrogée autour du point (degrés)
pub const LOOKUP_HALF_SIZE_DEG: f64 = 1e-6;

/// Attribut portant la référence cadastrale nationale
pub const REFERENCE_FIELD: &str = "nationalCadastralReference";

/// Référence cadastrale nationale `CCCCZFFFFAS.particella`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CadastralReference {
    /// Code Belfiore de la commune (CCCC)
    pub comune: String,
    /// Section censuaire (Z) ; vide si `_`
    pub sezione: String,
    /// Feuille (FFFF) telle qu'écrite
    pub foglio_code: String,
    /// Feuille en entier, si numérique
    pub foglio: Option<u32>,
    /// Allegato (A)
    pub allegato: String,
    /// Sviluppo (S)
    pub sviluppo: String,
    /// Numéro de particelle (après le point)
    pub particella: Option<String>,
}

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w{4})(\w)(\w{4})(\w)(\w)(?:\.(.*))?$").expect("valid regex"))
}

impl CadastralReference {
    /// Analyse une référence ; `None` si le code avant le point ne fait pas 11 caractères
    pub fn parse(reference: &str) -> Option<Self> {
        let caps = reference_regex().captures(reference.trim())?;
        let sezione = &caps[2];
        let foglio_code = caps[3].to_string();

        Some(Self {
            comune: caps[1].to_string(),
            sezione: if sezione == "_" { String::new() } else { sezione.to_string() },
            foglio: foglio_code.parse().ok(),
            foglio_code,
            allegato: caps[4].to_string(),
            sviluppo: caps[5].to_string(),
            particella: caps.get(6).map(|m| m.as_str().to_string()),
        })
    }

    /// Attributs ajoutés par `--expand-reference`
    pub fn expanded_attributes(&self) -> [(&'static str, String); 4] {
        [
            ("sezione", self.sezione.clone()),
            (
                "foglio",
                self.foglio.map(|f| f.to_string()).unwrap_or_default(),
            ),
            ("allegato", self.allegato.clone()),
            ("sviluppo", self.sviluppo.clone()),
        ]
    }
}

/// Ajoute sezione, foglio, allegato, sviluppo si la référence est lisible
pub fn expand_reference(attributes: &mut Attributes) -> bool {
    let Some(reference) = attributes.get(REFERENCE_FIELD).and_then(CadastralReference::parse)
    else {
        return false;
    };
    for (name, value) in reference.expanded_attributes() {
        attributes.set(name, value);
    }
    true
}

/// Fiche d'une particelle, dans l'ordre du tuple renvoyé
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcelInfo {
    pub reference: String,
    pub foglio: String,
    pub label: String,
    pub administrative_unit: String,
    pub geometry_wkt: String,
    pub sezione: String,
    pub allegato: String,
}

impl ParcelInfo {
    /// Fiche vide (aucune parcelle sous le point)
    pub fn not_found() -> Self {
        Self {
            reference: NOT_AVAILABLE.to_string(),
            foglio: NOT_AVAILABLE.to_string(),
            label: NOT_AVAILABLE.to_string(),
            administrative_unit: NOT_AVAILABLE.to_string(),
            geometry_wkt: NOT_AVAILABLE.to_string(),
            sezione: NOT_AVAILABLE.to_string(),
            allegato: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn from_feature(feature: &RawFeature) -> Self {
        let attr = |name: &str| {
            feature
                .attributes
                .get(name)
                .unwrap_or(NOT_AVAILABLE)
                .to_string()
        };
        let reference = attr(REFERENCE_FIELD);

        // la feuille se lit aux positions 5..9 même quand le code est irrégulier
        let foglio = reference
            .get(5..9)
            .filter(|_| reference.len() > 9)
            .unwrap_or(NOT_AVAILABLE)
            .to_string();

        let (sezione, allegato) = match CadastralReference::parse(&reference) {
            Some(parsed) => (parsed.sezione, parsed.allegato),
            None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        };

        Self {
            foglio,
            label: attr("label"),
            administrative_unit: attr("administrativeUnit"),
            geometry_wkt: fingerprint(&feature.geometry),
            sezione,
            allegato,
            reference,
        }
    }

    /// Tuple (reference, foglio, label, administrativeUnit, wkt, sezione, allegato)
    pub fn into_tuple(self) -> [String; 7] {
        [
            self.reference,
            self.foglio,
            self.label,
            self.administrative_unit,
            self.geometry_wkt,
            self.sezione,
            self.allegato,
        ]
    }
}

/// Erreurs de l'interrogation ponctuelle
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Area(#[from] AcquisitionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Interroge la parcelle sous `point` (exprimé dans `crs`)
pub async fn lookup<S>(
    source: &S,
    normalizer: &AreaNormalizer,
    point: Coord,
    crs: Crs,
) -> Result<ParcelInfo, LookupError>
where
    S: TileSource + ?Sized,
{
    let projected = match normalizer.transform(&Geometry::Point(Point::from(point)), crs)? {
        Geometry::Point(p) => p,
        other => {
            return Err(AcquisitionError::InvalidArea(format!(
                "point transformed into {:?}",
                other
            ))
            .into())
        }
    };

    let bbox = BoundingBox::new(
        projected.x() - LOOKUP_HALF_SIZE_DEG,
        projected.y() - LOOKUP_HALF_SIZE_DEG,
        projected.x() + LOOKUP_HALF_SIZE_DEG,
        projected.y() + LOOKUP_HALF_SIZE_DEG,
        normalizer.service_crs(),
    )?;

    let payload = source.fetch(&bbox).await?;
    debug!(candidates = payload.features.len(), "Parcelles candidates");

    let target = Geometry::Point(projected);
    let found = payload
        .features
        .iter()
        .find(|f| f.geometry.intersects(&target))
        .or_else(|| payload.features.first());

    Ok(found.map(ParcelInfo::from_feature).unwrap_or_else(ParcelInfo::not_found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::TilePayload;
    use async_trait::async_trait;
    use geo::polygon;

    #[test]
    fn test_parse_reference() {
        let r = CadastralReference::parse("H501D001200.45").unwrap();
        assert_eq!(r.comune, "H501");
        assert_eq!(r.sezione, "D");
        assert_eq!(r.foglio_code, "0012");
        assert_eq!(r.foglio, Some(12));
        assert_eq!(r.allegato, "0");
        assert_eq!(r.sviluppo, "0");
        assert_eq!(r.particella.as_deref(), Some("45"));
    }

    #[test]
    fn test_parse_reference_without_section() {
        let r = CadastralReference::parse("A944_0007AB.123").unwrap();
        assert_eq!(r.sezione, "");
        assert_eq!(r.foglio, Some(7));
        assert_eq!(r.allegato, "A");
        assert_eq!(r.sviluppo, "B");
    }

    #[test]
    fn test_parse_reference_rejects_short_code() {
        assert!(CadastralReference::parse("H501D0012.45").is_none());
        assert!(CadastralReference::parse("").is_none());
    }

    #[test]
    fn test_expand_reference() {
        let mut attributes = Attributes::from(vec![(
            "nationalCadastralReference".to_string(),
            "H501_00120Z.45".to_string(),
        )]);
        assert!(expand_reference(&mut attributes));
        assert_eq!(attributes.get("sezione"), Some(""));
        assert_eq!(attributes.get("foglio"), Some("12"));
        assert_eq!(attributes.get("sviluppo"), Some("Z"));
        assert_eq!(attributes.len(), 5);
    }

    struct OneParcel(Vec<RawFeature>);

    #[async_trait]
    impl TileSource for OneParcel {
        async fn fetch(&self, _bbox: &BoundingBox) -> Result<TilePayload, FetchError> {
            Ok(TilePayload {
                features: self.0.clone(),
                ..Default::default()
            })
        }
    }

    fn parcel(reference: &str, x: f64) -> RawFeature {
        RawFeature {
            identity_key: reference.to_string(),
            attributes: Attributes::from(vec![
                ("nationalCadastralReference".to_string(), reference.to_string()),
                ("label".to_string(), "45".to_string()),
                ("administrativeUnit".to_string(), "H501".to_string()),
            ]),
            geometry: Geometry::Polygon(polygon![
                (x: x, y: 41.0), (x: x + 0.01, y: 41.0), (x: x + 0.01, y: 41.01), (x: x, y: 41.01), (x: x, y: 41.0)
            ]),
        }
    }

    #[tokio::test]
    async fn test_lookup_prefers_containing_parcel() {
        let source = OneParcel(vec![
            parcel("H501D001200.1", 12.0),
            parcel("H501_0034A0.2", 12.5),
        ]);
        let normalizer = AreaNormalizer::new(Crs::RDN2008);
        let info = lookup(&source, &normalizer, Coord { x: 12.505, y: 41.005 }, Crs::RDN2008)
            .await
            .unwrap();

        assert_eq!(info.reference, "H501_0034A0.2");
        assert_eq!(info.foglio, "0034");
        assert_eq!(info.sezione, "");
        assert_eq!(info.allegato, "A");
        assert_eq!(info.administrative_unit, "H501");
        assert!(info.geometry_wkt.starts_with("POLYGON"));
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let source = OneParcel(vec![]);
        let normalizer = AreaNormalizer::new(Crs::RDN2008);
        let info = lookup(&source, &normalizer, Coord { x: 12.5, y: 41.9 }, Crs::RDN2008)
            .await
            .unwrap();
        assert_eq!(info.clone().into_tuple(), std::array::from_fn(|_| "N/D".to_string()));
        assert_eq!(info, ParcelInfo::not_found());
    }
}
