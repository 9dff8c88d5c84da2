//! Phase 1 : dédoublonnage par identité
//!
//! Deux tuiles voisines renvoient le même enregistrement le long de leur
//! frontière ; on ne garde que la première occurrence de chaque clé.

use std::collections::HashSet;

use blake3::Hasher;
use geo::Geometry;

use super::geometry::fingerprint;
use crate::types::{Attributes, RawFeature};

/// Préfixe des clés calculées quand aucun identifiant n'est disponible
pub const CONTENT_KEY_PREFIX: &str = "content:";

/// Clé d'identité : premier champ non vide de `fields` (insensible à la casse),
/// sinon empreinte blake3 des attributs et de la géométrie.
pub fn identity_key(attributes: &Attributes, geometry: &Geometry, fields: &[String]) -> String {
    fields
        .iter()
        .filter_map(|field| attributes.get(field))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| content_key(attributes, geometry))
}

/// Empreinte de contenu : deux enregistrements anonymes identiques fusionnent,
/// deux enregistrements différents jamais.
fn content_key(attributes: &Attributes, geometry: &Geometry) -> String {
    let mut hasher = Hasher::new();
    for (name, value) in attributes.iter() {
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        hasher.update(value.as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(b"GEOM");
    hasher.update(fingerprint(geometry).as_bytes());
    format!(
        "{}{}",
        CONTENT_KEY_PREFIX,
        hex::encode(hasher.finalize().as_bytes())
    )
}

/// Conserve la première occurrence de chaque clé, dans l'ordre de téléchargement
pub fn dedup_by_identity(features: Vec<RawFeature>) -> Vec<RawFeature> {
    let mut seen: HashSet<String> = HashSet::with_capacity(features.len());
    features
        .into_iter()
        .filter(|f| seen.insert(f.identity_key.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    fn fields() -> Vec<String> {
        vec![
            "gml_id".to_string(),
            "inspireId_localId".to_string(),
            "nationalCadastralReference".to_string(),
        ]
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into()
    }

    fn raw(key: &str, x: f64) -> RawFeature {
        RawFeature {
            identity_key: key.to_string(),
            attributes: Attributes::new(),
            geometry: Geometry::Point(point!(x: x, y: 41.0)),
        }
    }

    #[test]
    fn test_fallback_chain() {
        let geom = Geometry::Point(point!(x: 12.0, y: 41.0));

        let a = attrs(&[("gml_id", "G1"), ("inspireId_localId", "L1")]);
        assert_eq!(identity_key(&a, &geom, &fields()), "G1");

        let b = attrs(&[("gml_id", " "), ("INSPIREID_LOCALID", "L1")]);
        assert_eq!(identity_key(&b, &geom, &fields()), "L1");

        let c = attrs(&[("nationalCadastralReference", "H501D_0012A0.45")]);
        assert_eq!(identity_key(&c, &geom, &fields()), "H501D_0012A0.45");
    }

    #[test]
    fn test_content_key() {
        let geom = Geometry::Point(point!(x: 12.0, y: 41.0));
        let other = Geometry::Point(point!(x: 12.1, y: 41.0));
        let a = attrs(&[("label", "45")]);
        let b = attrs(&[("label", "46")]);

        let key = identity_key(&a, &geom, &fields());
        assert!(key.starts_with(CONTENT_KEY_PREFIX));
        assert_eq!(key, identity_key(&a, &geom, &fields()));
        assert_ne!(key, identity_key(&b, &geom, &fields()));
        assert_ne!(key, identity_key(&a, &other, &fields()));
    }

    #[test]
    fn test_keeps_first_occurrence() {
        let out = dedup_by_identity(vec![raw("A1", 1.0), raw("B1", 2.0), raw("A1", 3.0)]);
        let keys: Vec<_> = out.iter().map(|f| f.identity_key.as_str()).collect();
        assert_eq!(keys, vec!["A1", "B1"]);
        assert_eq!(out[0].geometry, Geometry::Point(point!(x: 1.0, y: 41.0)));
    }

    #[test]
    fn test_idempotent() {
        let once = dedup_by_identity(vec![raw("A1", 1.0), raw("A1", 1.0), raw("B1", 2.0)]);
        let keys: Vec<_> = once.iter().map(|f| f.identity_key.clone()).collect();
        let twice = dedup_by_identity(once);
        let keys_twice: Vec<_> = twice.iter().map(|f| f.identity_key.clone()).collect();
        assert_eq!(keys, keys_twice);
    }
}
