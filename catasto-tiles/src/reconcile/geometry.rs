//! Phase 2 : doublons géométriques (marquage, jamais suppression)
//!
//! L'empreinte d'une géométrie est son WKT après arrondi à 6 décimales.
//! Deux features d'identités différentes partageant une empreinte forment un
//! groupe numéroté dans l'ordre de première apparition, à partir de 1.

use std::collections::HashMap;

use geo::{Coord, Geometry, MapCoords};
use geozero::wkt::WktWriter;
use geozero::GeozeroGeometry;
use rayon::prelude::*;

use crate::types::{RawFeature, ReconciledFeature};

/// Décimales conservées dans l'empreinte
pub const FINGERPRINT_DECIMALS: i32 = 6;

/// Empreinte textuelle d'une géométrie à précision fixe
pub fn fingerprint(geom: &Geometry) -> String {
    let scale = 10f64.powi(FINGERPRINT_DECIMALS);
    // + 0.0 normalise -0.0
    let rounded = geom.map_coords(|c| Coord {
        x: (c.x * scale).round() / scale + 0.0,
        y: (c.y * scale).round() / scale + 0.0,
    });

    let mut buf = Vec::new();
    let mut writer = WktWriter::new(&mut buf);
    if rounded.process_geom(&mut writer).is_err() {
        // repli déterministe pour les types sans équivalent WKT
        return format!("{:?}", rounded);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Marque les groupes de géométries identiques ; `|sortie| == |entrée|`
pub fn tag_duplicates(features: Vec<RawFeature>) -> Vec<ReconciledFeature> {
    let fingerprints: Vec<String> = features
        .par_iter()
        .map(|f| fingerprint(&f.geometry))
        .collect();

    let mut sizes: HashMap<&str, usize> = HashMap::new();
    for fp in &fingerprints {
        *sizes.entry(fp.as_str()).or_default() += 1;
    }

    let mut group_ids: HashMap<&str, u32> = HashMap::new();
    let mut next_id = 1u32;
    let mut tagged = Vec::with_capacity(features.len());

    for (feature, fp) in features.into_iter().zip(fingerprints.iter()) {
        let duplicate_group_id = if sizes.get(fp.as_str()).copied().unwrap_or(0) >= 2 {
            let id = *group_ids.entry(fp.as_str()).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            Some(id)
        } else {
            None
        };
        tagged.push(ReconciledFeature {
            feature,
            is_duplicate_geometry: duplicate_group_id.is_some(),
            duplicate_group_id,
        });
    }

    tagged
}

/// Recalcule les groupes après suppression de features
///
/// Un groupe réduit à un seul membre est dissous ; les groupes restants sont
/// renumérotés de façon contiguë en conservant leur ordre.
pub fn regroup(features: &mut [ReconciledFeature]) {
    let mut sizes: HashMap<u32, usize> = HashMap::new();
    for id in features.iter().filter_map(|f| f.duplicate_group_id) {
        *sizes.entry(id).or_default() += 1;
    }

    let mut renumber: HashMap<u32, u32> = HashMap::new();
    let mut next_id = 1u32;

    for feature in features.iter_mut() {
        let Some(old) = feature.duplicate_group_id else {
            continue;
        };
        if sizes.get(&old).copied().unwrap_or(0) < 2 {
            feature.duplicate_group_id = None;
            feature.is_duplicate_geometry = false;
            continue;
        }
        let new = *renumber.entry(old).or_insert_with(|| {
            let id = next_id;
            next_id += 1;
            id
        });
        feature.duplicate_group_id = Some(new);
    }
}

/// Nombre de groupes distincts
pub fn group_count(features: &[ReconciledFeature]) -> usize {
    features
        .iter()
        .filter_map(|f| f.duplicate_group_id)
        .max()
        .unwrap_or(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attributes;
    use geo::{point, polygon};

    fn feature(key: &str, geometry: Geometry) -> RawFeature {
        RawFeature {
            identity_key: key.to_string(),
            attributes: Attributes::new(),
            geometry,
        }
    }

    fn square(x: f64) -> Geometry {
        Geometry::Polygon(polygon![
            (x: x, y: 41.0), (x: x + 0.001, y: 41.0), (x: x + 0.001, y: 41.001), (x: x, y: 41.0)
        ])
    }

    #[test]
    fn test_fingerprint_precision() {
        let a = Geometry::Point(point!(x: 12.1234564, y: 41.0));
        let b = Geometry::Point(point!(x: 12.1234561, y: 41.0000004));
        let c = Geometry::Point(point!(x: 12.123457, y: 41.0));
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
        assert!(fingerprint(&a).starts_with("POINT"));
    }

    #[test]
    fn test_negative_zero() {
        let a = Geometry::Point(point!(x: -0.0000001, y: 0.0));
        let b = Geometry::Point(point!(x: 0.0, y: 0.0));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_same_geometry_distinct_identity_is_tagged() {
        let tagged = tag_duplicates(vec![
            feature("A1", square(12.0)),
            feature("B1", square(12.5)),
            feature("A2", square(12.0)),
        ]);

        assert_eq!(tagged.len(), 3);
        assert!(tagged[0].is_duplicate_geometry);
        assert!(tagged[2].is_duplicate_geometry);
        assert_eq!(tagged[0].duplicate_group_id, Some(1));
        assert_eq!(tagged[2].duplicate_group_id, Some(1));
        assert!(!tagged[1].is_duplicate_geometry);
        assert_eq!(tagged[1].duplicate_group_id, None);
    }

    #[test]
    fn test_group_ids_follow_first_seen_order() {
        let tagged = tag_duplicates(vec![
            feature("a", square(13.0)),
            feature("b", square(12.0)),
            feature("c", square(12.0)),
            feature("d", square(13.0)),
        ]);
        let ids: Vec<_> = tagged.iter().map(|f| f.duplicate_group_id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(2), Some(1)]);
        assert_eq!(group_count(&tagged), 2);
    }

    #[test]
    fn test_regroup_dissolves_singletons() {
        let mut tagged = tag_duplicates(vec![
            feature("a", square(13.0)),
            feature("b", square(12.0)),
            feature("c", square(12.0)),
            feature("d", square(13.0)),
        ]);
        // "d" retiré par le filtre spatial
        tagged.remove(3);
        regroup(&mut tagged);

        assert!(!tagged[0].is_duplicate_geometry);
        assert_eq!(tagged[0].duplicate_group_id, None);
        assert_eq!(tagged[1].duplicate_group_id, Some(1));
        assert_eq!(tagged[2].duplicate_group_id, Some(1));
        assert_eq!(group_count(&tagged), 1);
    }
}
