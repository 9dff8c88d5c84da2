//! Phase 3 : filtre spatial final
//!
//! Les tuiles rectangulaires ramènent des features hors de la vraie zone
//! (polygone, buffer de ligne) : on ne garde que celles qui l'intersectent.

use super::geometry::regroup;
use crate::types::{FilterGeometry, ReconciledFeature};

/// Filtre les features ; retourne le nombre de features retirées.
///
/// Sans filtre, aucun changement. Les groupes de doublons sont recalculés sur
/// les survivants.
pub fn apply_filter(
    features: &mut Vec<ReconciledFeature>,
    filter: Option<&FilterGeometry>,
) -> usize {
    let Some(filter) = filter else {
        return 0;
    };

    let before = features.len();
    features.retain(|f| filter.intersects(&f.feature.geometry));
    let removed = before - features.len();

    if removed > 0 {
        regroup(features);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::geometry::tag_duplicates;
    use crate::types::{Attributes, RawFeature};
    use geo::{point, Geometry, LineString, Polygon};

    /// Disque de rayon `r` centré en (cx, cy)
    fn disk(cx: f64, cy: f64, r: f64) -> FilterGeometry {
        let mut ring: Vec<(f64, f64)> = (0..64)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / 64.0;
                (cx + r * a.cos(), cy + r * a.sin())
            })
            .collect();
        ring.push(ring[0]);
        FilterGeometry::from(Polygon::new(LineString::from(ring), vec![]))
    }

    fn raw(key: &str, x: f64, y: f64) -> RawFeature {
        RawFeature {
            identity_key: key.to_string(),
            attributes: Attributes::new(),
            geometry: Geometry::Point(point!(x: x, y: y)),
        }
    }

    #[test]
    fn test_outside_disk_is_removed() {
        let mut features = tag_duplicates(vec![raw("in", 0.1, 0.1), raw("out", 2.0, 2.0)]);
        let removed = apply_filter(&mut features, Some(&disk(0.0, 0.0, 1.0)));
        assert_eq!(removed, 1);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].feature.identity_key, "in");
    }

    #[test]
    fn test_no_filter_is_noop() {
        let mut features = tag_duplicates(vec![raw("a", 5.0, 5.0), raw("b", 5.0, 5.0)]);
        assert_eq!(apply_filter(&mut features, None), 0);
        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| f.duplicate_group_id == Some(1)));
    }

    #[test]
    fn test_group_tagging_stays_consistent() {
        // groupe 1 : un membre dedans, un dehors ; groupe 2 : deux membres dedans
        let mut features = tag_duplicates(vec![
            raw("a", 3.0, 3.0),
            raw("b", 0.2, 0.2),
            raw("c", 3.0, 3.0),
            raw("d", 0.2, 0.2),
        ]);
        // "a" entre dans le disque en gardant son groupe, "c" reste dehors
        features[0].feature.geometry = Geometry::Point(point!(x: 0.5, y: 0.0));

        let removed = apply_filter(&mut features, Some(&disk(0.0, 0.0, 1.0)));
        assert_eq!(removed, 1);

        let a = features.iter().find(|f| f.feature.identity_key == "a").unwrap();
        assert!(!a.is_duplicate_geometry);
        assert_eq!(a.duplicate_group_id, None);

        for key in ["b", "d"] {
            let f = features.iter().find(|f| f.feature.identity_key == key).unwrap();
            assert!(f.is_duplicate_geometry);
            assert_eq!(f.duplicate_group_id, Some(1));
        }
    }
}
