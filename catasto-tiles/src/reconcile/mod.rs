//! Réconciliation des features téléchargées
//!
//! 1. `identity` : une seule occurrence par clé d'identité
//! 2. `geometry` : marquage des géométries identiques (aucune suppression)
//! 3. `spatial` : filtre par la géométrie de filtrage, si elle existe

pub mod geometry;
pub mod identity;
pub mod spatial;

use tracing::info;

use crate::report::AcquisitionReport;
use crate::types::{FilterGeometry, RawFeature, ReconciledFeature};

/// Enchaîne les trois phases et renseigne le rapport
pub fn reconcile(
    features: Vec<RawFeature>,
    filter: Option<&FilterGeometry>,
    report: &mut AcquisitionReport,
) -> Vec<ReconciledFeature> {
    let before = features.len();
    let unique = identity::dedup_by_identity(features);
    report.record_identity_dedup(before, unique.len());
    info!(
        before,
        after = unique.len(),
        "Dédoublonnage par identité"
    );

    let mut tagged = geometry::tag_duplicates(unique);
    report.record_geometry_dedup(&tagged);
    info!(
        groups = report.duplicate_groups,
        tagged = report.duplicate_geometry_features,
        "Doublons géométriques"
    );

    if filter.is_some() {
        let removed = spatial::apply_filter(&mut tagged, filter);
        report.record_spatial_filter(removed, &tagged);
        info!(removed, kept = tagged.len(), "Filtre spatial");
    }

    tagged
}
