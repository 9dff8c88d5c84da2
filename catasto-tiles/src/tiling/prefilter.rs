//! Préfiltre spatial des tuiles
//!
//! Une tuile dont le rectangle n'intersecte pas la géométrie de filtrage est
//! retirée avant toute requête. Le test est exact (pas de faux négatif).

use tracing::debug;

use super::planner::TilePlan;
use crate::types::FilterGeometry;

/// Retire du plan les tuiles hors filtre ; retourne le nombre de tuiles écartées.
///
/// Sans filtre, le plan est laissé intact.
pub fn prefilter(plan: &mut TilePlan, filter: Option<&FilterGeometry>) -> usize {
    let Some(filter) = filter else {
        return 0;
    };

    let before = plan.tiles.len();
    plan.tiles
        .retain(|tile| filter.intersects_rect(tile.bbox.to_rect()));
    let skipped = before - plan.tiles.len();
    plan.skipped += skipped;

    debug!(kept = plan.tiles.len(), skipped, "Préfiltre spatial");
    skipped
}
