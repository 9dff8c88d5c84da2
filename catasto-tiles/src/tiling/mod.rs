//! Découpage de la zone d'intérêt en tuiles

pub mod planner;
pub mod prefilter;

pub use planner::{estimate_area_km2, TileGridPlanner, TilePlan};
pub use prefilter::prefilter;
