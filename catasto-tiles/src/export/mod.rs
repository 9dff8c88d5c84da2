//! Restitution du résultat réconcilié

pub mod geojson;

pub use geojson::GeoJsonSink;

use anyhow::Result;

use crate::report::AcquisitionReport;
use crate::types::ReconciledFeature;

/// Options communes aux sinks
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkOptions {
    /// Ne garder que les features `is_duplicate_geometry = true`
    pub only_duplicates: bool,
    /// Ajouter sezione/foglio/allegato/sviluppo
    pub expand_reference: bool,
}

/// Consommateur du résultat final ; renvoie le nombre de features écrites
pub trait ResultSink {
    fn write(&mut self, features: &[ReconciledFeature], report: &AcquisitionReport)
        -> Result<usize>;
}

/// Features retenues selon les options
pub fn selected<'a>(
    features: &'a [ReconciledFeature],
    options: &SinkOptions,
) -> impl Iterator<Item = &'a ReconciledFeature> + 'a {
    let only_duplicates = options.only_duplicates;
    features
        .iter()
        .filter(move |f| !only_duplicates || f.is_duplicate_geometry)
}
