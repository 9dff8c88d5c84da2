//! # catasto-tiles
//!
//! Téléchargement des particelle cadastrales italiennes depuis le WFS INSPIRE
//! de l'Agenzia delle Entrate, quelle que soit la taille de la zone.
//!
//! ## Features
//!
//! - Zone d'intérêt : rectangle, polygone ou buffer de ligne, dans n'importe quel CRS
//! - Découpage en grille sous la limite de features du serveur
//! - Requêtes séquentielles cadencées, annulables à tout moment
//! - Dédoublonnage par identité, marquage des géométries identiques
//! - Rapport d'acquisition produit même en cas d'annulation ou d'échec partiel
//! - Export GeoJSON
//!
//! ## Usage CLI
//!
//! ```bash
//! # Rectangle en EPSG:6706 (lon,lat)
//! catasto-tiles bbox --corner 12.46,41.88 --corner 12.50,41.91 > parcelle.geojson
//!
//! # Buffer de 50 m autour d'une ligne en UTM 33N
//! catasto-tiles line --crs EPSG:32633 --vertex 291000,4640000 --vertex 292000,4640500
//!
//! # Parcelle sous un point
//! catasto-tiles lookup --x 12.4964 --y 41.9028
//! ```

pub mod acquisition;
pub mod area;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod lookup;
pub mod reconcile;
pub mod report;
#[cfg(feature = "reproject")]
pub mod reproject;
pub mod reproject_lite;
pub mod session;
pub mod tiling;
pub mod types;

pub use acquisition::{acquire, AcquisitionResult, PlannedRun};
pub use area::{AreaNormalizer, AreaRequest, GeometryKind};
pub use config::Config;
pub use error::{AcquisitionError, FetchError};
pub use fetch::{CancelSignal, PacedFetcher, TilePayload, TileSource, WfsClient};
pub use report::{AcquisitionReport, AcquisitionStatus};
pub use types::{
    AreaOfInterest, Attributes, BoundingBox, Crs, FilterGeometry, RawFeature, ReconciledFeature,
    TileSpec,
};
