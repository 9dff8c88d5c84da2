//! Configuration du système
//!
//! Priorité croissante : valeurs par défaut → fichier JSON → variables
//! d'environnement (`.env` compris) → options de la ligne de commande.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::AcquisitionError;
use crate::types::Crs;

/// URL du WFS INSPIRE de l'Agenzia delle Entrate
pub const DEFAULT_SERVICE_URL: &str =
    "https://wfs.cartografia.agenziaentrate.gov.it/inspire/wfs/owfs01.php";

/// Plafond de tuiles par défaut : environ 7 heures à 5 s de pause
pub const DEFAULT_MAX_TILES: usize = 5000;

/// Distance de buffer maximale autorisée (mètres)
pub const MAX_BUFFER_DISTANCE_M: f64 = 100.0;

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// URL du service WFS (https uniquement)
    pub service_url: String,

    /// Type de feature demandé
    pub type_name: String,

    /// Version WFS
    pub wfs_version: String,

    /// CRS imposé par le service
    pub service_crs: Crs,

    /// Aire maximale d'une tuile (km²)
    pub max_tile_area_km2: f64,

    /// Nombre maximal de tuiles d'un run
    pub max_tiles: usize,

    /// Pause minimale entre deux requêtes (secondes)
    pub pacing_secs: u64,

    /// Timeout d'une requête (secondes)
    pub request_timeout_secs: u64,

    /// Chaîne de repli pour la clé d'identité
    pub identity_fields: Vec<String>,

    /// Propriété portant la géométrie des features
    pub geometry_property: String,

    /// Distance de buffer des lignes (mètres)
    pub buffer_distance_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            type_name: "CP:CadastralParcel".to_string(),
            wfs_version: "2.0.0".to_string(),
            service_crs: Crs::RDN2008,
            max_tile_area_km2: 4.0,
            max_tiles: DEFAULT_MAX_TILES,
            pacing_secs: 5,
            request_timeout_secs: 120,
            identity_fields: vec![
                "gml_id".to_string(),
                "inspireId_localId".to_string(),
                "nationalCadastralReference".to_string(),
            ],
            geometry_property: "geometry".to_string(),
            buffer_distance_m: 50.0,
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier (champs absents = défauts)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Applique les variables `CATASTO_*` de l'environnement du processus
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applique les surcharges fournies par `lookup`
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("CATASTO_WFS_URL") {
            self.service_url = url;
        }
        if let Some(v) = lookup("CATASTO_MAX_TILE_KM2") {
            self.max_tile_area_km2 = v
                .trim()
                .parse()
                .context(format!("Invalid CATASTO_MAX_TILE_KM2: {}", v))?;
        }
        if let Some(v) = lookup("CATASTO_MAX_TILES") {
            self.max_tiles = v
                .trim()
                .parse()
                .context(format!("Invalid CATASTO_MAX_TILES: {}", v))?;
        }
        if let Some(v) = lookup("CATASTO_PACING_SECS") {
            self.pacing_secs = v
                .trim()
                .parse()
                .context(format!("Invalid CATASTO_PACING_SECS: {}", v))?;
        }
        if let Some(v) = lookup("CATASTO_TIMEOUT_SECS") {
            self.request_timeout_secs = v
                .trim()
                .parse()
                .context(format!("Invalid CATASTO_TIMEOUT_SECS: {}", v))?;
        }
        Ok(())
    }

    /// Vérifie la cohérence de la configuration
    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if !self.service_url.starts_with("https://") {
            return Err(AcquisitionError::Config(format!(
                "service URL must use https: {}",
                self.service_url
            )));
        }
        if !self.max_tile_area_km2.is_finite() || self.max_tile_area_km2 <= 0.0 {
            return Err(AcquisitionError::Config(format!(
                "max_tile_area_km2 must be > 0, got {}",
                self.max_tile_area_km2
            )));
        }
        if self.max_tiles == 0 {
            return Err(AcquisitionError::Config("max_tiles must be > 0".to_string()));
        }
        if self.identity_fields.iter().all(|f| f.trim().is_empty()) {
            return Err(AcquisitionError::Config(
                "identity_fields must name at least one field".to_string(),
            ));
        }
        if !(self.buffer_distance_m > 0.0 && self.buffer_distance_m <= MAX_BUFFER_DISTANCE_M) {
            return Err(AcquisitionError::Config(format!(
                "buffer_distance_m must be in (0, {}], got {}",
                MAX_BUFFER_DISTANCE_M, self.buffer_distance_m
            )));
        }
        if !self.service_crs.is_geographic() {
            return Err(AcquisitionError::Config(format!(
                "service CRS must be geographic, got {}",
                self.service_crs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(AcquisitionError::Config(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
