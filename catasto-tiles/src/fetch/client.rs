//! Client HTTP du WFS cadastral
//!
//! Une requête GetFeature par tuile. Le corps de la réponse n'est conservé
//! que le temps du parsing.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use tracing::{debug, warn};
use wfs_gml::{AxisOrder, ParseOptions};

use super::{TilePayload, TileSource};
use crate::config::Config;
use crate::error::{AcquisitionError, FetchError};
use crate::types::{BoundingBox, Crs};

const USER_AGENT: &str = concat!("catasto-tiles/", env!("CARGO_PKG_VERSION"));

/// Client GetFeature
pub struct WfsClient {
    client: Client,
    base: Url,
    type_name: String,
    version: String,
    service_crs: Crs,
    identity_fields: Vec<String>,
    parse_options: ParseOptions,
}

impl WfsClient {
    pub fn new(config: &Config) -> Result<Self, AcquisitionError> {
        let base = Url::parse(&config.service_url)
            .map_err(|e| AcquisitionError::Config(format!("invalid service URL: {}", e)))?;
        if base.scheme() != "https" {
            return Err(AcquisitionError::Config(format!(
                "service URL must use https: {}",
                config.service_url
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AcquisitionError::Config(format!("Failed to create HTTP client: {}", e)))?;

        // URN EPSG géographique : latitude en premier
        let axis_order = if config.service_crs.is_geographic() {
            AxisOrder::LatLon
        } else {
            AxisOrder::LonLat
        };

        Ok(Self {
            client,
            base,
            type_name: config.type_name.clone(),
            version: config.wfs_version.clone(),
            service_crs: config.service_crs,
            identity_fields: config.identity_fields.clone(),
            parse_options: ParseOptions {
                axis_order,
                geometry_property: config.geometry_property.clone(),
            },
        })
    }

    /// URL GetFeature d'une emprise (exprimée dans le CRS du service)
    pub fn request_url(&self, bbox: &BoundingBox) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("service", "WFS")
            .append_pair("request", "GetFeature")
            .append_pair("version", &self.version)
            .append_pair("typeNames", &self.type_name)
            .append_pair("srsName", &self.service_crs.urn())
            .append_pair("bbox", &bbox_param(bbox, self.service_crs));
        url
    }

    fn classify(&self, body: &Bytes) -> Result<TilePayload, FetchError> {
        let parsed = wfs_gml::parse(body, &self.parse_options)?;
        if parsed.is_truncated() {
            warn!(
                matched = ?parsed.number_matched,
                returned = ?parsed.number_returned,
                "Réponse tronquée par le serveur, réduire la taille des tuiles"
            );
        }
        Ok(TilePayload::from_gml(parsed, &self.identity_fields))
    }
}

impl fmt::Debug for WfsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WfsClient")
            .field("base", &self.base.as_str())
            .field("type_name", &self.type_name)
            .field("service_crs", &self.service_crs)
            .finish()
    }
}

#[async_trait]
impl TileSource for WfsClient {
    async fn fetch(&self, bbox: &BoundingBox) -> Result<TilePayload, FetchError> {
        let url = self.request_url(bbox);
        debug!(%url, "GetFeature");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Réponse reçue");
        self.classify(&body)
    }
}

/// Paramètre `bbox` : ordre des axes du CRS, suivi de son URN
pub fn bbox_param(bbox: &BoundingBox, crs: Crs) -> String {
    let (a0, a1, b0, b1) = if crs.is_geographic() {
        (bbox.min_y(), bbox.min_x(), bbox.max_y(), bbox.max_x())
    } else {
        (bbox.min_x(), bbox.min_y(), bbox.max_x(), bbox.max_y())
    };
    format!("{},{},{},{},{}", a0, a1, b0, b1, crs.urn())
}
