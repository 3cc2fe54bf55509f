//! HTTP geocoder: Nominatim reverse lookup with a GeoNames water-body
//! fallback.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::LayeredConfig;
use crate::error::{DriftlineError, Result};
use crate::ports::{GeocodeFailure, Geocoder};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Geocoder backed by the public Nominatim and GeoNames services.
pub struct HttpGeocoder {
    client: reqwest::Client,
    nominatim_url: String,
    geonames_url: String,
    geonames_user: String,
}

impl HttpGeocoder {
    /// Build a geocoder with the configured User-Agent and timeout.
    ///
    /// Nominatim rejects default-agent traffic, so a client that failed to
    /// take the configured agent is useless; builder failures propagate
    /// rather than degrading to a bare client.
    pub fn new(
        nominatim_url: impl Into<String>,
        geonames_url: impl Into<String>,
        geonames_user: impl Into<String>,
        user_agent: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DriftlineError::ConfigInvalid {
                key: "user_agent".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            nominatim_url: nominatim_url.into(),
            geonames_url: geonames_url.into(),
            geonames_user: geonames_user.into(),
        })
    }

    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        Self::new(
            config.nominatim_url.value.clone(),
            config.geonames_url.value.clone(),
            config.geonames_user.value.clone(),
            &config.user_agent.value,
        )
    }
}

/// Nominatim `/reverse` response; only the country attribute matters here.
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    country: Option<String>,
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn country_at(
        &self,
        lat: f64,
        lon: f64,
    ) -> std::result::Result<Option<String>, GeocodeFailure> {
        let url = format!("{}/reverse", self.nominatim_url.trim_end_matches('/'));
        let (lat, lon) = (lat.to_string(), lon.to_string());
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "1"),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .map_err(|e| GeocodeFailure::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeFailure::Status(response.status().as_u16()));
        }

        let body: ReverseResponse = response
            .json()
            .await
            .map_err(|e| GeocodeFailure::Payload(e.to_string()))?;

        Ok(body.address.and_then(|a| a.country))
    }

    async fn water_body_at(
        &self,
        lat: f64,
        lon: f64,
    ) -> std::result::Result<Option<String>, GeocodeFailure> {
        let url = format!(
            "{}/extendedFindNearbyJSON",
            self.geonames_url.trim_end_matches('/')
        );
        let (lat, lon) = (lat.to_string(), lon.to_string());
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lng", lon.as_str()),
                ("username", self.geonames_user.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeFailure::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeFailure::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GeocodeFailure::Payload(e.to_string()))?;

        // Over water the service reports a single named feature object, e.g.
        // {"ocean": {"name": "Indian Ocean", ...}}. Over land it reports a
        // "geonames" array instead, which carries no water-body name.
        let named = body.as_object().and_then(|map| {
            map.values()
                .find_map(|v| v.get("name").and_then(|n| n.as_str()))
        });
        Ok(named.map(str::to_string))
    }
}
