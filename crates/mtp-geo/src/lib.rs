//! Thin client around an ifconfig-style IP geolocation endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected response status: {0}")]
    Status(reqwest::StatusCode),
}

/// Geolocation payload as returned by the endpoint. Stored verbatim on the
/// provider row, so field names are part of the persisted format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoInfo {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub country_iso: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub time_zone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://ifconfig.co".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for GeoClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

pub struct GeoClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeoClient {
    pub fn new(config: &GeoClientConfig) -> Result<Self, GeoError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get_ip_info(&self, ip: &str) -> Result<GeoInfo, GeoError> {
        let url = format!("{}/json", self.base_url);
        let response = self.http.get(url).query(&[("ip", ip)]).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%ip, %status, "geo lookup returned non-success status");
            return Err(GeoError::Status(status));
        }

        Ok(response.json::<GeoInfo>().await?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_full_payload() {
        let raw = r#"{
            "ip": "8.8.8.8",
            "country": "United States",
            "country_iso": "US",
            "city": "Mountain View",
            "time_zone": "America/Los_Angeles"
        }"#;

        let info: GeoInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.country_iso, "US");
        assert_eq!(info.city, "Mountain View");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let info: GeoInfo = serde_json::from_str(r#"{"ip": "1.1.1.1"}"#).unwrap();
        assert_eq!(info.ip, "1.1.1.1");
        assert!(info.country.is_empty());
        assert!(info.time_zone.is_empty());
    }

    #[test]
    fn round_trips_to_json_blob() {
        let info = GeoInfo {
            ip: "8.8.8.8".to_string(),
            country: "United States".to_string(),
            country_iso: "US".to_string(),
            city: "Mountain View".to_string(),
            time_zone: "America/Los_Angeles".to_string(),
        };

        let blob = serde_json::to_string(&info).unwrap();
        let back: GeoInfo = serde_json::from_str(&blob).unwrap();
        assert_eq!(back.country, info.country);
        assert_eq!(back.country_iso, info.country_iso);
    }
}
