//! Geolocation HTTP client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;

use super::types::GeoLocation;
use super::validate::validate_response;
use crate::error_handling::GeoLookupError;

/// Client for an ipwho.is-style geolocation endpoint.
///
/// The endpoint geolocates the caller's own address, so the lookup takes no
/// input.
#[derive(Clone)]
pub struct GeolocationClient {
    client: Arc<reqwest::Client>,
    endpoint: String,
    timeout: Duration,
}

impl GeolocationClient {
    pub fn new(
        client: Arc<reqwest::Client>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        GeolocationClient {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Looks up the caller's network address and location.
    ///
    /// The whole exchange (connect, headers, body) is bounded by the
    /// configured timeout.
    pub async fn lookup(&self) -> Result<GeoLocation, GeoLookupError> {
        match tokio::time::timeout(self.timeout, self.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(GeoLookupError::Timeout),
        }
    }

    async fn fetch(&self) -> Result<GeoLocation, GeoLookupError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoLookupError::Status(status));
        }

        let bytes = response.bytes().await.map_err(map_request_error)?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        let location = validate_response(&body)?;

        log::debug!(
            "Geolocated {} to {} ({}, {})",
            location.network_address,
            location.country,
            location.latitude,
            location.longitude
        );
        Ok(location)
    }
}

fn map_request_error(e: reqwest::Error) -> GeoLookupError {
    if e.is_timeout() {
        GeoLookupError::Timeout
    } else {
        GeoLookupError::Request(e)
    }
}
