//! Schema validation for geolocation responses.

use serde_json::{Map, Value};

use super::types::GeoLocation;
use crate::config::UNKNOWN;
use crate::error_handling::GeoValidationError;

/// Validates a raw geolocation response into a [`GeoLocation`].
///
/// Required: a boolean `success` flag that is `true`, a string `ip`, a string
/// `country`, and finite numeric `latitude`/`longitude`. `city` and `region`
/// are optional (non-string or empty values read as absent). The timezone is
/// taken from `timezone.utc`, then `timezone.id`, then a bare string
/// `timezone`, falling back to `"Unknown"`.
pub fn validate_response(body: &Value) -> Result<GeoLocation, GeoValidationError> {
    let object = body.as_object().ok_or(GeoValidationError::NotAnObject)?;

    match object.get("success").and_then(Value::as_bool) {
        Some(true) => {}
        Some(false) => {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no reason given")
                .to_string();
            return Err(GeoValidationError::LookupRejected(message));
        }
        None => return Err(GeoValidationError::MissingSuccessFlag),
    }

    let network_address = object
        .get("ip")
        .and_then(Value::as_str)
        .filter(|ip| !ip.is_empty())
        .ok_or(GeoValidationError::InvalidAddress)?
        .to_string();

    let country = object
        .get("country")
        .and_then(Value::as_str)
        .ok_or(GeoValidationError::InvalidCountry)?
        .to_string();

    let latitude = finite_number(object, "latitude")?;
    let longitude = finite_number(object, "longitude")?;

    Ok(GeoLocation {
        network_address,
        country,
        city: optional_string(object, "city"),
        region: optional_string(object, "region"),
        timezone: timezone(object),
        latitude,
        longitude,
    })
}

fn finite_number(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<f64, GeoValidationError> {
    object
        .get(field)
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite())
        .ok_or(GeoValidationError::InvalidCoordinate(field))
}

fn optional_string(object: &Map<String, Value>, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn timezone(object: &Map<String, Value>) -> String {
    let nested = object.get("timezone");
    nested
        .and_then(|tz| tz.get("utc"))
        .and_then(Value::as_str)
        .or_else(|| nested.and_then(|tz| tz.get("id")).and_then(Value::as_str))
        .or_else(|| nested.and_then(Value::as_str))
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}
