//! IP-geolocation lookup.
//!
//! Resolves the calling client's network address and approximate location
//! through an ipwho.is-style JSON endpoint. Responses pass an explicit schema
//! validation step, so callers only ever see a typed [`GeoLocation`] or a
//! typed [`GeoLookupError`](crate::error_handling::GeoLookupError).

mod lookup;
mod types;
mod validate;

// Re-export public API
pub use lookup::GeolocationClient;
pub use types::GeoLocation;
pub use validate::validate_response;
