//! URL-encoded form helpers

use crate::Error;
use serde::de::DeserializeOwned;

/// Content type of a URL-encoded form body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Parse URL-encoded form data
pub fn parse_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))
}

/// Parse URL-encoded form data into ordered pairs, keeping duplicates.
pub fn parse_form_pairs(body: &[u8]) -> Result<Vec<(String, String)>, Error> {
    parse_form(body)
}

/// Encode pairs as a URL-encoded form body.
pub fn encode_form<K, V>(pairs: &[(K, V)]) -> Result<String, Error>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let pairs: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .collect();

    serde_urlencoded::to_string(pairs)
        .map_err(|e| Error::Serialization(format!("Failed to encode form data: {}", e)))
}
