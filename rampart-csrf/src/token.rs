use crate::error::{CsrfError, Result};
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Hex digits after the prefix: 13 of timestamp, 8 of sequence
const NAME_SUFFIX_LEN: usize = 21;

/// Name and value of one issued token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub name: String,
    pub value: String,
}

impl KeyPair {
    /// Generate a fresh pair in the given namespace.
    ///
    /// The value is `strength` bytes from the operating system CSPRNG,
    /// hex encoded. There is no fallback source: if the CSPRNG is
    /// unavailable this fails.
    pub fn generate(prefix: &str, strength: usize) -> Result<Self> {
        Ok(Self {
            name: unique_name(prefix),
            value: random_value(strength)?,
        })
    }
}

impl From<(String, String)> for KeyPair {
    fn from((name, value): (String, String)) -> Self {
        Self { name, value }
    }
}

/// Token name: the prefix followed by a per-process unique suffix.
///
/// The suffix is the current time in microseconds and a sequence number,
/// both fixed-width hex. It is unique, not unpredictable.
pub fn unique_name(prefix: &str) -> String {
    let micros = Utc::now().timestamp_micros();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}{:013x}{:08x}", prefix, micros, seq as u32)
}

/// Whether `name` has the exact shape [`unique_name`] gives it for `prefix`.
///
/// Distinguishes `csrf…` from `csrfapi…` when namespaces share a store.
pub fn is_token_name(prefix: &str, name: &str) -> bool {
    name.strip_prefix(prefix).is_some_and(|suffix| {
        suffix.len() == NAME_SUFFIX_LEN
            && suffix.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    })
}

/// Hex-encoded random value of `strength` bytes.
pub fn random_value(strength: usize) -> Result<String> {
    let mut bytes = vec![0u8; strength];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CsrfError::GenerationFailed(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// A key pair labelled with the field names a client must submit it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFields {
    /// `{prefix}_name`
    pub name_key: String,
    pub name: String,
    /// `{prefix}_value`
    pub value_key: String,
    pub value: String,
}

impl TokenFields {
    pub fn new(prefix: &str, pair: &KeyPair) -> Self {
        Self {
            name_key: name_key(prefix),
            name: pair.name.clone(),
            value_key: value_key(prefix),
            value: pair.value.clone(),
        }
    }

    /// `(field, value)` pairs for hidden form inputs.
    pub fn pairs(&self) -> [(&str, &str); 2] {
        [
            (self.name_key.as_str(), self.name.as_str()),
            (self.value_key.as_str(), self.value.as_str()),
        ]
    }

    pub fn key_pair(&self) -> KeyPair {
        KeyPair {
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }
}

// Serialises as `{"<prefix>_name": name, "<prefix>_value": value}`.
impl Serialize for TokenFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(&self.name_key, &self.name)?;
        map.serialize_entry(&self.value_key, &self.value)?;
        map.end()
    }
}

pub fn name_key(prefix: &str) -> String {
    format!("{}_name", prefix)
}

pub fn value_key(prefix: &str) -> String {
    format!("{}_value", prefix)
}
