//! Stack configuration parameters
//!
//! Tunables for chunked serialization and value staging. Wire constants
//! (fragment size, float tolerance, default string and data lengths) are
//! fixed by the protocol and live next to the code that uses them.
//!
//! Human-edited files are JSON; the persisted form is postcard.

use serde::{Deserialize, Serialize};

/// Core stack configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    // --- Serializer ---
    /// Minimum number of bytes produced per serializer call
    pub serializer_min_chunk_bytes: usize,
    /// Output buffer size handed to the serializer per call
    pub serializer_max_chunk_bytes: usize,

    // --- Values ---
    /// Scratch buffer for staging TLV values and BLE signatures
    pub value_scratch_bytes: usize,
    /// Include characteristic values in debug logs
    pub log_sensitive_values: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            // Serializer
            serializer_min_chunk_bytes: 1024,
            serializer_max_chunk_bytes: 1460, // one TCP segment

            // Values
            value_scratch_bytes: 512,
            log_sensitive_values: false,
        }
    }
}

impl StackConfig {
    /// Smallest scratch buffer that still holds a characteristic signature.
    pub const MIN_SCRATCH_BYTES: usize = 32;

    /// Rejects parameter combinations the serializer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serializer_min_chunk_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "serializer_min_chunk_bytes must be at least 1",
            ));
        }
        if self.serializer_max_chunk_bytes < self.serializer_min_chunk_bytes {
            return Err(ConfigError::ValidationFailed(
                "serializer_max_chunk_bytes must not be below serializer_min_chunk_bytes",
            ));
        }
        if self.value_scratch_bytes < Self::MIN_SCRATCH_BYTES {
            return Err(ConfigError::ValidationFailed("value_scratch_bytes below 32"));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take their
    /// default values.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Compact stored form.
    pub fn to_postcard(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encoding)
    }

    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}

/// Errors from loading or persisting a [`StackConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored or supplied config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Config could not be encoded for storage.
    Encoding,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Encoding => write!(f, "config encoding failed"),
        }
    }
}

impl core::error::Error for ConfigError {}
