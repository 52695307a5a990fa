//! Configuration for the Zarr store.

use serde::{Deserialize, Serialize};

/// Chunking and compression of Zarr arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZarrStoreConfig {
    /// Chunk length along every fixed dimension. Record dimensions are
    /// always chunked by one record.
    pub chunk_size: usize,

    /// Compression codec for Zarr arrays.
    pub compression: ZarrCompression,

    /// Compression level (1-9).
    pub compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub shuffle: bool,
}

impl Default for ZarrStoreConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            compression: ZarrCompression::BloscZstd,
            compression_level: 1,
            shuffle: true,
        }
    }
}

impl ZarrStoreConfig {
    /// Uncompressed arrays with the default chunking.
    pub fn uncompressed() -> Self {
        Self {
            compression: ZarrCompression::None,
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ZARR_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION") {
            config.compression = ZarrCompression::parse(&val);
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ZARR_SHUFFLE") {
            config.shuffle = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.compression != ZarrCompression::None
            && (self.compression_level == 0 || self.compression_level > 9)
        {
            return Err("compression_level must be 1-9".to_string());
        }

        Ok(())
    }
}

/// Compression codec for Zarr arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZarrCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd (recommended).
    #[default]
    BloscZstd,
}

impl ZarrCompression {
    /// Parse from string (case-insensitive). Unknown names fall back to
    /// Blosc/Zstd.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" | "blosc_lz4" => Self::BloscLz4,
            _ => Self::BloscZstd,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_parse() {
        assert_eq!(ZarrCompression::parse("NONE"), ZarrCompression::None);
        assert_eq!(ZarrCompression::parse("lz4"), ZarrCompression::BloscLz4);
        assert_eq!(ZarrCompression::parse("whatever"), ZarrCompression::BloscZstd);
    }

    #[test]
    fn test_from_env() {
        let vars = [
            ("ZARR_CHUNK_SIZE", "64"),
            ("ZARR_COMPRESSION", "lz4"),
            ("ZARR_COMPRESSION_LEVEL", "7"),
            ("ZARR_SHUFFLE", "false"),
        ];
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
        let config = ZarrStoreConfig::from_env();
        assert_eq!(config.chunk_size, 64);
        assert_eq!(config.compression, ZarrCompression::BloscLz4);
        assert_eq!(config.compression_level, 7);
        assert!(!config.shuffle);

        // Unparsable numbers keep the defaults.
        std::env::set_var("ZARR_CHUNK_SIZE", "large");
        std::env::set_var("ZARR_COMPRESSION_LEVEL", "-1");
        let config = ZarrStoreConfig::from_env();
        assert_eq!(config.chunk_size, ZarrStoreConfig::default().chunk_size);
        assert_eq!(config.compression_level, ZarrStoreConfig::default().compression_level);

        for (name, _) in vars {
            std::env::remove_var(name);
        }
        let config = ZarrStoreConfig::from_env();
        assert_eq!(config.compression, ZarrCompression::BloscZstd);
        assert!(config.shuffle);
    }

    #[test]
    fn test_validate() {
        assert!(ZarrStoreConfig::default().validate().is_ok());
        assert!(ZarrStoreConfig { chunk_size: 0, ..Default::default() }.validate().is_err());
        assert!(ZarrStoreConfig { compression_level: 12, ..Default::default() }
            .validate()
            .is_err());
        assert!(ZarrStoreConfig { compression_level: 0, ..ZarrStoreConfig::uncompressed() }
            .validate()
            .is_ok());
    }
}
