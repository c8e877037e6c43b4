use crate::backup::compress::CompressorBuilder;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::result_error::result::Result;
use bon::Builder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, OnceLock};
use validator::Validate;

/// Default compression level, same as the `gzip` command line tool
pub static DEFAULT_COMPRESSION_LEVEL: u32 = 6;

static GZ_FILE_EXT: OnceLock<Arc<str>> = OnceLock::new();

/// Configuration for gzip compression of finished dumps
#[derive(Clone, Copy, Default, Validate, Serialize, Deserialize, Debug, Builder, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GzipConfig {
    /// Compression level (0-9)
    ///
    /// - 0: No compression, gzip framing only
    /// - 6: Default
    /// - 9: Slowest, smallest files
    #[validate(range(min = 0, max = 9))]
    level: Option<u32>,
}

impl GzipConfig {
    pub fn level(&self) -> u32 {
        self.level.unwrap_or(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl<W: Write> CompressorBuilder<W> for GzipConfig {
    type Compressor = GzEncoder<W>;

    fn build_compressor(&self, writer: W) -> Result<GzEncoder<W>> {
        self.validate()?;
        tracing::debug!("Creating gzip compressor with level={}", self.level());
        Ok(GzEncoder::new(writer, Compression::new(self.level())))
    }
}

impl FileExtProvider for GzipConfig {
    fn file_ext(&self) -> Option<Arc<str>> {
        Some(GZ_FILE_EXT.get_or_init(|| "gz".into()).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::finish::Finish;
    use flate2::read::GzDecoder;
    use std::io::{Cursor, Read};

    #[test]
    fn test_gzip_config_default() {
        let config = GzipConfig::default();
        assert_eq!(config.level(), DEFAULT_COMPRESSION_LEVEL);
        assert!(config.validate().is_ok());
        assert_eq!(config.file_ext().unwrap().as_ref(), "gz");
    }

    #[test]
    fn test_gzip_config_validation() {
        for level in [0, 1, 6, 9] {
            assert!(GzipConfig::builder().level(level).build().validate().is_ok());
        }
        assert!(GzipConfig::builder().level(10).build().validate().is_err());
    }

    #[test]
    fn test_build_compressor_rejects_invalid_level() {
        let config = GzipConfig::builder().level(12).build();
        assert!(config.build_compressor(Cursor::new(Vec::new())).is_err());
    }

    #[test]
    fn test_compress_round_trip() {
        let data = b"CREATE TABLE orders (id int);\nINSERT INTO orders VALUES (1);\n".repeat(100);
        let mut encoder = GzipConfig::builder()
            .level(9)
            .build()
            .build_compressor(Vec::new())
            .unwrap();
        encoder.write_all(&data).unwrap();
        let compressed = Finish::finish(encoder).unwrap();
        assert!(compressed.len() < data.len());

        let mut decompressed = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut decompressed)
            .unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_gzip_config_deserialize() {
        let config: GzipConfig = serde_yml::from_str("level: 3").unwrap();
        assert_eq!(config.level(), 3);
        assert!(serde_yml::from_str::<GzipConfig>("levle: 3").is_err());
    }
}
