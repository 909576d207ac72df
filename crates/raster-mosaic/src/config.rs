//! Configuration for the mosaic engine and pyramid builder.

use crate::buffer::SampleScaling;
use crate::error::{MosaicError, Result};
use crate::resample::ResampleMethod;
use serde::{Deserialize, Serialize};

/// Configuration for the mosaic engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MosaicConfig {
    /// Memory budget for the tile cache in megabytes.
    pub tile_cache_size_mb: usize,

    /// Interpolation used when a source's resolution differs from the
    /// destination grid.
    pub resample: ResampleMethod,

    /// Per-coverage scale/offset applied by 16/32-bit conversions.
    pub scaling: SampleScaling,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            tile_cache_size_mb: 512,
            resample: ResampleMethod::Nearest,
            scaling: SampleScaling::default(),
        }
    }
}

impl MosaicConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TILE_CACHE_SIZE_MB") {
            if let Ok(size) = val.parse() {
                config.tile_cache_size_mb = size;
            }
        }

        if let Ok(val) = std::env::var("MOSAIC_RESAMPLE") {
            config.resample = ResampleMethod::from_str(&val);
        }

        if let Ok(val) = std::env::var("COVERAGE_SAMPLE_SCALE") {
            if let Ok(scale) = val.parse() {
                config.scaling.scale = scale;
            }
        }

        if let Ok(val) = std::env::var("COVERAGE_SAMPLE_OFFSET") {
            if let Ok(offset) = val.parse() {
                config.scaling.offset = offset;
            }
        }

        config
    }

    /// Load per-coverage configuration from a JSON document (the
    /// successor of the legacy properties resource that carried the
    /// scale/offset pair).
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| MosaicError::config(err.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.tile_cache_size_mb == 0 {
            return Err(MosaicError::config("tile_cache_size_mb must be > 0"));
        }
        if !(self.scaling.scale.is_finite() && self.scaling.scale != 0.0) {
            return Err(MosaicError::config(format!(
                "sample scale must be finite and nonzero, got {}",
                self.scaling.scale
            )));
        }
        if !self.scaling.offset.is_finite() {
            return Err(MosaicError::config(format!(
                "sample offset must be finite, got {}",
                self.scaling.offset
            )));
        }
        Ok(())
    }

    /// Get the tile cache size in bytes.
    pub fn tile_cache_size_bytes(&self) -> usize {
        self.tile_cache_size_mb * 1024 * 1024
    }
}

/// Configuration for multi-resolution pyramid builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PyramidConfig {
    /// Number of levels to build; 0 derives the count from
    /// `min_dimension`.
    pub levels: u32,

    /// When deriving the level count, stop once the smaller dimension of
    /// a level falls below this value.
    pub min_dimension: usize,

    /// Resolution factor between consecutive levels (typically 2).
    pub scale_step: u32,

    /// Output tile width/height in pixels.
    pub tile_size: u32,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            levels: 0,
            min_dimension: 256,
            scale_step: 2,
            tile_size: 512,
        }
    }
}

impl PyramidConfig {
    /// Load pyramid configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PYRAMID_LEVELS") {
            if let Ok(levels) = val.parse() {
                config.levels = levels;
            }
        }

        if let Ok(val) = std::env::var("PYRAMID_MIN_DIMENSION") {
            if let Ok(size) = val.parse() {
                config.min_dimension = size;
            }
        }

        if let Ok(val) = std::env::var("PYRAMID_SCALE_STEP") {
            if let Ok(step) = val.parse() {
                config.scale_step = step;
            }
        }

        if let Ok(val) = std::env::var("PYRAMID_TILE_SIZE") {
            if let Ok(size) = val.parse() {
                config.tile_size = size;
            }
        }

        config
    }

    /// Validate the pyramid configuration.
    pub fn validate(&self) -> Result<()> {
        if self.min_dimension == 0 {
            return Err(MosaicError::config("pyramid min_dimension must be > 0"));
        }
        if self.scale_step < 2 {
            return Err(MosaicError::config("pyramid scale_step must be >= 2"));
        }
        if self.tile_size == 0 {
            return Err(MosaicError::config("pyramid tile_size must be > 0"));
        }
        Ok(())
    }

    /// Number of levels a build would produce for a base raster of the
    /// given pixel size, including level 0.
    pub fn num_levels(&self, base_width: u32, base_height: u32) -> u32 {
        if self.levels > 0 {
            return self.levels;
        }

        let mut levels = 1;
        let mut w = base_width as usize;
        let mut h = base_height as usize;
        loop {
            w /= self.scale_step as usize;
            h /= self.scale_step as usize;
            if w.min(h) < self.min_dimension {
                break;
            }
            levels += 1;
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MosaicConfig::default();
        assert_eq!(config.tile_cache_size_mb, 512);
        assert_eq!(config.resample, ResampleMethod::Nearest);
        assert_eq!(config.scaling, SampleScaling::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = MosaicConfig::default();
        config.tile_cache_size_mb = 0;
        assert!(config.validate().is_err());

        config = MosaicConfig::default();
        config.scaling.scale = 0.0;
        assert!(config.validate().is_err());

        config = MosaicConfig::default();
        config.scaling.offset = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_json() {
        let config = MosaicConfig::from_json_str(
            r#"{
                "tile_cache_size_mb": 256,
                "resample": "bilinear",
                "scaling": { "scale": 10.0, "offset": 100.0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.tile_cache_size_mb, 256);
        assert_eq!(config.resample, ResampleMethod::Bilinear);
        assert_eq!(config.scaling.scale, 10.0);
        assert_eq!(config.scaling.offset, 100.0);

        assert!(MosaicConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_pyramid_validation() {
        let mut config = PyramidConfig::default();
        assert!(config.validate().is_ok());

        config.scale_step = 1;
        assert!(config.validate().is_err());

        config = PyramidConfig::default();
        config.tile_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_num_levels_derived() {
        let config = PyramidConfig {
            levels: 0,
            min_dimension: 256,
            scale_step: 2,
            tile_size: 512,
        };

        // 2048 -> 1024 -> 512 -> 256, stops before 128
        assert_eq!(config.num_levels(2048, 2048), 4);
        // fixed level count wins when set
        let fixed = PyramidConfig {
            levels: 2,
            ..config
        };
        assert_eq!(fixed.num_levels(2048, 2048), 2);
    }
}
