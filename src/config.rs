//! Application settings.

use crate::engine::OutputEncoding;
use crate::session::Scale;

/// Largest file accepted by intake: 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Settings shared by intake, the orchestrator and export.
///
/// Nothing here is persisted; front-ends start from [`Config::default()`] and
/// override individual fields.
#[derive(Debug, Clone)]
pub struct Config {
    /// Product name used as the export file name prefix.
    pub product_name: String,
    /// Intake size ceiling in bytes (inclusive).
    pub max_file_size: u64,
    /// Spatial tile size handed to the engine.
    pub patch_size: u32,
    /// Tile overlap handed to the engine.
    pub padding: u32,
    /// Scale selected when a session starts.
    pub default_scale: Scale,
    /// Pixel layout requested from the engine.
    pub output: OutputEncoding,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product_name: "pixelboost".to_string(),
            max_file_size: MAX_FILE_SIZE,
            patch_size: 64,
            padding: 2,
            default_scale: Scale::X2,
            output: OutputEncoding::Rgba8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.product_name, "pixelboost");
        assert_eq!(config.max_file_size, 10_485_760);
        assert_eq!(config.patch_size, 64);
        assert_eq!(config.padding, 2);
        assert_eq!(config.default_scale, Scale::X2);
        assert_eq!(config.output, OutputEncoding::Rgba8);
    }
}
