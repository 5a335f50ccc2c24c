use std::fmt;

/// Build mode, threaded into every task through `TaskContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    /// Write source maps for style and script bundles into `maps/`.
    pub source_maps: bool,

    /// Run image optimizers on copied images.
    pub optimize_images: bool,
}

impl BuildMode {
    /// Production mode: optimized output without debug metadata.
    pub const PRODUCTION: Self = Self {
        source_maps: false,
        optimize_images: true,
    };

    /// Development mode: source maps, no image compression.
    pub const DEVELOPMENT: Self = Self {
        source_maps: true,
        optimize_images: false,
    };

    /// Check if this is development mode.
    #[inline]
    pub const fn is_dev(&self) -> bool {
        self.source_maps
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_dev() { "development" } else { "production" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes() {
        assert!(BuildMode::DEVELOPMENT.is_dev());
        assert!(!BuildMode::DEVELOPMENT.optimize_images);
        assert!(!BuildMode::PRODUCTION.is_dev());
        assert!(BuildMode::PRODUCTION.optimize_images);
        assert_eq!(BuildMode::PRODUCTION.to_string(), "production");
    }
}
