//! `[image]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [image]
//! optimize = true                                   # Production builds only
//! png = ["optipng", "-o7", "-strip", "all", "-quiet"]
//! jpeg = ["jpegoptim", "--strip-all", "--max=80", "--quiet"]
//! gif = ["gifsicle", "--optimize=3", "--batch"]
//!
//! [image.webp]
//! quality = 70
//! encoder = "builtin"   # builtin (lossless) | cwebp
//!
//! [image.avif]
//! quality = 60
//! speed = 6
//! ```
//!
//! Optimizer commands receive the output file path as their last argument
//! and must rewrite it in place. An empty command leaves that format as a
//! plain copy. SVG is always optimized in-process.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Run optimizers in production mode.
    pub optimize: bool,
    pub png: Vec<String>,
    pub jpeg: Vec<String>,
    pub gif: Vec<String>,
    pub webp: WebpConfig,
    pub avif: AvifConfig,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            optimize: true,
            png: ["optipng", "-o7", "-strip", "all", "-quiet"]
                .map(String::from)
                .to_vec(),
            jpeg: ["jpegoptim", "--strip-all", "--max=80", "--quiet"]
                .map(String::from)
                .to_vec(),
            gif: ["gifsicle", "--optimize=3", "--batch"]
                .map(String::from)
                .to_vec(),
            webp: WebpConfig::default(),
            avif: AvifConfig::default(),
        }
    }
}

/// WebP encoding backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebpEncoder {
    /// In-process lossless encoder; `quality` is ignored.
    #[default]
    Builtin,
    /// External `cwebp`, honours `quality`.
    Cwebp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebpConfig {
    pub quality: u8,
    pub encoder: WebpEncoder,
}

impl Default for WebpConfig {
    fn default() -> Self {
        Self {
            quality: 70,
            encoder: WebpEncoder::Builtin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvifConfig {
    pub quality: f32,
    /// Encoder speed, 1 (slowest) to 10 (fastest).
    pub speed: u8,
}

impl Default for AvifConfig {
    fn default() -> Self {
        Self {
            quality: 60.0,
            speed: 6,
        }
    }
}

impl ImageConfig {
    pub const PNG: FieldPath = FieldPath::new("image.png");
    pub const JPEG: FieldPath = FieldPath::new("image.jpeg");
    pub const GIF: FieldPath = FieldPath::new("image.gif");
    pub const WEBP_QUALITY: FieldPath = FieldPath::new("image.webp.quality");
    pub const WEBP_ENCODER: FieldPath = FieldPath::new("image.webp.encoder");
    pub const AVIF_QUALITY: FieldPath = FieldPath::new("image.avif.quality");
    pub const AVIF_SPEED: FieldPath = FieldPath::new("image.avif.speed");

    /// Optimizer command for an image extension, if one is configured.
    pub fn optimizer_for(&self, ext: &str) -> Option<&[String]> {
        let cmd = match ext {
            "png" => &self.png,
            "jpg" | "jpeg" => &self.jpeg,
            "gif" => &self.gif,
            _ => return None,
        };
        (!cmd.is_empty()).then_some(cmd.as_slice())
    }

    /// Validate image configuration.
    ///
    /// Missing optimizer tools only warn: the `img` task fails on its own
    /// when it actually needs them, without affecting sibling tasks.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.optimize {
            for (field, cmd) in [
                (Self::PNG, &self.png),
                (Self::JPEG, &self.jpeg),
                (Self::GIF, &self.gif),
            ] {
                if let Some(program) = cmd.first()
                    && which::which(program).is_err()
                {
                    diag.warn(field, format!("`{program}` not found, `img` will fail in production"));
                }
            }
        }

        if self.webp.quality > 100 {
            diag.error(Self::WEBP_QUALITY, "must be between 0 and 100");
        }
        if self.webp.encoder == WebpEncoder::Cwebp && which::which("cwebp").is_err() {
            diag.error_with_hint(
                Self::WEBP_ENCODER,
                "`cwebp` not found",
                "install libwebp tools or use encoder = \"builtin\"",
            );
        }
        if !(1.0..=100.0).contains(&self.avif.quality) {
            diag.error(Self::AVIF_QUALITY, "must be between 1 and 100");
        }
        if !(1..=10).contains(&self.avif.speed) {
            diag.error(Self::AVIF_SPEED, "must be between 1 and 10");
        }
    }
}
