//! `webp` and `avif`: convert raster images next to their originals.
//!
//! `src/img/photo.jpg` becomes `dist/img/photo.webp` / `dist/img/photo.avif`.
//! Outputs newer than their source are not re-encoded. When two sources
//! share a stem (`photo.jpg`, `photo.png`) the first in path order wins and
//! the others are recorded as failures.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use ravif::{Encoder, Img, RGBA8};
use rustc_hash::FxHashMap;

use super::output::{is_up_to_date, write_if_changed};
use super::{
    FileError, SourceFile, SourceSet, TaskContext, TaskId, TaskReport, process_files, slash_path,
};
use crate::config::{AvifConfig, WebpConfig, WebpEncoder};
use crate::utils::exec::Cmd;

pub const PATTERN: &str = "img/**/*.{jpg,jpeg,png}";

pub fn run_webp(ctx: &TaskContext) -> Result<TaskReport> {
    let webp = &ctx.config.image.webp;
    convert_all(ctx, TaskId::Webp, "webp", |file, dest| encode_webp(file, dest, webp))
}

pub fn run_avif(ctx: &TaskContext) -> Result<TaskReport> {
    let avif = &ctx.config.image.avif;
    convert_all(ctx, TaskId::Avif, "avif", |file, dest| {
        let image = decode(&file.path)?;
        let bytes = encode_avif(&image, avif).map_err(FileError::Skip)?;
        Ok(write_if_changed(dest, bytes)?)
    })
}

/// Shared driver: pick sources, skip fresh outputs, run `encode` on the rest.
///
/// `encode` writes `dest` and returns whether it changed.
fn convert_all<F>(ctx: &TaskContext, task: TaskId, ext: &str, encode: F) -> Result<TaskReport>
where
    F: Fn(&SourceFile, &Path) -> Result<bool, FileError> + Sync,
{
    let mut report = TaskReport::new(task);
    let layout = ctx.layout();
    let mut claimed: FxHashMap<PathBuf, PathBuf> = FxHashMap::default();
    let mut files = Vec::new();
    for file in SourceSet::new(ctx.src(), &[PATTERN])?.files()? {
        let dest = output_path(layout.root(), &file.rel, ext);
        match claimed.get(&dest) {
            Some(winner) => report.fail(
                ctx.config.root_relative(&file.path),
                format!(
                    "{} already converts to {}",
                    slash_path(winner),
                    slash_path(ctx.config.root_relative(&dest))
                ),
            ),
            None => {
                claimed.insert(dest, file.rel.clone());
                files.push(file);
            }
        }
    }

    process_files(ctx, &mut report, &files, |file| {
        let dest = output_path(layout.root(), &file.rel, ext);
        if is_up_to_date(&file.path, &dest) {
            return Ok(vec![(dest, false)]);
        }
        let changed = encode(file, &dest)?;
        Ok(vec![(dest, changed)])
    })?;

    Ok(report)
}

fn output_path(root: &Path, rel: &Path, ext: &str) -> PathBuf {
    root.join(rel).with_extension(ext)
}

fn decode(path: &Path) -> Result<DynamicImage, FileError> {
    image::open(path)
        .with_context(|| format!("cannot decode {}", path.display()))
        .map_err(FileError::Skip)
}

fn encode_webp(file: &SourceFile, dest: &Path, config: &WebpConfig) -> Result<bool, FileError> {
    match config.encoder {
        WebpEncoder::Builtin => {
            let image = decode(&file.path)?;
            let bytes = encode_webp_lossless(&image).map_err(FileError::Skip)?;
            Ok(write_if_changed(dest, bytes)?)
        }
        WebpEncoder::Cwebp => {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            Cmd::new("cwebp")
                .args(["-quiet", "-q", &config.quality.to_string()])
                .arg(&file.path)
                .arg("-o")
                .arg(dest)
                .run()
                .context("cwebp failed")?;
            Ok(true)
        }
    }
}

/// Lossless WebP via the `image` encoder.
fn encode_webp_lossless(image: &DynamicImage) -> Result<Vec<u8>> {
    let image = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::WebP)
        .context("WebP encoding failed")?;
    Ok(bytes)
}

fn encode_avif(image: &DynamicImage, config: &AvifConfig) -> Result<Vec<u8>> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels: Vec<RGBA8> = rgba
        .pixels()
        .map(|p| RGBA8::new(p[0], p[1], p[2], p[3]))
        .collect();

    let encoded = Encoder::new()
        .with_quality(config.quality)
        .with_alpha_quality(config.quality)
        .with_speed(config.speed)
        .encode_rgba(Img::new(pixels.as_slice(), width as usize, height as usize))
        .context("AVIF encoding failed")?;
    Ok(encoded.avif_file)
}
