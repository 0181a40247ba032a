//! Export module for moving heightfields in and out of images and files.
//!
//! Supports 16-bit PNG for universal compatibility, RAW formats for game
//! engine imports, and in-memory float images for rendering collaborators.

pub mod image;
mod png;
mod raw;

use thiserror::Error;

use crate::error::ConfigError;

pub use self::image::{erode_image, load_heightfield, new_image, to_buffer, to_image, HeightImage};
pub use png::{export_heightfield_png, PngExportOptions};
pub use raw::{expected_file_size, export_heightfield_raw, RawFormat};

/// Errors that can occur while reading or writing heightfield files.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] ::image::ImageError),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f32, f32),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
