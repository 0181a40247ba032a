//! RAW format export for game engine compatibility.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::png::quantize;
use super::ExportError;
use crate::terrain::Heightfield;

/// RAW export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    /// 16-bit unsigned integer, little-endian.
    #[default]
    R16LittleEndian,
    /// 16-bit unsigned integer, big-endian.
    R16BigEndian,
    /// 32-bit float, little-endian. Heights are written unscaled.
    R32Float,
}

/// Exports the interior of a heightfield as a RAW heightmap.
///
/// # Arguments
/// * `field` - The heightfield to export
/// * `path` - Output file path
/// * `format` - RAW format (R16 or R32)
/// * `min_height` - Minimum height for normalization (R16 only)
/// * `max_height` - Maximum height for normalization (R16 only)
pub fn export_heightfield_raw(
    field: &Heightfield,
    path: &Path,
    format: RawFormat,
    min_height: f32,
    max_height: f32,
) -> Result<(), ExportError> {
    if format != RawFormat::R32Float && min_height >= max_height {
        return Err(ExportError::InvalidHeightRange(min_height, max_height));
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let range = max_height - min_height;

    for height in field.interior() {
        match format {
            RawFormat::R16LittleEndian => {
                writer.write_all(&quantize(height, min_height, range).to_le_bytes())?
            }
            RawFormat::R16BigEndian => {
                writer.write_all(&quantize(height, min_height, range).to_be_bytes())?
            }
            RawFormat::R32Float => writer.write_all(&height.to_le_bytes())?,
        }
    }

    writer.flush()?;
    Ok(())
}

/// Returns the expected file size for a RAW export of a `map_size` interior.
pub fn expected_file_size(map_size: u32, format: RawFormat) -> u64 {
    let pixels = (map_size as u64) * (map_size as u64);
    match format {
        RawFormat::R16LittleEndian | RawFormat::R16BigEndian => pixels * 2,
        RawFormat::R32Float => pixels * 4,
    }
}
