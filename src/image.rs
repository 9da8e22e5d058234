//! Capability contract for the image decoders the transparency-split
//! pass consumes (spec §1: "only their capability contract ... is
//! consumed"; spec §9 redesign note: "define a trait-like interface").
//!
//! One real backend (`RasterImage`, built on the `image` crate, already
//! in the teacher's dependency graph) covers the ordinary raster
//! formats (`png`/`jpg`/`tga`/`bmp`). A second (`KtxImage`) models the
//! KTX2 path structurally: it parses just enough of the container
//! header to report dimensions and whether transcoding is needed,
//! without pulling in a transcoding dependency absent from the whole
//! example pack (see `DESIGN.md`).

use crate::error::{DalError, DalResult};

pub trait ImageSource {
    fn dimensions(&self) -> (u32, u32);

    /// Samples RGBA8 at pixel `(x, y)`, wrapping out-of-range
    /// coordinates (matches `original_source`'s `x % width`/`y %
    /// height` texel lookups in `modifier_scene.cpp`).
    fn sample_rgba8(&self, x: u32, y: u32) -> [u8; 4];

    fn needs_transcode(&self) -> bool {
        false
    }

    fn transcode_to_rgba8(&mut self) -> DalResult<()> {
        Ok(())
    }
}

pub struct RasterImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RasterImage {
    pub fn load_from_bytes(bytes: &[u8]) -> DalResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| DalError::Corrupted(format!("failed to decode image: {e}")))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
        })
    }

    pub fn load_from_path(path: &std::path::Path) -> DalResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }
}

impl ImageSource for RasterImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn sample_rgba8(&self, x: u32, y: u32) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0, 0, 0, 255];
        }
        let x = x % self.width;
        let y = y % self.height;
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }
}

/// Structural stand-in for a KTX2 container: reads the fixed 12-byte
/// magic plus the width/height/format fields of the level-0 header and
/// reports whether the pixel format needs transcoding to RGBA8, but
/// does not itself decode compressed texel data.
pub struct KtxImage {
    width: u32,
    height: u32,
    needs_transcode: bool,
    transcoded: Option<RasterImage>,
}

const KTX2_MAGIC: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

impl KtxImage {
    pub fn parse_header(bytes: &[u8]) -> DalResult<Self> {
        if bytes.len() < 48 || bytes[0..12] != KTX2_MAGIC {
            return Err(DalError::MagicMismatch);
        }
        let vk_format = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
        let width = u32::from_le_bytes(bytes[20..24].try_into().unwrap());
        let height = u32::from_le_bytes(bytes[24..28].try_into().unwrap());
        // vk_format == 0 means the container is a supercompressed /
        // block-compressed format that must be transcoded before RGBA8
        // texel access is possible.
        Ok(Self {
            width,
            height,
            needs_transcode: vk_format == 0,
            transcoded: None,
        })
    }
}

impl ImageSource for KtxImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn sample_rgba8(&self, x: u32, y: u32) -> [u8; 4] {
        match &self.transcoded {
            Some(img) => img.sample_rgba8(x, y),
            None => [0, 0, 0, 255],
        }
    }

    fn needs_transcode(&self) -> bool {
        self.needs_transcode
    }

    fn transcode_to_rgba8(&mut self) -> DalResult<()> {
        Err(DalError::ResourceNotSupported(
            "KTX transcoding is not implemented; supply a pre-transcoded RGBA8 source".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_image_samples_wrap_out_of_range_coords() {
        let img = RasterImage {
            width: 2,
            height: 2,
            rgba: vec![
                255, 0, 0, 255, // (0,0)
                0, 255, 0, 255, // (1,0)
                0, 0, 255, 255, // (0,1)
                255, 255, 0, 255, // (1,1)
            ],
        };
        assert_eq!(img.sample_rgba8(0, 0), [255, 0, 0, 255]);
        assert_eq!(img.sample_rgba8(2, 0), [255, 0, 0, 255]); // wraps
    }

    #[test]
    fn ktx_header_rejects_bad_magic() {
        let bytes = vec![0u8; 64];
        assert!(matches!(
            KtxImage::parse_header(&bytes),
            Err(DalError::MagicMismatch)
        ));
    }
}
