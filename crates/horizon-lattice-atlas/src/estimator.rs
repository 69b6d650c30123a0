//! Texture size estimation.
//!
//! Exact glyph sizes are only known after rasterization, but the packer needs
//! fixed texture dimensions up front. The estimate assumes every glyph is as
//! large as the largest face's max advance by its full height, plus one pixel
//! of padding each way, and rounds the height up to a power of two.

use tracing::debug;

use crate::error::{AtlasError, AtlasResult};

/// Padding added to each glyph cell in both directions.
const CELL_PADDING: f32 = 1.0;

/// Width/glyph-count thresholds, largest first.
const WIDTH_THRESHOLDS: [(usize, u32); 3] = [(4000, 4096), (2000, 2048), (1000, 1024)];

/// Width used when the glyph count is at or below every threshold.
const MIN_TEXTURE_WIDTH: u32 = 512;

/// Texture dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Chooses texture dimensions before any glyph is rasterized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeEstimator {
    desired_width: Option<u32>,
    max_glyph_width: f32,
    max_glyph_height: f32,
}

impl Default for SizeEstimator {
    fn default() -> Self {
        Self {
            desired_width: None,
            max_glyph_width: 1.0,
            max_glyph_height: 1.0,
        }
    }
}

impl SizeEstimator {
    /// Create an estimator with a 1x1 minimum glyph footprint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed texture width instead of the glyph-count lookup.
    ///
    /// A width of zero is treated as "no preference".
    pub fn with_desired_width(mut self, width: Option<u32>) -> Self {
        self.desired_width = width.filter(|&w| w > 0);
        self
    }

    /// Grow the maximum glyph footprint to cover a face.
    pub fn include_face(&mut self, max_advance_width: f32, height: f32) {
        self.max_glyph_width = self.max_glyph_width.max(max_advance_width);
        self.max_glyph_height = self.max_glyph_height.max(height);
    }

    /// The largest glyph footprint seen so far, as (width, height).
    pub fn max_glyph_size(&self) -> (f32, f32) {
        (self.max_glyph_width, self.max_glyph_height)
    }

    /// Texture width for a glyph count.
    pub fn width_for(&self, glyph_count: usize) -> u32 {
        if let Some(width) = self.desired_width {
            return width;
        }
        WIDTH_THRESHOLDS
            .iter()
            .find(|(threshold, _)| glyph_count > *threshold)
            .map_or(MIN_TEXTURE_WIDTH, |&(_, width)| width)
    }

    /// Power-of-two height able to hold `rect_count` maximum-size cells at `width`.
    ///
    /// Only whole cells count towards a row. Returns `None` when the height
    /// does not fit in a `u32`.
    pub fn height_for(&self, width: u32, rect_count: usize) -> Option<u32> {
        let rects_per_row = (width as f64 / (self.max_glyph_width as f64 + CELL_PADDING as f64))
            .floor()
            .max(1.0);
        let rows = (rect_count as f64 / rects_per_row).ceil();
        let height = rows * (self.max_glyph_height as f64 + CELL_PADDING as f64);
        if !height.is_finite() || height > u32::MAX as f64 {
            return None;
        }
        (height as u32).checked_next_power_of_two()
    }

    /// Estimate the texture for `glyph_count` glyphs plus `reserved_count` custom regions.
    pub fn estimate(
        &self,
        glyph_count: usize,
        reserved_count: usize,
    ) -> AtlasResult<TextureDimensions> {
        let width = self.width_for(glyph_count);
        let rect_count = glyph_count.saturating_add(reserved_count);
        let height = self
            .height_for(width, rect_count)
            .ok_or(AtlasError::TextureTooLarge { width, rect_count })?;

        debug!(
            target: "horizon_lattice_atlas::estimator",
            glyph_count,
            reserved_count,
            max_glyph_width = self.max_glyph_width,
            max_glyph_height = self.max_glyph_height,
            width,
            height,
            "estimated texture size"
        );

        Ok(TextureDimensions { width, height })
    }
}
