//! Glyph outline rasterization.
//!
//! The builder talks to the font engine only through [`GlyphRasterizer`] and
//! [`RasterFace`]. [`SwashRasterizer`] is the production backend: it validates
//! faces with `ttf-parser` and scales, hints, styles and renders outlines with
//! `swash`.
//!
//! # Sizing
//!
//! Faces are opened with a "real dimension" size request: the requested pixel
//! size is the total height from descender to ascender, not a nominal em size.
//! The em size used for scaling is therefore
//! `size_pixels * units_per_em / (ascender - descender)`.
//!
//! # Example
//!
//! ```no_run
//! use horizon_lattice_atlas::{FontSource, GlyphRasterizer, RasterFace, SwashRasterizer};
//!
//! let source = FontSource::from_file("fonts/Inter-Regular.ttf", 16.0)?;
//! let mut rasterizer = SwashRasterizer::new();
//! let mut face = rasterizer.open_face(&source, 0)?;
//!
//! if let Some(glyph) = face.rasterize('A' as u32)? {
//!     println!("{}x{} advance {}", glyph.width(), glyph.height(), glyph.advance_x);
//! }
//! # Ok::<(), horizon_lattice_atlas::AtlasError>(())
//! ```

use std::sync::Arc;

use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::{Angle, Format, Transform};
use swash::{CacheKey, FontRef};
use tracing::{debug, warn};

use crate::error::{AtlasError, AtlasResult};
use crate::source::{FontSource, HintingMode};

/// Largest bitmap width or height a single glyph may rasterize to.
pub const MAX_GLYPH_BITMAP_SIZE: u32 = 256;

/// Slant applied by synthetic oblique, in degrees.
const OBLIQUE_DEGREES: f32 = 12.0;

/// Faux bold stroke width as a fraction of the em size.
const EMBOLDEN_EM_FRACTION: f32 = 1.0 / 24.0;

/// Per-face vertical and horizontal extents in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceMetrics {
    /// Distance from the baseline to the top of the face, rounded up.
    pub ascender: f32,
    /// Distance from the baseline to the bottom of the face, rounded down (typically negative).
    pub descender: f32,
    /// Largest advance of any glyph, rounded up.
    pub max_advance_width: f32,
}

impl FaceMetrics {
    /// Full vertical extent (`ascender - descender`).
    pub fn height(&self) -> f32 {
        self.ascender - self.descender
    }
}

/// Outline load options resolved from a [`FontSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadFlags {
    /// Hinting mode.
    pub hinting: HintingMode,
    /// Auto-hinter requested.
    pub force_autohint: bool,
    /// Auto-hinter disabled.
    pub no_autohint: bool,
    /// Embedded bitmap strikes are ignored; outlines are always rendered.
    pub no_bitmap: bool,
}

impl LoadFlags {
    /// Resolve the load flags for a source.
    pub fn from_source(source: &FontSource) -> Self {
        Self {
            hinting: source.hinting(),
            force_autohint: source.force_autohint(),
            no_autohint: source.no_autohint(),
            no_bitmap: true,
        }
    }
}

/// An 8-bit coverage bitmap with an explicit row stride.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverageBitmap {
    width: u32,
    height: u32,
    pitch: u32,
    data: Vec<u8>,
}

impl CoverageBitmap {
    /// Wrap raw coverage bytes.
    ///
    /// Returns `None` if `pitch < width` or `data` is too short to hold
    /// `height` rows of `pitch` bytes (the last row only needs `width`).
    pub fn new(width: u32, height: u32, pitch: u32, data: Vec<u8>) -> Option<Self> {
        if pitch < width {
            return None;
        }
        let required = if height == 0 || width == 0 {
            0
        } else {
            (height as usize - 1) * pitch as usize + width as usize
        };
        if data.len() < required {
            return None;
        }
        Some(Self {
            width,
            height,
            pitch,
            data,
        })
    }

    /// Wrap tightly packed rows (`pitch == width`), zero-filling a short buffer.
    pub fn from_packed(width: u32, height: u32, mut data: Vec<u8>) -> Self {
        data.resize(width as usize * height as usize, 0);
        Self {
            width,
            height,
            pitch: width,
            data,
        }
    }

    /// A zero-sized bitmap, as produced by whitespace glyphs.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of consecutive rows.
    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    /// Raw bytes, including any row padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the bitmap covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Coverage of one row, `width` bytes long.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch as usize;
        &self.data[start..start + self.width as usize]
    }

    /// Iterate the rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let rows = if self.is_empty() { 0 } else { self.height };
        (0..rows).map(move |y| self.row(y))
    }
}

/// The result of rasterizing one codepoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    /// Offset from the pen origin to the bitmap's left edge.
    pub bearing_x: f32,
    /// Offset from the baseline down to the bitmap's top edge (negative above the baseline).
    pub bearing_y: f32,
    /// Horizontal advance in pixels.
    pub advance_x: f32,
    /// Coverage bitmap.
    pub bitmap: CoverageBitmap,
}

impl RasterizedGlyph {
    /// Bitmap width in pixels.
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// Bitmap height in pixels.
    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// Fail if the bitmap exceeds [`MAX_GLYPH_BITMAP_SIZE`] in either dimension.
    pub fn check_bounds(&self, codepoint: u32) -> AtlasResult<()> {
        if self.width() > MAX_GLYPH_BITMAP_SIZE || self.height() > MAX_GLYPH_BITMAP_SIZE {
            return Err(AtlasError::GlyphTooLarge {
                codepoint,
                width: self.width(),
                height: self.height(),
                max: MAX_GLYPH_BITMAP_SIZE,
            });
        }
        Ok(())
    }
}

/// A font engine able to open faces for rasterization.
pub trait GlyphRasterizer {
    /// Per-source face state.
    type Face: RasterFace;

    /// Open the face described by `source`.
    ///
    /// `index` is the source's position in the build and is only used for
    /// error reporting.
    fn open_face(&mut self, source: &FontSource, index: usize) -> AtlasResult<Self::Face>;
}

/// An opened face at a fixed pixel size and style.
pub trait RasterFace {
    /// Extents of the face at its opened size.
    fn metrics(&self) -> FaceMetrics;

    /// Rasterize one codepoint.
    ///
    /// Returns `Ok(None)` when the face has no glyph for the codepoint. A glyph
    /// without an outline (such as a space) is returned with an empty bitmap.
    fn rasterize(&mut self, codepoint: u32) -> AtlasResult<Option<RasterizedGlyph>>;
}

/// Rasterizer backed by `swash`.
#[derive(Default)]
pub struct SwashRasterizer {
    opened: usize,
}

impl SwashRasterizer {
    /// Create a new rasterizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of faces opened so far.
    pub fn faces_opened(&self) -> usize {
        self.opened
    }
}

impl std::fmt::Debug for SwashRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwashRasterizer")
            .field("opened", &self.opened)
            .finish()
    }
}

impl GlyphRasterizer for SwashRasterizer {
    type Face = SwashFace;

    fn open_face(&mut self, source: &FontSource, index: usize) -> AtlasResult<SwashFace> {
        let face = SwashFace::open(source, index)?;
        self.opened += 1;
        Ok(face)
    }
}

/// A face opened by [`SwashRasterizer`].
pub struct SwashFace {
    data: Arc<[u8]>,
    offset: u32,
    key: CacheKey,
    ppem: f32,
    metrics: FaceMetrics,
    flags: LoadFlags,
    bold: bool,
    oblique: bool,
    context: ScaleContext,
}

impl SwashFace {
    fn open(source: &FontSource, index: usize) -> AtlasResult<Self> {
        let size = source.size_pixels();
        if !size.is_finite() || size <= 0.0 {
            return Err(AtlasError::InvalidPixelSize { index, size });
        }

        let data = source.shared_data().clone();
        let face_index = source.face_index();
        let face_count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        if face_index >= face_count {
            return Err(AtlasError::FaceIndexOutOfRange { index, face_count });
        }

        let face = ttf_parser::Face::parse(&data, face_index).map_err(|e| {
            AtlasError::InvalidFontData {
                index,
                reason: e.to_string(),
            }
        })?;

        let has_unicode_cmap = face
            .tables()
            .cmap
            .is_some_and(|cmap| cmap.subtables.into_iter().any(|sub| sub.is_unicode()));
        if !has_unicode_cmap {
            return Err(AtlasError::NoUnicodeCharmap { index });
        }

        let units_per_em = face.units_per_em() as f32;
        let ascender_units = face.ascender() as f32;
        let descender_units = face.descender() as f32;
        let design_height = ascender_units - descender_units;
        if design_height <= 0.0 || units_per_em <= 0.0 {
            return Err(AtlasError::InvalidFontData {
                index,
                reason: "face has no vertical extent".to_string(),
            });
        }

        let ppem = size * units_per_em / design_height;
        let scale = size / design_height;

        let font = FontRef::from_index(&data, face_index as usize).ok_or_else(|| {
            AtlasError::InvalidFontData {
                index,
                reason: "swash could not locate the face".to_string(),
            }
        })?;
        let max_width = font.metrics(&[]).scale(ppem).max_width;

        let metrics = FaceMetrics {
            ascender: (ascender_units * scale).ceil(),
            descender: (descender_units * scale).floor(),
            max_advance_width: max_width.ceil(),
        };
        let (offset, key) = (font.offset, font.key);

        let flags = LoadFlags::from_source(source);
        if flags.force_autohint || flags.no_autohint {
            warn!(
                target: "horizon_lattice_atlas::rasterizer",
                source = index,
                "auto-hinter flags are not supported by the swash backend; ignoring"
            );
        }

        debug!(
            target: "horizon_lattice_atlas::rasterizer",
            source = index,
            name = source.name().unwrap_or("<unnamed>"),
            size,
            ppem,
            ascender = metrics.ascender,
            descender = metrics.descender,
            max_advance = metrics.max_advance_width,
            "opened face"
        );

        Ok(Self {
            data,
            offset,
            key,
            ppem,
            metrics,
            flags,
            bold: source.bold(),
            oblique: source.oblique(),
            context: ScaleContext::new(),
        })
    }

    /// Em size the outlines are scaled to.
    pub fn ppem(&self) -> f32 {
        self.ppem
    }

    /// Resolved load flags.
    pub fn load_flags(&self) -> LoadFlags {
        self.flags
    }

    fn embolden_strength(&self) -> f32 {
        self.ppem * EMBOLDEN_EM_FRACTION
    }
}

impl RasterFace for SwashFace {
    fn metrics(&self) -> FaceMetrics {
        self.metrics
    }

    fn rasterize(&mut self, codepoint: u32) -> AtlasResult<Option<RasterizedGlyph>> {
        let font = FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        };

        let glyph_id = font.charmap().map(codepoint);
        if glyph_id == 0 {
            return Ok(None);
        }

        let hinted = self.flags.hinting.is_hinted();
        let strength = self.embolden_strength();
        let mut advance = font
            .glyph_metrics(&[])
            .scale(self.ppem)
            .advance_width(glyph_id);

        let mut scaler = self
            .context
            .builder(font)
            .size(self.ppem)
            .hint(hinted)
            .build();

        let mut render = Render::new(&[Source::Outline]);
        render.format(Format::Alpha);
        if self.bold {
            render.embolden(strength);
            advance = emboldened_advance(advance, strength);
        }
        if self.oblique {
            render.transform(Some(Transform::skew(
                Angle::from_degrees(OBLIQUE_DEGREES),
                Angle::from_degrees(0.0),
            )));
        }

        let glyph = match render.render(&mut scaler, glyph_id) {
            Some(image) if image.placement.width > 0 && image.placement.height > 0 => {
                let width = image.placement.width;
                let height = image.placement.height;
                let mut data = image.data;
                if self.flags.hinting == HintingMode::Mono {
                    threshold_mono(&mut data);
                }
                let bitmap = CoverageBitmap::from_packed(width, height, data);
                RasterizedGlyph {
                    bearing_x: image.placement.left as f32,
                    bearing_y: -(image.placement.top as f32),
                    advance_x: advance_from_26_6(to_26_6(advance), hinted),
                    bitmap,
                }
            }
            _ => RasterizedGlyph {
                bearing_x: 0.0,
                bearing_y: 0.0,
                advance_x: advance_from_26_6(to_26_6(advance), hinted),
                bitmap: CoverageBitmap::empty(),
            },
        };

        glyph.check_bounds(codepoint)?;
        Ok(Some(glyph))
    }
}

impl std::fmt::Debug for SwashFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwashFace")
            .field("ppem", &self.ppem)
            .field("metrics", &self.metrics)
            .field("flags", &self.flags)
            .field("bold", &self.bold)
            .field("oblique", &self.oblique)
            .field("embolden_strength", &self.embolden_strength())
            .finish_non_exhaustive()
    }
}

/// Convert pixels to 26.6 fixed point.
fn to_26_6(value: f32) -> i32 {
    (value * 64.0).round() as i32
}

/// Convert a 26.6 advance back to pixels, snapping to whole pixels when hinted.
fn advance_from_26_6(advance: i32, hinted: bool) -> f32 {
    let advance = if hinted { (advance + 32) & !63 } else { advance };
    advance as f32 * (1.0 / 64.0)
}

/// Widen a non-zero advance by the faux bold stroke.
fn emboldened_advance(advance: f32, strength: f32) -> f32 {
    if advance != 0.0 {
        advance + strength
    } else {
        advance
    }
}

/// Collapse coverage to fully on or off.
fn threshold_mono(data: &mut [u8]) {
    for value in data.iter_mut() {
        *value = if *value >= 128 { 255 } else { 0 };
    }
}
