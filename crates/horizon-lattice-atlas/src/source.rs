//! Font source configuration.
//!
//! A [`FontSource`] describes one font to bake into an atlas: the raw font
//! bytes, which face to open, the pixel size, styling, and which codepoints to
//! rasterize. Sources are immutable once built and are only read during a
//! build.
//!
//! # Example
//!
//! ```no_run
//! use horizon_lattice_atlas::{FontSource, GlyphRanges, HintingMode};
//!
//! let regular = FontSource::from_file("fonts/Inter-Regular.ttf", 16.0)?;
//!
//! let icons = FontSource::builder(std::fs::read("fonts/icons.ttf")?)
//!     .size_pixels(16.0)
//!     .hinting(HintingMode::Light)
//!     .range(0xE000, 0xE0FF)
//!     .merge_mode(true)
//!     .merge_center_vertically(true)
//!     .build();
//! # Ok::<(), horizon_lattice_atlas::AtlasError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::error::AtlasResult;

/// Hinting strength applied when loading glyph outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HintingMode {
    /// No hinting; outlines are rasterized exactly as designed.
    None,
    /// Light hinting (vertical snapping only on engines that distinguish it).
    Light,
    /// Full hinting.
    #[default]
    Normal,
    /// Hinting tuned for bilevel output; coverage is thresholded to 0 or 255.
    Mono,
}

impl HintingMode {
    /// Whether the outline hinter should run for this mode.
    pub fn is_hinted(&self) -> bool {
        !matches!(self, HintingMode::None)
    }
}

/// An inclusive range of Unicode codepoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphRange {
    start: u32,
    end: u32,
}

impl GlyphRange {
    /// Create a range covering `start..=end`.
    ///
    /// Endpoints given in the wrong order are swapped.
    pub const fn new(start: u32, end: u32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// First codepoint in the range.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Last codepoint in the range (inclusive).
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of codepoints covered.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// A range always holds at least one codepoint.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `codepoint` falls inside the range.
    pub fn contains(&self, codepoint: u32) -> bool {
        (self.start..=self.end).contains(&codepoint)
    }

    /// Iterate the codepoints in ascending order.
    pub fn iter(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// An ordered list of codepoint ranges.
///
/// Codepoints are visited range by range in list order, ascending within each
/// range. Overlapping ranges are allowed and are not deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphRanges {
    ranges: Vec<GlyphRange>,
}

impl GlyphRanges {
    /// Create an empty range list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Basic Latin plus Latin-1 Supplement.
    pub fn default_latin() -> Self {
        Self::from(vec![GlyphRange::new(0x0020, 0x00FF)])
    }

    /// Latin plus Greek and Coptic.
    pub fn greek() -> Self {
        Self::from(vec![
            GlyphRange::new(0x0020, 0x00FF),
            GlyphRange::new(0x0370, 0x03FF),
        ])
    }

    /// Latin plus Cyrillic, Cyrillic Supplement and the extended blocks.
    pub fn cyrillic() -> Self {
        Self::from(vec![
            GlyphRange::new(0x0020, 0x00FF),
            GlyphRange::new(0x0400, 0x052F),
            GlyphRange::new(0x2DE0, 0x2DFF),
            GlyphRange::new(0xA640, 0xA69F),
        ])
    }

    /// Latin plus Thai and general punctuation.
    pub fn thai() -> Self {
        Self::from(vec![
            GlyphRange::new(0x0020, 0x00FF),
            GlyphRange::new(0x2010, 0x205E),
            GlyphRange::new(0x0E00, 0x0E7F),
        ])
    }

    /// Append a range.
    pub fn push(&mut self, range: GlyphRange) {
        self.ranges.push(range);
    }

    /// The ranges in visiting order.
    pub fn as_slice(&self) -> &[GlyphRange] {
        &self.ranges
    }

    /// Iterate the ranges in visiting order.
    pub fn iter(&self) -> std::slice::Iter<'_, GlyphRange> {
        self.ranges.iter()
    }

    /// Iterate every requested codepoint in visiting order.
    pub fn codepoints(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(GlyphRange::iter)
    }

    /// Total number of codepoints across all ranges, counting overlaps twice.
    pub fn total_codepoints(&self) -> usize {
        self.ranges.iter().map(GlyphRange::len).sum()
    }

    /// Whether no ranges were given.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl From<Vec<GlyphRange>> for GlyphRanges {
    fn from(ranges: Vec<GlyphRange>) -> Self {
        Self { ranges }
    }
}

impl FromIterator<GlyphRange> for GlyphRanges {
    fn from_iter<I: IntoIterator<Item = GlyphRange>>(iter: I) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a GlyphRanges {
    type Item = &'a GlyphRange;
    type IntoIter = std::slice::Iter<'a, GlyphRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// One font to bake into the atlas.
///
/// The font bytes are shared through an `Arc` so several sources (different
/// sizes or faces of the same file) never copy the data.
#[derive(Debug, Clone)]
pub struct FontSource {
    data: Arc<[u8]>,
    face_index: u32,
    size_pixels: f32,
    hinting: HintingMode,
    force_autohint: bool,
    no_autohint: bool,
    bold: bool,
    oblique: bool,
    ranges: GlyphRanges,
    merge_mode: bool,
    merge_center_vertically: bool,
    extra_spacing: [f32; 2],
    brighten: f32,
    pixel_snap_h: bool,
    name: Option<String>,
}

impl FontSource {
    /// Default pixel size for sources that do not set one.
    pub const DEFAULT_SIZE_PIXELS: f32 = 13.0;

    /// Create a source with default settings at the given pixel size.
    pub fn new(data: impl Into<Arc<[u8]>>, size_pixels: f32) -> Self {
        Self::builder(data).size_pixels(size_pixels).build()
    }

    /// Start building a source from font bytes.
    pub fn builder(data: impl Into<Arc<[u8]>>) -> FontSourceBuilder {
        FontSourceBuilder::new(data)
    }

    /// Read a font file from disk and create a source at the given pixel size.
    pub fn from_file(path: impl AsRef<Path>, size_pixels: f32) -> AtlasResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let mut builder = Self::builder(data).size_pixels(size_pixels);
        if let Some(name) = name {
            builder = builder.name(name);
        }
        Ok(builder.build())
    }

    /// Raw font bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the font bytes.
    pub fn shared_data(&self) -> &Arc<[u8]> {
        &self.data
    }

    /// Face index within a font collection.
    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    /// Requested total pixel height (ascender minus descender).
    pub fn size_pixels(&self) -> f32 {
        self.size_pixels
    }

    /// Hinting mode.
    pub fn hinting(&self) -> HintingMode {
        self.hinting
    }

    /// Whether the auto-hinter was requested over native hinting.
    pub fn force_autohint(&self) -> bool {
        self.force_autohint
    }

    /// Whether the auto-hinter was disabled.
    pub fn no_autohint(&self) -> bool {
        self.no_autohint
    }

    /// Synthetic emboldening.
    pub fn bold(&self) -> bool {
        self.bold
    }

    /// Synthetic slant.
    pub fn oblique(&self) -> bool {
        self.oblique
    }

    /// Requested codepoint ranges. Empty means "use the default Latin range".
    pub fn ranges(&self) -> &GlyphRanges {
        &self.ranges
    }

    /// Whether glyphs are merged into the previous font's table.
    pub fn merge_mode(&self) -> bool {
        self.merge_mode
    }

    /// Whether merged glyphs are centered against the destination ascender.
    pub fn merge_center_vertically(&self) -> bool {
        self.merge_center_vertically
    }

    /// Extra spacing baked into glyph advances (x is applied, y is reserved).
    pub fn extra_spacing(&self) -> [f32; 2] {
        self.extra_spacing
    }

    /// Linear coverage boost; 0 copies coverage unchanged.
    pub fn brighten(&self) -> f32 {
        self.brighten
    }

    /// Whether advances are rounded to whole pixels.
    pub fn pixel_snap_h(&self) -> bool {
        self.pixel_snap_h
    }

    /// Optional debug name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The ranges to rasterize, substituting the default Latin range when none were given.
    pub fn effective_ranges(&self) -> GlyphRanges {
        if self.ranges.is_empty() {
            GlyphRanges::default_latin()
        } else {
            self.ranges.clone()
        }
    }
}

/// Builder for [`FontSource`].
#[derive(Debug, Clone)]
pub struct FontSourceBuilder {
    source: FontSource,
}

impl FontSourceBuilder {
    /// Create a builder with default settings.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source: FontSource {
                data: data.into(),
                face_index: 0,
                size_pixels: FontSource::DEFAULT_SIZE_PIXELS,
                hinting: HintingMode::default(),
                force_autohint: false,
                no_autohint: false,
                bold: false,
                oblique: false,
                ranges: GlyphRanges::new(),
                merge_mode: false,
                merge_center_vertically: false,
                extra_spacing: [0.0, 0.0],
                brighten: 0.0,
                pixel_snap_h: false,
                name: None,
            },
        }
    }

    /// Set the face index within a collection.
    pub fn face_index(mut self, index: u32) -> Self {
        self.source.face_index = index;
        self
    }

    /// Set the total pixel height.
    pub fn size_pixels(mut self, size: f32) -> Self {
        self.source.size_pixels = size;
        self
    }

    /// Set the hinting mode.
    pub fn hinting(mut self, mode: HintingMode) -> Self {
        self.source.hinting = mode;
        self
    }

    /// Prefer the auto-hinter over the font's native hints.
    pub fn force_autohint(mut self, force: bool) -> Self {
        self.source.force_autohint = force;
        self
    }

    /// Never use the auto-hinter.
    pub fn no_autohint(mut self, disable: bool) -> Self {
        self.source.no_autohint = disable;
        self
    }

    /// Enable synthetic emboldening.
    pub fn bold(mut self, bold: bool) -> Self {
        self.source.bold = bold;
        self
    }

    /// Enable synthetic slant.
    pub fn oblique(mut self, oblique: bool) -> Self {
        self.source.oblique = oblique;
        self
    }

    /// Add an inclusive codepoint range.
    pub fn range(mut self, start: u32, end: u32) -> Self {
        self.source.ranges.push(GlyphRange::new(start, end));
        self
    }

    /// Replace all codepoint ranges.
    pub fn ranges(mut self, ranges: GlyphRanges) -> Self {
        self.source.ranges = ranges;
        self
    }

    /// Merge glyphs into the previously added font.
    pub fn merge_mode(mut self, merge: bool) -> Self {
        self.source.merge_mode = merge;
        self
    }

    /// Center merged glyphs vertically against the destination font.
    pub fn merge_center_vertically(mut self, center: bool) -> Self {
        self.source.merge_center_vertically = center;
        self
    }

    /// Set the extra spacing baked into advances.
    pub fn extra_spacing(mut self, x: f32, y: f32) -> Self {
        self.source.extra_spacing = [x, y];
        self
    }

    /// Set the brighten factor.
    pub fn brighten(mut self, factor: f32) -> Self {
        self.source.brighten = factor;
        self
    }

    /// Round advances to whole pixels.
    pub fn pixel_snap_h(mut self, snap: bool) -> Self {
        self.source.pixel_snap_h = snap;
        self
    }

    /// Set a debug name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.source.name = Some(name.into());
        self
    }

    /// Finish building.
    pub fn build(self) -> FontSource {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_range_normalizes_order() {
        let range = GlyphRange::new(0x7E, 0x20);
        assert_eq!(range.start(), 0x20);
        assert_eq!(range.end(), 0x7E);
        assert_eq!(range.len(), 95);
        assert!(range.contains(0x41));
        assert!(!range.contains(0x7F));
    }

    #[test]
    fn test_ranges_visit_in_order() {
        let ranges = GlyphRanges::from(vec![GlyphRange::new(5, 6), GlyphRange::new(1, 2)]);
        let visited: Vec<u32> = ranges.codepoints().collect();
        assert_eq!(visited, vec![5, 6, 1, 2]);
        assert_eq!(ranges.total_codepoints(), 4);
    }

    #[test]
    fn test_empty_ranges_fall_back_to_latin() {
        let source = FontSource::new(vec![0u8; 4], 13.0);
        assert!(source.ranges().is_empty());
        assert_eq!(source.effective_ranges(), GlyphRanges::default_latin());
        assert_eq!(source.effective_ranges().total_codepoints(), 0xE0);
    }

    #[test]
    fn test_builder_settings() {
        let source = FontSource::builder(vec![1u8, 2, 3])
            .size_pixels(20.0)
            .face_index(2)
            .bold(true)
            .hinting(HintingMode::None)
            .range(0x30, 0x39)
            .merge_mode(true)
            .extra_spacing(1.5, 0.0)
            .brighten(0.5)
            .pixel_snap_h(true)
            .name("digits")
            .build();

        assert_eq!(source.data(), &[1, 2, 3]);
        assert_eq!(source.size_pixels(), 20.0);
        assert_eq!(source.face_index(), 2);
        assert!(source.bold());
        assert!(!source.oblique());
        assert!(!source.hinting().is_hinted());
        assert_eq!(source.ranges().total_codepoints(), 10);
        assert!(source.merge_mode());
        assert_eq!(source.extra_spacing(), [1.5, 0.0]);
        assert_eq!(source.brighten(), 0.5);
        assert!(source.pixel_snap_h());
        assert_eq!(source.name(), Some("digits"));
    }

    #[test]
    fn test_shared_data_is_not_copied() {
        let data: Arc<[u8]> = Arc::from(vec![9u8; 16]);
        let a = FontSource::new(data.clone(), 10.0);
        let b = FontSource::new(data.clone(), 20.0);
        assert!(Arc::ptr_eq(a.shared_data(), b.shared_data()));
    }
}
