//! Destination fonts and their glyph tables.
//!
//! The builder writes glyphs through the [`FontBuildTarget`] capability
//! rather than into a concrete font type. [`BakedFont`] is the implementation
//! used by [`FontAtlas`](crate::FontAtlas) and is what renderers query at draw
//! time.

use std::collections::HashMap;

/// Codepoint of the horizontal tab.
const TAB: u32 = '\t' as u32;

/// Codepoint of the space character.
const SPACE: u32 = ' ' as u32;

/// Number of spaces a synthesized tab advances by.
const TAB_WIDTH_IN_SPACES: f32 = 4.0;

/// Per-font vertical metrics recorded by the first (non-merge) source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetMetrics {
    /// Requested pixel size of the base source.
    pub font_size: f32,
    /// Ascender in pixels.
    pub ascent: f32,
    /// Descender in pixels (typically negative).
    pub descent: f32,
}

/// A glyph ready to draw: a quad relative to the pen position and its UV rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputGlyph {
    /// Unicode codepoint.
    pub codepoint: u32,
    /// Left edge of the quad.
    pub x0: f32,
    /// Top edge of the quad, measured down from the top of the line.
    pub y0: f32,
    /// Right edge of the quad.
    pub x1: f32,
    /// Bottom edge of the quad.
    pub y1: f32,
    /// Left texture coordinate.
    pub u0: f32,
    /// Top texture coordinate.
    pub v0: f32,
    /// Right texture coordinate.
    pub u1: f32,
    /// Bottom texture coordinate.
    pub v1: f32,
    /// Distance to advance the pen.
    pub advance_x: f32,
}

impl OutputGlyph {
    /// Quad width in pixels.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Quad height in pixels.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Whether the glyph has no visible pixels.
    pub fn is_blank(&self) -> bool {
        self.x1 == self.x0 || self.y1 == self.y0
    }
}

/// Operations the atlas builder needs from a destination font.
pub trait FontBuildTarget {
    /// Start a fresh glyph table with the given metrics.
    ///
    /// Called once per build by the first non-merge source targeting this
    /// font. Any existing glyphs and the fallback glyph are discarded.
    fn set_metrics(&mut self, metrics: TargetMetrics);

    /// Metrics recorded by the last [`set_metrics`](Self::set_metrics).
    fn metrics(&self) -> TargetMetrics;

    /// Append a glyph to the table.
    fn append_glyph(&mut self, glyph: OutputGlyph);

    /// Find a glyph added so far.
    fn find_glyph(&self, codepoint: u32) -> Option<&OutputGlyph>;

    /// Rebuild derived lookup data after glyphs were appended.
    fn rebuild_lookup(&mut self);

    /// Record that another source contributed glyphs to this font.
    fn add_source(&mut self) {}
}

/// A font baked into an atlas texture.
///
/// When the table has a space glyph but no tab, [`FontBuildTarget::rebuild_lookup`]
/// appends a tab record four spaces wide. [`glyphs`](Self::glyphs) can therefore
/// hold one more record than the codepoints that were rasterized. The tab
/// reuses the space glyph's quad and UVs.
#[derive(Debug, Clone)]
pub struct BakedFont {
    metrics: TargetMetrics,
    glyphs: Vec<OutputGlyph>,
    index_lookup: HashMap<u32, usize>,
    advance_lookup: HashMap<u32, f32>,
    fallback_char: char,
    fallback_glyph: Option<usize>,
    fallback_advance_x: f32,
    source_count: usize,
}

impl Default for BakedFont {
    fn default() -> Self {
        Self {
            metrics: TargetMetrics::default(),
            glyphs: Vec::new(),
            index_lookup: HashMap::new(),
            advance_lookup: HashMap::new(),
            fallback_char: '?',
            fallback_glyph: None,
            fallback_advance_x: 0.0,
            source_count: 0,
        }
    }
}

impl BakedFont {
    /// Create an empty font.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pixel size of the base source.
    pub fn font_size(&self) -> f32 {
        self.metrics.font_size
    }

    /// Ascender in pixels.
    pub fn ascent(&self) -> f32 {
        self.metrics.ascent
    }

    /// Descender in pixels (typically negative).
    pub fn descent(&self) -> f32 {
        self.metrics.descent
    }

    /// Distance between baselines of consecutive lines.
    pub fn line_height(&self) -> f32 {
        self.metrics.ascent - self.metrics.descent
    }

    /// Glyphs in insertion order.
    pub fn glyphs(&self) -> &[OutputGlyph] {
        &self.glyphs
    }

    /// Number of sources that contributed glyphs in the last build.
    pub fn source_count(&self) -> usize {
        self.source_count
    }

    /// Whether the font holds glyphs from a build.
    pub fn is_loaded(&self) -> bool {
        self.source_count > 0
    }

    /// Character drawn for codepoints without a glyph.
    pub fn fallback_char(&self) -> char {
        self.fallback_char
    }

    /// Change the fallback character and re-resolve the fallback glyph.
    pub fn set_fallback_char(&mut self, c: char) {
        self.fallback_char = c;
        self.resolve_fallback();
    }

    /// The glyph used for missing codepoints, if the font has one.
    pub fn fallback_glyph(&self) -> Option<&OutputGlyph> {
        self.fallback_glyph.map(|index| &self.glyphs[index])
    }

    /// Find a glyph, substituting the fallback glyph when missing.
    pub fn find_glyph_or_fallback(&self, codepoint: u32) -> Option<&OutputGlyph> {
        self.find_glyph(codepoint).or_else(|| self.fallback_glyph())
    }

    /// Advance for a codepoint, or the fallback advance when missing.
    pub fn advance_x(&self, codepoint: u32) -> f32 {
        self.advance_lookup
            .get(&codepoint)
            .copied()
            .unwrap_or(self.fallback_advance_x)
    }

    /// Width of a single line of text (sum of advances).
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().map(|c| self.advance_x(c as u32)).sum()
    }

    /// Drop all glyphs and metrics.
    pub fn clear(&mut self) {
        let fallback_char = self.fallback_char;
        *self = Self::default();
        self.fallback_char = fallback_char;
    }

    fn resolve_fallback(&mut self) {
        self.fallback_glyph = self.index_lookup.get(&(self.fallback_char as u32)).copied();
        self.fallback_advance_x = self
            .fallback_glyph()
            .map_or(0.0, |glyph| glyph.advance_x);
    }
}

impl FontBuildTarget for BakedFont {
    fn set_metrics(&mut self, metrics: TargetMetrics) {
        self.metrics = metrics;
        self.glyphs.clear();
        self.index_lookup.clear();
        self.advance_lookup.clear();
        self.fallback_glyph = None;
        self.fallback_advance_x = 0.0;
        self.source_count = 0;
    }

    fn metrics(&self) -> TargetMetrics {
        self.metrics
    }

    fn append_glyph(&mut self, glyph: OutputGlyph) {
        self.index_lookup
            .entry(glyph.codepoint)
            .or_insert(self.glyphs.len());
        self.glyphs.push(glyph);
    }

    fn find_glyph(&self, codepoint: u32) -> Option<&OutputGlyph> {
        self.index_lookup
            .get(&codepoint)
            .map(|&index| &self.glyphs[index])
    }

    fn rebuild_lookup(&mut self) {
        if !self.index_lookup.contains_key(&TAB) {
            if let Some(space) = self.find_glyph(SPACE).copied() {
                self.append_glyph(OutputGlyph {
                    codepoint: TAB,
                    advance_x: space.advance_x * TAB_WIDTH_IN_SPACES,
                    ..space
                });
            }
        }

        self.index_lookup.clear();
        self.advance_lookup.clear();
        for (index, glyph) in self.glyphs.iter().enumerate() {
            self.index_lookup.entry(glyph.codepoint).or_insert(index);
            self.advance_lookup
                .entry(glyph.codepoint)
                .or_insert(glyph.advance_x);
        }

        self.resolve_fallback();
    }

    fn add_source(&mut self) {
        self.source_count += 1;
    }
}
