//! The font atlas: owns sources, destination fonts and the baked texture.
//!
//! [`FontAtlas`] is the usual entry point. Fonts and custom regions are added
//! first, then [`FontAtlas::build`] bakes everything into one texture. After a
//! successful build the renderer uploads [`FontAtlas::texture`] and draws with
//! the glyph tables in [`FontAtlas::fonts`].
//!
//! # Example
//!
//! ```no_run
//! use horizon_lattice_atlas::{FontAtlas, FontSource, GlyphRanges, SwashRasterizer};
//!
//! let mut atlas = FontAtlas::new();
//! let ui = atlas.add_font(FontSource::from_file("fonts/Inter-Regular.ttf", 16.0)?)?;
//! atlas.add_font(
//!     FontSource::builder(std::fs::read("fonts/NotoSans-Regular.ttf")?)
//!         .size_pixels(16.0)
//!         .ranges(GlyphRanges::cyrillic())
//!         .merge_mode(true)
//!         .build(),
//! )?;
//!
//! atlas.build(&mut SwashRasterizer::new())?;
//!
//! let texture = atlas.texture().expect("built");
//! let font = atlas.font(ui).expect("added");
//! println!("{}x{}, {} glyphs", texture.width(), texture.height(), font.glyphs().len());
//! # Ok::<(), horizon_lattice_atlas::AtlasError>(())
//! ```

use tracing::{debug, info, warn};

use crate::builder::{
    AtlasConfig, AtlasEntry, BuildStats, CustomTexData, FontId, build_atlas,
};
use crate::error::{AtlasError, AtlasResult};
use crate::font::BakedFont;
use crate::packer::PackRect;
use crate::rasterizer::GlyphRasterizer;
use crate::source::FontSource;
use crate::texture::AtlasTexture;

/// Side of the region reserved for the white pixel.
///
/// Only the top-left texel is painted; the rest keeps filtering away from
/// neighbouring regions.
const WHITE_PIXEL_REGION: u32 = 2;

/// Identifier of a renderer-reserved region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomRectId(usize);

/// A renderer-reserved region and its placement after a build.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CustomRect {
    /// Requested width.
    pub width: u32,
    /// Requested height.
    pub height: u32,
    /// Left edge in the texture (valid when `packed`).
    pub x: u32,
    /// Top edge in the texture (valid when `packed`).
    pub y: u32,
    /// Whether the region has a placement from the last build.
    pub packed: bool,
    /// UV rectangle `[u0, v0, u1, v1]` (valid when `packed`).
    pub uv_rect: [f32; 4],
}

impl CustomRect {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    fn reset(&mut self) {
        *self = Self::new(self.width, self.height);
    }
}

/// Paints the built-in regions and records custom region placements.
struct ReservedRegions<'a> {
    rects: &'a mut [CustomRect],
    white_pixel_uv: Option<[f32; 2]>,
}

impl CustomTexData for ReservedRegions<'_> {
    fn reserve_regions(&self) -> Vec<PackRect> {
        // Region 0 is the white pixel; user regions follow at `index + 1`.
        std::iter::once(PackRect::new(0, WHITE_PIXEL_REGION, WHITE_PIXEL_REGION))
            .chain(
                self.rects
                    .iter()
                    .enumerate()
                    .map(|(index, rect)| PackRect::new(index + 1, rect.width, rect.height)),
            )
            .collect()
    }

    fn render(&mut self, texture: &mut AtlasTexture, regions: &[PackRect]) {
        let tex_width = texture.width() as f32;
        let tex_height = texture.height() as f32;

        for region in regions.iter().filter(|r| r.packed) {
            if region.id == 0 {
                texture.set_pixel(region.x, region.y, 0xFF);
                let (u, v) = texture.uv(region.x as f32 + 0.5, region.y as f32 + 0.5);
                self.white_pixel_uv = Some([u, v]);
                continue;
            }

            if let Some(rect) = self.rects.get_mut(region.id - 1) {
                rect.x = region.x;
                rect.y = region.y;
                rect.packed = true;
                rect.uv_rect = [
                    region.x as f32 / tex_width,
                    region.y as f32 / tex_height,
                    (region.x + region.width) as f32 / tex_width,
                    (region.y + region.height) as f32 / tex_height,
                ];
            }
        }
    }
}

/// A collection of fonts baked into a single coverage texture.
pub struct FontAtlas {
    config: AtlasConfig,
    entries: Vec<AtlasEntry>,
    fonts: Vec<BakedFont>,
    custom_rects: Vec<CustomRect>,
    texture: Option<AtlasTexture>,
    white_pixel_uv: [f32; 2],
    stats: BuildStats,
}

impl Default for FontAtlas {
    fn default() -> Self {
        Self::with_config(AtlasConfig::default())
    }
}

impl FontAtlas {
    /// Create an empty atlas with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty atlas with the given settings.
    pub fn with_config(config: AtlasConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            fonts: Vec::new(),
            custom_rects: Vec::new(),
            texture: None,
            white_pixel_uv: [0.0, 0.0],
            stats: BuildStats::default(),
        }
    }

    /// Build settings.
    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Fix the texture width for subsequent builds.
    pub fn set_desired_width(&mut self, width: Option<u32>) {
        self.config.desired_width = width;
    }

    /// Add a font source.
    ///
    /// A non-merge source creates a new destination font. A merge source adds
    /// its glyphs to the most recently created font and returns that font's
    /// id.
    pub fn add_font(&mut self, source: FontSource) -> AtlasResult<FontId> {
        let target = if source.merge_mode() {
            let last = self
                .fonts
                .len()
                .checked_sub(1)
                .ok_or(AtlasError::MergeWithoutTarget)?;
            FontId(last)
        } else {
            self.fonts.push(BakedFont::new());
            FontId(self.fonts.len() - 1)
        };

        debug!(
            target: "horizon_lattice_atlas::atlas",
            font = target.index(),
            name = source.name().unwrap_or("<unnamed>"),
            size = source.size_pixels(),
            merge = source.merge_mode(),
            "added font source"
        );

        self.entries.push(AtlasEntry::new(source, target));
        Ok(target)
    }

    /// Reserve a region of the texture for the renderer's own use.
    ///
    /// Regions are packed before any glyph. The placement is available from
    /// [`custom_rect`](Self::custom_rect) after a successful build.
    pub fn add_custom_rect(&mut self, width: u32, height: u32) -> CustomRectId {
        self.custom_rects.push(CustomRect::new(width, height));
        CustomRectId(self.custom_rects.len() - 1)
    }

    /// Bake every added source into a new texture.
    ///
    /// On failure the texture, every font's glyph table and every custom
    /// region placement are cleared; the sources are kept so the build can be
    /// retried.
    #[tracing::instrument(skip_all, target = "horizon_lattice_atlas::atlas", level = "debug")]
    pub fn build<R: GlyphRasterizer>(&mut self, rasterizer: &mut R) -> AtlasResult<()> {
        self.clear_tex_data();

        let mut regions = ReservedRegions {
            rects: &mut self.custom_rects,
            white_pixel_uv: None,
        };
        let result = build_atlas(
            &self.entries,
            &mut self.fonts,
            rasterizer,
            &mut regions,
            &self.config,
        );
        let white_pixel_uv = regions.white_pixel_uv;

        match result {
            Ok(output) => {
                info!(
                    target: "horizon_lattice_atlas::atlas",
                    width = output.texture.width(),
                    height = output.texture.height(),
                    fonts = self.fonts.len(),
                    glyphs = output.stats.packed,
                    "font atlas built"
                );
                self.white_pixel_uv = white_pixel_uv.unwrap_or([0.0, 0.0]);
                self.stats = output.stats;
                self.texture = Some(output.texture);
                Ok(())
            }
            Err(err) => {
                warn!(target: "horizon_lattice_atlas::atlas", error = %err, "font atlas build failed");
                self.clear_tex_data();
                for font in &mut self.fonts {
                    font.clear();
                }
                Err(err)
            }
        }
    }

    /// Whether a texture from a successful build is available.
    pub fn is_built(&self) -> bool {
        self.texture.is_some()
    }

    /// The baked texture, if built and not taken.
    pub fn texture(&self) -> Option<&AtlasTexture> {
        self.texture.as_ref()
    }

    /// Take the texture, typically after uploading it to the GPU.
    ///
    /// Glyph tables stay valid; only the CPU-side pixels are released.
    pub fn take_texture(&mut self) -> Option<AtlasTexture> {
        self.texture.take()
    }

    /// Drop the texture and custom region placements.
    pub fn clear_tex_data(&mut self) {
        self.texture = None;
        self.white_pixel_uv = [0.0, 0.0];
        self.stats = BuildStats::default();
        for rect in &mut self.custom_rects {
            rect.reset();
        }
    }

    /// Remove every source, font, custom region and the texture.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.fonts.clear();
        self.custom_rects.clear();
        self.clear_tex_data();
    }

    /// Destination fonts in creation order.
    pub fn fonts(&self) -> &[BakedFont] {
        &self.fonts
    }

    /// A destination font by id.
    pub fn font(&self, id: FontId) -> Option<&BakedFont> {
        self.fonts.get(id.index())
    }

    /// Mutable access to a destination font, e.g. to change its fallback character.
    pub fn font_mut(&mut self, id: FontId) -> Option<&mut BakedFont> {
        self.fonts.get_mut(id.index())
    }

    /// Number of sources added.
    pub fn source_count(&self) -> usize {
        self.entries.len()
    }

    /// A reserved region and its placement from the last build.
    pub fn custom_rect(&self, id: CustomRectId) -> Option<&CustomRect> {
        self.custom_rects.get(id.0)
    }

    /// UV of the centre of the opaque white texel.
    ///
    /// `[0.0, 0.0]` until a build succeeds.
    pub fn white_pixel_uv(&self) -> [f32; 2] {
        self.white_pixel_uv
    }

    /// Counters from the last successful build.
    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

impl std::fmt::Debug for FontAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAtlas")
            .field("sources", &self.entries.len())
            .field("fonts", &self.fonts.len())
            .field("custom_rects", &self.custom_rects.len())
            .field("texture", &self.texture)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(merge: bool) -> FontSource {
        FontSource::builder(vec![0u8; 4]).merge_mode(merge).build()
    }

    #[test]
    fn test_merge_without_base_font_is_rejected() {
        let mut atlas = FontAtlas::new();
        assert!(matches!(
            atlas.add_font(source(true)),
            Err(AtlasError::MergeWithoutTarget)
        ));
        assert_eq!(atlas.source_count(), 0);
    }

    #[test]
    fn test_merge_targets_latest_font() {
        let mut atlas = FontAtlas::new();
        let first = atlas.add_font(source(false)).unwrap();
        let second = atlas.add_font(source(false)).unwrap();
        let merged = atlas.add_font(source(true)).unwrap();

        assert_eq!(first, FontId(0));
        assert_eq!(second, FontId(1));
        assert_eq!(merged, second);
        assert_eq!(atlas.fonts().len(), 2);
        assert_eq!(atlas.source_count(), 3);
    }

    #[test]
    fn test_reserved_regions_put_white_pixel_first() {
        let mut rects = vec![CustomRect::new(5, 3), CustomRect::new(7, 7)];
        let regions = ReservedRegions {
            rects: &mut rects,
            white_pixel_uv: None,
        };
        let requested = regions.reserve_regions();
        assert_eq!(requested.len(), 3);
        assert_eq!((requested[0].id, requested[0].width), (0, WHITE_PIXEL_REGION));
        assert_eq!((requested[2].id, requested[2].width), (2, 7));
    }

    #[test]
    fn test_reserved_regions_render() {
        let mut rects = vec![CustomRect::new(4, 4)];
        let mut regions = ReservedRegions {
            rects: &mut rects,
            white_pixel_uv: None,
        };
        let mut texture = AtlasTexture::new(16, 8);
        let placed = [
            PackRect {
                x: 4,
                y: 0,
                packed: true,
                ..PackRect::new(0, 2, 2)
            },
            PackRect {
                x: 0,
                y: 0,
                packed: true,
                ..PackRect::new(1, 4, 4)
            },
        ];
        regions.render(&mut texture, &placed);

        assert_eq!(texture.pixel(4, 0), Some(0xFF));
        assert_eq!(texture.pixel(5, 0), Some(0));
        assert_eq!(regions.white_pixel_uv, Some([4.5 / 16.0, 0.5 / 8.0]));
        assert!(rects[0].packed);
        assert_eq!(rects[0].uv_rect, [0.0, 0.0, 0.25, 0.5]);
    }

    #[test]
    fn test_clear() {
        let mut atlas = FontAtlas::new();
        atlas.add_font(source(false)).unwrap();
        let id = atlas.add_custom_rect(8, 8);
        assert!(atlas.custom_rect(id).is_some());

        atlas.clear();
        assert!(atlas.fonts().is_empty());
        assert!(atlas.custom_rect(id).is_none());
        assert!(!atlas.is_built());
    }
}
