//! Atlas build orchestration.
//!
//! [`build_atlas`] runs the whole pipeline in one synchronous pass:
//!
//! 1. open a face for every entry and accumulate the largest glyph footprint
//!    and the total requested codepoint count;
//! 2. fix the texture dimensions with the [`SizeEstimator`] and pack the
//!    reserved custom regions first, so they land at low coordinates;
//! 3. allocate the zeroed texture;
//! 4. for each entry, for each codepoint in range order: rasterize, pack a
//!    padded rectangle, blit the coverage, and append an [`OutputGlyph`] to
//!    the destination font;
//! 5. rebuild each destination font's lookup data;
//! 6. let the [`CustomTexData`] paint its reserved regions.
//!
//! Any error aborts the build. Faces are dropped on every return path.

use tracing::{debug, trace};

use crate::error::{AtlasError, AtlasResult};
use crate::estimator::SizeEstimator;
use crate::font::{FontBuildTarget, OutputGlyph, TargetMetrics};
use crate::packer::{AtlasPacker, PackRect};
use crate::rasterizer::{GlyphRasterizer, RasterFace};
use crate::source::{FontSource, GlyphRanges};
use crate::texture::AtlasTexture;

/// Padding added to the right and bottom of every glyph rectangle so linear
/// filtering does not bleed into the neighbouring glyph.
const GLYPH_PADDING: u32 = 1;

/// Index of a destination font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub usize);

impl FontId {
    /// Position of the font in its target slice.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A font source bound to the destination font it fills.
#[derive(Debug, Clone)]
pub struct AtlasEntry {
    /// What to rasterize.
    pub source: FontSource,
    /// Where the glyphs go.
    pub target: FontId,
}

impl AtlasEntry {
    /// Bind a source to a destination font.
    pub fn new(source: FontSource, target: FontId) -> Self {
        Self { source, target }
    }
}

/// Build-wide options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtlasConfig {
    /// Fixed texture width; `None` picks one from the glyph count.
    pub desired_width: Option<u32>,
}

impl AtlasConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fixed texture width.
    pub fn desired_width(mut self, width: u32) -> Self {
        self.desired_width = Some(width);
        self
    }
}

/// Renderer-owned regions reserved in the texture ahead of all glyphs.
///
/// The builder calls [`reserve_regions`](Self::reserve_regions) before any
/// glyph is packed and [`render`](Self::render) once every placement is
/// final.
pub trait CustomTexData {
    /// Sizes of the regions to reserve. `id` is echoed back in `render`.
    fn reserve_regions(&self) -> Vec<PackRect>;

    /// Paint the reserved regions at their final placements.
    fn render(&mut self, texture: &mut AtlasTexture, regions: &[PackRect]);
}

/// A [`CustomTexData`] that reserves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCustomData;

impl CustomTexData for NoCustomData {
    fn reserve_regions(&self) -> Vec<PackRect> {
        Vec::new()
    }

    fn render(&mut self, _texture: &mut AtlasTexture, _regions: &[PackRect]) {}
}

/// Counters collected during a build.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BuildStats {
    /// Codepoints requested across all entries (overlaps counted twice).
    pub requested: usize,
    /// Glyphs rasterized, packed and recorded.
    pub packed: usize,
    /// Codepoints the font had no glyph for.
    pub missing: usize,
    /// Codepoints skipped because a merge target already had them.
    pub merged_duplicates: usize,
    /// Fraction of the texture covered by packed rectangles.
    pub usage: f32,
}

/// A finished build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The baked coverage texture.
    pub texture: AtlasTexture,
    /// Reserved regions with their final placements, in reservation order.
    pub regions: Vec<PackRect>,
    /// Build counters.
    pub stats: BuildStats,
}

/// Bake every entry into one texture and fill the destination fonts.
///
/// Merge-mode entries must come after a non-merge entry targeting the same
/// font; otherwise [`AtlasError::MergeBeforeBase`] is returned before any
/// work is done.
#[tracing::instrument(
    skip_all,
    target = "horizon_lattice_atlas::builder",
    level = "debug",
    fields(entries = entries.len(), targets = targets.len())
)]
pub fn build_atlas<R, T, C>(
    entries: &[AtlasEntry],
    targets: &mut [T],
    rasterizer: &mut R,
    custom: &mut C,
    config: &AtlasConfig,
) -> AtlasResult<BuildOutput>
where
    R: GlyphRasterizer,
    T: FontBuildTarget,
    C: CustomTexData + ?Sized,
{
    if entries.is_empty() {
        return Err(AtlasError::EmptyConfiguration);
    }
    validate_order(entries, targets.len())?;

    // Init: open every face up front so a bad font fails before any allocation.
    let mut estimator = SizeEstimator::new().with_desired_width(config.desired_width);
    let mut faces = Vec::with_capacity(entries.len());
    let mut ranges = Vec::with_capacity(entries.len());
    let mut total_glyphs = 0;
    for (index, entry) in entries.iter().enumerate() {
        let face = rasterizer.open_face(&entry.source, index)?;
        let metrics = face.metrics();
        estimator.include_face(metrics.max_advance_width, metrics.height());

        let entry_ranges = entry.source.effective_ranges();
        total_glyphs += entry_ranges.total_codepoints();
        ranges.push(entry_ranges);
        faces.push(face);
    }

    // Size: reserved regions are packed first so they sit near the origin.
    let mut regions = custom.reserve_regions();
    let dims = estimator.estimate(total_glyphs, regions.len())?;
    let mut packer = AtlasPacker::new(dims.width, dims.height, total_glyphs + regions.len());
    if !packer.pack(&mut regions) {
        if let Some(rect) = regions.iter().find(|r| !r.packed) {
            return Err(AtlasError::CustomRectUnpacked {
                width: rect.width,
                height: rect.height,
            });
        }
    }
    let reserved_bottom = regions.iter().map(PackRect::bottom).max().unwrap_or(0);
    let height = dims
        .height
        .max(reserved_bottom)
        .checked_next_power_of_two()
        .ok_or(AtlasError::TextureTooLarge {
            width: dims.width,
            rect_count: total_glyphs + regions.len(),
        })?;
    debug!(
        target: "horizon_lattice_atlas::builder",
        width = dims.width,
        height,
        reserved = regions.len(),
        total_glyphs,
        "texture dimensions fixed"
    );

    // Allocate.
    let mut texture = AtlasTexture::new(dims.width, height);

    // Rasterize, pack and blit.
    let mut stats = BuildStats {
        requested: total_glyphs,
        ..BuildStats::default()
    };
    for (index, ((entry, face), entry_ranges)) in entries
        .iter()
        .zip(faces.iter_mut())
        .zip(&ranges)
        .enumerate()
    {
        let target = &mut targets[entry.target.index()];
        let before = stats.packed;
        bake_entry(
            &entry.source,
            entry_ranges,
            face,
            target,
            &mut packer,
            &mut texture,
            &mut stats,
        )?;
        target.rebuild_lookup();

        debug!(
            target: "horizon_lattice_atlas::builder",
            source = index,
            name = entry.source.name().unwrap_or("<unnamed>"),
            font = entry.target.index(),
            merge = entry.source.merge_mode(),
            glyphs = stats.packed - before,
            "baked font source"
        );
    }
    drop(faces);

    // Custom regions are painted last, over their fixed placements.
    custom.render(&mut texture, &regions);

    stats.usage = packer.usage();
    debug!(
        target: "horizon_lattice_atlas::builder",
        packed = stats.packed,
        missing = stats.missing,
        merged_duplicates = stats.merged_duplicates,
        usage = stats.usage,
        "atlas built"
    );

    Ok(BuildOutput {
        texture,
        regions,
        stats,
    })
}

/// Check every entry targets an existing font and that merges follow their base.
fn validate_order(entries: &[AtlasEntry], target_count: usize) -> AtlasResult<()> {
    let mut initialized = vec![false; target_count];
    for entry in entries {
        let target = entry.target;
        let slot = initialized
            .get_mut(target.index())
            .ok_or(AtlasError::UnknownFont(target))?;
        if entry.source.merge_mode() {
            if !*slot {
                return Err(AtlasError::MergeBeforeBase { target });
            }
        } else {
            *slot = true;
        }
    }
    Ok(())
}

/// Rasterize one entry's ranges into the shared texture and its target font.
fn bake_entry<F, T>(
    source: &FontSource,
    ranges: &GlyphRanges,
    face: &mut F,
    target: &mut T,
    packer: &mut AtlasPacker,
    texture: &mut AtlasTexture,
    stats: &mut BuildStats,
) -> AtlasResult<()>
where
    F: RasterFace,
    T: FontBuildTarget,
{
    let metrics = face.metrics();
    let merge = source.merge_mode();
    if !merge {
        target.set_metrics(TargetMetrics {
            font_size: source.size_pixels(),
            ascent: metrics.ascender,
            descent: metrics.descender,
        });
    }
    target.add_source();

    let dst_ascent = target.metrics().ascent;
    let off_y = if merge && source.merge_center_vertically() {
        (metrics.ascender - dst_ascent) * 0.5
    } else {
        0.0
    };
    let baseline = (dst_ascent + off_y).round();
    let tex_width = texture.width() as f32;
    let tex_height = texture.height() as f32;

    for codepoint in ranges.codepoints() {
        if merge && target.find_glyph(codepoint).is_some() {
            stats.merged_duplicates += 1;
            trace!(
                target: "horizon_lattice_atlas::builder",
                codepoint,
                "already present in merge target"
            );
            continue;
        }

        let Some(glyph) = face.rasterize(codepoint)? else {
            stats.missing += 1;
            trace!(target: "horizon_lattice_atlas::builder", codepoint, "no glyph");
            continue;
        };
        glyph.check_bounds(codepoint)?;

        let width = glyph.width();
        let height = glyph.height();
        let (x, y) = packer
            .allocate(width + GLYPH_PADDING, height + GLYPH_PADDING)
            .ok_or(AtlasError::PackingFailed {
                codepoint,
                width: width + GLYPH_PADDING,
                height: height + GLYPH_PADDING,
                texture_width: texture.width(),
                texture_height: texture.height(),
            })?;

        texture.blit(x, y, &glyph.bitmap, source.brighten())?;

        let mut advance_x = glyph.advance_x + source.extra_spacing()[0];
        if source.pixel_snap_h() {
            advance_x = advance_x.round();
        }

        target.append_glyph(OutputGlyph {
            codepoint,
            x0: glyph.bearing_x,
            y0: glyph.bearing_y + baseline,
            x1: glyph.bearing_x + width as f32,
            y1: glyph.bearing_y + height as f32 + baseline,
            u0: x as f32 / tex_width,
            v0: y as f32 / tex_height,
            u1: (x + width) as f32 / tex_width,
            v1: (y + height) as f32 / tex_height,
            advance_x,
        });
        stats.packed += 1;

        trace!(
            target: "horizon_lattice_atlas::builder",
            codepoint,
            x,
            y,
            width,
            height,
            "placed glyph"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(merge: bool, target: usize) -> AtlasEntry {
        AtlasEntry::new(
            FontSource::builder(vec![0u8; 4]).merge_mode(merge).build(),
            FontId(target),
        )
    }

    #[test]
    fn test_merge_after_base_is_valid() {
        let entries = [entry(false, 0), entry(true, 0), entry(false, 1)];
        assert!(validate_order(&entries, 2).is_ok());
    }

    #[test]
    fn test_merge_before_base_is_rejected() {
        let entries = [entry(true, 0), entry(false, 0)];
        assert!(matches!(
            validate_order(&entries, 1),
            Err(AtlasError::MergeBeforeBase { target: FontId(0) })
        ));

        let entries = [entry(false, 0), entry(true, 1)];
        assert!(matches!(
            validate_order(&entries, 2),
            Err(AtlasError::MergeBeforeBase { target: FontId(1) })
        ));
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let entries = [entry(false, 3)];
        assert!(matches!(
            validate_order(&entries, 1),
            Err(AtlasError::UnknownFont(FontId(3)))
        ));
    }

    #[test]
    fn test_config_builder() {
        assert_eq!(AtlasConfig::new().desired_width, None);
        assert_eq!(AtlasConfig::new().desired_width(256).desired_width, Some(256));
    }
}
