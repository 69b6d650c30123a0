//! Glyph atlas baking for Horizon Lattice.
//!
//! This crate rasterizes the glyphs of one or more fonts into a single 8-bit
//! coverage texture and produces, for every destination font, a table of
//! glyph records (quad geometry, texture coordinates and advance) ready for
//! immediate-mode text drawing.
//!
//! # Getting Started
//!
//! Add fonts to a [`FontAtlas`] and build it with a [`GlyphRasterizer`]:
//!
//! ```no_run
//! use horizon_lattice_atlas::{FontAtlas, FontSource, SwashRasterizer};
//!
//! let mut atlas = FontAtlas::new();
//! let font = atlas.add_font(FontSource::from_file("fonts/Inter-Regular.ttf", 16.0)?)?;
//! atlas.build(&mut SwashRasterizer::new())?;
//!
//! let texture = atlas.texture().expect("atlas was built");
//! let rgba = texture.to_rgba32();
//! println!("upload {}x{} ({} bytes)", texture.width(), texture.height(), rgba.len());
//!
//! let baked = atlas.font(font).expect("font was added");
//! println!("'Hello' is {} px wide", baked.text_width("Hello"));
//! # Ok::<(), horizon_lattice_atlas::AtlasError>(())
//! ```
//!
//! # Merging Fonts
//!
//! A source built with `merge_mode(true)` adds its glyphs to the previous
//! font instead of creating a new one. Codepoints already present are kept,
//! so earlier sources win:
//!
//! ```no_run
//! use horizon_lattice_atlas::{FontAtlas, FontSource, GlyphRanges, SwashRasterizer};
//!
//! let mut atlas = FontAtlas::new();
//! atlas.add_font(FontSource::from_file("fonts/Inter-Regular.ttf", 16.0)?)?;
//! atlas.add_font(
//!     FontSource::builder(std::fs::read("fonts/NotoSansThai-Regular.ttf")?)
//!         .size_pixels(16.0)
//!         .ranges(GlyphRanges::thai())
//!         .merge_mode(true)
//!         .merge_center_vertically(true)
//!         .build(),
//! )?;
//! atlas.build(&mut SwashRasterizer::new())?;
//! # Ok::<(), horizon_lattice_atlas::AtlasError>(())
//! ```
//!
//! # Lower-Level Building
//!
//! [`build_atlas`] runs the pipeline over caller-owned destination fonts
//! implementing [`FontBuildTarget`], with any [`CustomTexData`] reserving
//! regions ahead of the glyphs. [`FontAtlas`] is a thin owner around it.
//!
//! # Logging
//!
//! Progress is reported through `tracing` under the
//! `horizon_lattice_atlas::<module>` targets. Per-glyph events are emitted at
//! `TRACE` level.

mod atlas;
mod builder;
mod error;
mod estimator;
mod font;
mod packer;
mod rasterizer;
mod source;
mod texture;

pub use atlas::{CustomRect, CustomRectId, FontAtlas};
pub use builder::{
    AtlasConfig, AtlasEntry, BuildOutput, BuildStats, CustomTexData, FontId, NoCustomData,
    build_atlas,
};
pub use error::{AtlasError, AtlasResult};
pub use estimator::{SizeEstimator, TextureDimensions};
pub use font::{BakedFont, FontBuildTarget, OutputGlyph, TargetMetrics};
pub use packer::{AtlasPacker, PackRect};
pub use rasterizer::{
    CoverageBitmap, FaceMetrics, GlyphRasterizer, LoadFlags, MAX_GLYPH_BITMAP_SIZE, RasterFace,
    RasterizedGlyph, SwashFace, SwashRasterizer,
};
pub use source::{FontSource, FontSourceBuilder, GlyphRange, GlyphRanges, HintingMode};
pub use texture::{AtlasTexture, brighten_coverage};
