//! Error types for the atlas crate.

use thiserror::Error;

use crate::builder::FontId;

/// Errors that abort an atlas build.
///
/// Every variant is fatal: when one is returned, no texture or glyph table
/// produced by the build may be used for rendering. Expected outcomes such as
/// a codepoint missing from a font are not errors and never surface here.
#[derive(Error, Debug)]
pub enum AtlasError {
    /// The build was started without any font sources.
    #[error("no font sources were supplied")]
    EmptyConfiguration,

    /// The font data could not be parsed.
    #[error("font source {index}: invalid font data: {reason}")]
    InvalidFontData { index: usize, reason: String },

    /// The requested face does not exist in the font collection.
    #[error("font source {index}: face index out of range ({face_count} faces available)")]
    FaceIndexOutOfRange { index: usize, face_count: u32 },

    /// The face has no Unicode character map.
    #[error("font source {index}: no unicode charmap")]
    NoUnicodeCharmap { index: usize },

    /// The requested pixel size is not a finite positive number.
    #[error("font source {index}: invalid pixel size {size}")]
    InvalidPixelSize { index: usize, size: f32 },

    /// A rasterized glyph is larger than the per-glyph bitmap bound.
    #[error("glyph U+{codepoint:04X} rasterized to {width}x{height}, exceeding the {max}x{max} limit")]
    GlyphTooLarge {
        codepoint: u32,
        width: u32,
        height: u32,
        max: u32,
    },

    /// A glyph did not fit in a texture sized to hold it.
    #[error(
        "glyph U+{codepoint:04X} ({width}x{height}) did not fit in the {texture_width}x{texture_height} texture"
    )]
    PackingFailed {
        codepoint: u32,
        width: u32,
        height: u32,
        texture_width: u32,
        texture_height: u32,
    },

    /// The estimated texture height does not fit in a `u32`.
    #[error("{rect_count} cells at width {width} need a texture taller than u32::MAX")]
    TextureTooLarge { width: u32, rect_count: usize },

    /// A bitmap was copied to a position outside the texture.
    #[error(
        "{width}x{height} bitmap at ({x}, {y}) exceeds the {texture_width}x{texture_height} texture"
    )]
    BlitOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        texture_width: u32,
        texture_height: u32,
    },

    /// A reserved custom region could not be placed.
    #[error("custom region {width}x{height} could not be packed")]
    CustomRectUnpacked { width: u32, height: u32 },

    /// A merge-mode source was added before any font it could merge into.
    #[error("merge-mode font source added with no preceding font to merge into")]
    MergeWithoutTarget,

    /// A merge-mode entry was processed before its destination font was initialized.
    #[error("merge-mode entry targets {target:?} before a non-merge source initialized it")]
    MergeBeforeBase { target: FontId },

    /// An entry refers to a destination font that does not exist.
    #[error("unknown destination font {0:?}")]
    UnknownFont(FontId),

    /// Reading font data from disk failed.
    #[error("failed to read font data: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for atlas operations.
pub type AtlasResult<T> = Result<T, AtlasError>;
