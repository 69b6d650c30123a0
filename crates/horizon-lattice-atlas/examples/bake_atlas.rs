//! Glyph atlas baking example.
//!
//! Bakes a system sans-serif font (or a font file given on the command line)
//! into an atlas, merges in Greek and Cyrillic, and writes the texture to
//! `atlas.png` for inspection.
//!
//! Run with: cargo run -p horizon-lattice-atlas --example bake_atlas [font.ttf]

use horizon_lattice_atlas::{FontAtlas, FontSource, GlyphRanges, SwashRasterizer};

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("Glyph atlas example");
    println!("===================");
    println!();

    let (data, face_index) = match std::env::args().nth(1) {
        Some(path) => (std::fs::read(&path).expect("Failed to read font file"), 0),
        None => system_sans_serif().expect("No sans-serif system font found"),
    };

    let mut atlas = FontAtlas::new();
    let ui = atlas
        .add_font(
            FontSource::builder(data.clone())
                .face_index(face_index)
                .size_pixels(16.0)
                .name("ui")
                .build(),
        )
        .expect("Failed to add font");

    let mut extra = GlyphRanges::greek();
    for range in &GlyphRanges::cyrillic() {
        extra.push(*range);
    }
    atlas
        .add_font(
            FontSource::builder(data)
                .face_index(face_index)
                .size_pixels(16.0)
                .ranges(extra)
                .merge_mode(true)
                .name("ui-extended")
                .build(),
        )
        .expect("Failed to add merged font");

    atlas
        .build(&mut SwashRasterizer::new())
        .expect("Failed to build atlas");

    let stats = atlas.stats();
    println!("Glyphs packed:    {}", stats.packed);
    println!("Missing glyphs:   {}", stats.missing);
    println!("Texture usage:    {:.1}%", stats.usage * 100.0);

    let font = atlas.font(ui).expect("font was added");
    println!("Line height:      {}", font.line_height());
    println!(
        "\"Hello, world\":   {} px",
        font.text_width("Hello, world")
    );

    let texture = atlas.texture().expect("atlas was built");
    println!("Texture size:     {}x{}", texture.width(), texture.height());

    texture
        .to_gray_image()
        .save("atlas.png")
        .expect("Failed to save atlas.png");
    println!();
    println!("Wrote atlas.png");
}

fn system_sans_serif() -> Option<(Vec<u8>, u32)> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let id = db.query(&fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        ..Default::default()
    })?;
    db.with_face_data(id, |data, face_index| (data.to_vec(), face_index))
}
