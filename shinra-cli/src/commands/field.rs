use shinra::compression::DecompressOptions;
use shinra::formats::field::{Field, read_field_with};
use shinra::opcodes::OpcodeTables;
use std::path::Path;

fn print_summary(field: &Field) {
    let script = &field.script;
    println!("Field '{}' (creator '{}', version {})", script.name, script.creator, script.version);
    println!("  Entities:     {}", script.entities.len());
    println!("  Models:       {}", script.model_count);
    println!("  Audio macros: {}", script.audio_macros.len());
    println!("  Dialogs:      {}", script.dialogs.len());

    println!("Walkmesh: {} sectors", field.walkmesh.sector_count());

    let tilemap = &field.tilemap;
    println!(
        "Tilemap: {}x{} at ({}, {}), {} tiles, {} texture pages",
        tilemap.width,
        tilemap.height,
        tilemap.origin_x,
        tilemap.origin_y,
        tilemap.tile_count(),
        tilemap.texture_pages.len()
    );

    let camera = &field.camera;
    let t = camera.translation();
    println!("Camera: zoom {}, translation ({:.1}, {:.1}, {:.1})", camera.zoom, t.x, t.y, t.z);
}

pub fn execute(input: &Path, tables: &OpcodeTables, options: DecompressOptions, json: bool) -> anyhow::Result<()> {
    let field = read_field_with(input, tables, options)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&field)?);
    } else {
        print_summary(&field);
    }
    Ok(())
}
