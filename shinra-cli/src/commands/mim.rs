use shinra::compression::DecompressOptions;
use shinra::formats::mim::read_mim_with;
use std::path::Path;

pub fn execute(input: &Path, options: DecompressOptions) -> anyhow::Result<()> {
    let atlas = read_mim_with(input, options)?;
    let clut = &atlas.clut;
    println!(
        "CLUT at ({}, {}): {} palettes of {} colours",
        clut.x, clut.y, clut.height, clut.width
    );
    for (index, page) in atlas.pages.iter().enumerate() {
        println!(
            "  Page {index}: VRAM ({}, {}), {}x{} pixels",
            page.x,
            page.y,
            u32::from(page.width) * 2,
            page.height
        );
    }
    Ok(())
}
