use shinra::compression::DecompressOptions;
use shinra::formats::field::read_field_with;
use shinra::opcodes::OpcodeTables;
use std::path::Path;

pub fn execute(input: &Path, tables: &OpcodeTables, options: DecompressOptions) -> anyhow::Result<()> {
    let field = read_field_with(input, tables, options)?;
    for (index, dialog) in field.script.dialogs.iter().enumerate() {
        println!("{index:3}: {dialog}");
    }
    Ok(())
}
