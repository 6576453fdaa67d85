use anyhow::bail;
use shinra::compression::DecompressOptions;
use shinra::formats::field::{Entity, read_field_with};
use shinra::opcodes::OpcodeTables;
use std::path::Path;
use std::sync::Arc;

fn print_entity(entity: &Entity) {
    println!("{}", entity.name);
    for (slot, script) in entity.scripts.iter().enumerate() {
        // slots sharing a stream are listed once
        let first = entity.scripts[..slot]
            .iter()
            .position(|earlier| Arc::ptr_eq(&earlier.stream, &script.stream));
        if let Some(first) = first {
            println!("  [{slot:2}] @{:#06x} same as [{first}]", script.offset);
            continue;
        }
        println!("  [{slot:2}] @{:#06x}", script.offset);
        for opcode in script.stream.iter() {
            println!("        {opcode}");
        }
    }
}

pub fn execute(
    input: &Path,
    tables: &OpcodeTables,
    options: DecompressOptions,
    entity: Option<&str>,
) -> anyhow::Result<()> {
    let field = read_field_with(input, tables, options)?;
    let script = &field.script;

    match entity {
        Some(name) => {
            let Some(found) = script.entity(name) else {
                bail!("no entity named '{name}' in field '{}'", script.name);
            };
            print_entity(found);
        }
        None => script.entities.iter().for_each(print_entity),
    }
    Ok(())
}
