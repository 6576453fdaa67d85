use shinra::batch::{decode_fields, find_field_files};
use shinra::compression::DecompressOptions;
use shinra::opcodes::OpcodeTables;
use std::path::Path;

pub fn execute(source: &Path, tables: &OpcodeTables, options: DecompressOptions) -> anyhow::Result<()> {
    let files = find_field_files(source);
    println!("Decoding {} field files under {}", files.len(), source.display());

    let result = decode_fields(&files, tables, options, |progress| {
        tracing::debug!("[{}/{}] {}", progress.current, progress.total, progress.path.display());
    });

    for outcome in &result.outcomes {
        match &outcome.result {
            Ok(field) => println!(
                "  {}: '{}', {} entities",
                outcome.path.display(),
                field.script.name,
                field.script.entities.len()
            ),
            Err(e) => println!("  {}: FAILED ({e})", outcome.path.display()),
        }
    }

    println!(
        "✓ Batch complete: {} decoded, {} failed",
        result.success_count, result.fail_count
    );
    Ok(())
}
