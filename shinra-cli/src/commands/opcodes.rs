use shinra::opcodes::{Dialect, OpcodeTable};
use std::path::Path;

pub fn execute(path: &Path, dialect: Dialect) -> anyhow::Result<()> {
    let table = OpcodeTable::from_path(dialect, path)?;
    println!("{} opcodes in {} ({} entries)", dialect.name(), path.display(), table.len());
    for template in table.iter() {
        let operands: Vec<String> = template
            .operands
            .iter()
            .map(|o| format!("{}:{}", o.name, o.width))
            .collect();
        println!(
            "  {:#04x} {:<10} {} [{}]",
            template.id,
            template.name,
            template.display_name(),
            operands.join(", ")
        );
    }
    println!("✓ Table is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"[{"id": 1, "name": "A"}, {"id": 1, "name": "B"}]"#).unwrap();
        assert!(execute(&path, Dialect::FieldScript).is_err());
    }
}
