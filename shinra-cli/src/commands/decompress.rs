use anyhow::Context;
use shinra::compression::{DecompressOptions, read_lzs_with};
use std::path::{Path, PathBuf};

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("bin")
}

pub fn execute(input: &Path, output: Option<&Path>, options: DecompressOptions) -> anyhow::Result<()> {
    let output = output.map_or_else(|| default_output(input), Path::to_path_buf);
    println!("Decompressing {} to {}", input.display(), output.display());

    let data = read_lzs_with(input, options)?;
    std::fs::write(&output, &data).with_context(|| format!("writing {}", output.display()))?;

    println!("✓ Decompression complete ({} bytes)", data.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("FIELD.LZS");
        // header 3, control 0x07 (three literals)
        std::fs::write(&input, [3, 0, 0, 0, 0x07, b'a', b'b', b'c']).unwrap();

        execute(&input, None, DecompressOptions::default()).unwrap();
        assert_eq!(std::fs::read(dir.path().join("FIELD.bin")).unwrap(), b"abc");
    }
}
