//! Batch field decoding
//!
//! Field files decode independently, so a directory of them is decoded in
//! parallel with the opcode tables shared between workers.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::compression::DecompressOptions;
use crate::error::Result;
use crate::formats::field::{Field, read_field_with};
use crate::opcodes::OpcodeTables;

/// Progress of a running batch
#[derive(Debug, Clone)]
pub struct BatchProgress<'a> {
    /// 1-based index of the file just started
    pub current: usize,
    pub total: usize,
    pub path: &'a Path,
}

/// Outcome for one file
#[derive(Debug)]
pub struct FieldOutcome {
    pub path: PathBuf,
    pub result: Result<Field>,
}

/// Result of a batch decode
#[derive(Debug)]
pub struct BatchFieldResult {
    /// Number of fields decoded
    pub success_count: usize,
    /// Number of fields that failed
    pub fail_count: usize,
    /// One outcome per input file, sorted by path
    pub outcomes: Vec<FieldOutcome>,
}

/// Find all field `.dat` files in a directory recursively
///
/// # Returns
/// A sorted list of paths.
pub fn find_field_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dat"))
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}

/// Decode field files in parallel
///
/// Failures are collected per file; one bad file does not stop the batch.
pub fn decode_fields<F>(
    files: &[PathBuf],
    tables: &OpcodeTables,
    options: DecompressOptions,
    progress: F,
) -> BatchFieldResult
where
    F: Fn(&BatchProgress<'_>) + Send + Sync,
{
    let success_counter = AtomicUsize::new(0);
    let fail_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = files.len();

    let mut outcomes: Vec<FieldOutcome> = files
        .par_iter()
        .map(|path| {
            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&BatchProgress { current, total, path });

            let result = read_field_with(path, tables, options);
            match &result {
                Ok(_) => success_counter.fetch_add(1, Ordering::SeqCst),
                Err(e) => {
                    tracing::warn!("Failed to decode {}: {e}", path.display());
                    fail_counter.fetch_add(1, Ordering::SeqCst)
                }
            };
            FieldOutcome {
                path: path.clone(),
                result,
            }
        })
        .collect();
    outcomes.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::info!(
        "Decoded {} of {} fields",
        success_counter.load(Ordering::SeqCst),
        total
    );
    BatchFieldResult {
        success_count: success_counter.load(Ordering::SeqCst),
        fail_count: fail_counter.load(Ordering::SeqCst),
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::{Dialect, OpcodeTable, OpcodeTemplate};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_find_field_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("md1_1.DAT"), b"").unwrap();
        std::fs::write(dir.path().join("sub").join("md1_2.dat"), b"").unwrap();
        std::fs::write(dir.path().join("md1_1.MIM"), b"").unwrap();

        let files = find_field_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["md1_1.DAT".to_string(), "md1_2.dat".to_string()]);
    }

    #[test]
    fn test_failures_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.dat");
        std::fs::write(&bad, [1, 2]).unwrap();
        let missing = dir.path().join("missing.dat");

        let field = OpcodeTable::new(Dialect::FieldScript, Vec::<OpcodeTemplate>::new()).unwrap();
        let audio = OpcodeTable::new(Dialect::AudioMacro, Vec::<OpcodeTemplate>::new()).unwrap();
        let tables = OpcodeTables::new(field, audio).unwrap();

        let seen = AtomicUsize::new(0);
        let result = decode_fields(&[missing, bad], &tables, DecompressOptions::default(), |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(result.success_count, 0);
        assert_eq!(result.fail_count, 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(result.outcomes[0].path.ends_with("bad.dat"));
    }
}
