use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Concatenated mesh scan results, per batch and for the whole run
pub const DOZOR_ALL_FILE_NAME: &str = "dozor_all";
const MESH_FILE_EXTENSION: &str = "all";

/// Write `sources` one after the other into `target`, replacing it.
/// Returns the number of bytes written.
pub fn concatenate(sources: &[PathBuf], target: &Path) -> Result<u64, std::io::Error> {
    let mut writer = BufWriter::new(File::create(target)?);
    let mut total = 0;
    for source in sources {
        let mut reader = File::open(source)?;
        total += std::io::copy(&mut reader, &mut writer)?;
    }
    writer.flush()?;
    Ok(total)
}

/// The `*.all` files dozor left in a directory, in file name order
fn mesh_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == MESH_FILE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Gather the mesh files of one batch into `<dir>/dozor_all`
pub fn collect_batch(dir: &Path) -> Result<PathBuf, std::io::Error> {
    let target = dir.join(DOZOR_ALL_FILE_NAME);
    let files = mesh_files(dir)?;
    let size = concatenate(&files, &target)?;
    spdlog::debug!(
        "Collected {} mesh files into {} ({})",
        files.len(),
        target.display(),
        human_bytes::human_bytes(size as f64)
    );
    Ok(target)
}

/// Assemble the per batch mesh results, in batch order, into `<working_dir>/dozor_all`
pub fn assemble_run(working_dir: &Path, batch_files: &[PathBuf]) -> Result<PathBuf, std::io::Error> {
    let target = working_dir.join(DOZOR_ALL_FILE_NAME);
    let size = concatenate(batch_files, &target)?;
    spdlog::info!(
        "Assembled mesh results of {} batches into {} ({})",
        batch_files.len(),
        target.display(),
        human_bytes::human_bytes(size as f64)
    );
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_batch_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("00002.all"), "second\n").unwrap();
        std::fs::write(dir.path().join("00001.all"), "first\n").unwrap();
        std::fs::write(dir.path().join("00001.spot"), "not mesh\n").unwrap();
        let target = collect_batch(dir.path()).unwrap();
        assert_eq!(target, dir.path().join(DOZOR_ALL_FILE_NAME));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "first\nsecond\n");

        // Collecting again does not pick up the previous result
        let target = collect_batch(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_empty_batch_gives_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = collect_batch(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(target).unwrap(), "");
    }

    #[test]
    fn test_assemble_run_keeps_batch_order() {
        let dir = tempfile::tempdir().unwrap();
        let late = dir.path().join("late");
        let early = dir.path().join("early");
        std::fs::write(&late, "b\n").unwrap();
        std::fs::write(&early, "a\n").unwrap();
        let target = assemble_run(dir.path(), &[late, early]).unwrap();
        assert_eq!(std::fs::read_to_string(target).unwrap(), "b\na\n");
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = vec![dir.path().join("nope.all")];
        assert!(assemble_run(dir.path(), &missing).is_err());
    }
}
