use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::error::SpotFileError;

const HEADER_LINES: usize = 3;

/// Path of the spot file dozor writes for an image
pub fn spot_file_path(working_dir: &Path, image_number: u32) -> PathBuf {
    working_dir.join(format!("{image_number:05}.spot"))
}

/// Load a spot file as a table of rows x columns.
///
/// The first three lines are a header. Every remaining non-empty line must have the same
/// number of whitespace separated values.
pub fn load_spot_file(path: &Path) -> Result<Array2<f64>, SpotFileError> {
    if !path.exists() {
        return Err(SpotFileError::BadFilePath(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);

    let mut values: Vec<f64> = Vec::new();
    let mut n_columns: Option<usize> = None;
    let mut n_rows = 0;
    for line in reader.lines().skip(HEADER_LINES) {
        let line = line?;
        let row = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<f64>, _>>()?;
        if row.is_empty() {
            continue;
        }
        match n_columns {
            Some(n) if n != row.len() => {
                return Err(SpotFileError::RaggedRow(n_rows, row.len(), n));
            }
            Some(_) => (),
            None => n_columns = Some(row.len()),
        }
        values.extend(row);
        n_rows += 1;
    }

    let table = Array2::from_shape_vec((n_rows, n_columns.unwrap_or(0)), values)?;
    spdlog::debug!(
        "Loaded {} spots from {}",
        table.nrows(),
        path.display()
    );
    Ok(table)
}
