use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config requires a batch size of at least 1, found {0}")]
    BadBatchSize(usize),
}

#[derive(Debug, Error)]
pub enum ImageSetError {
    #[error("No image source was given; expected an image list, a directory with template and range, or a catalog record")]
    NoImageSource,
    #[error("The image list is empty")]
    EmptyImageList,
    #[error("Image template {0} does not contain a numeric placeholder")]
    BadTemplate(String),
    #[error("Image range is invalid -- start: {0} end: {1}")]
    BadRange(u32, u32),
    #[error("Could not extract an image number from the file name {0:?}")]
    NoImageNumber(PathBuf),
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Found unknown detector type: {0}")]
    UnknownDetector(String),
}

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("CommandEncoder could not find a {0} library in the site configuration")]
    MissingLibrary(String),
}

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("Could not read image header because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Image header has an invalid pixel size -- x: {0} y: {1}")]
    BadPixelSize(f64, f64),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Execution failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Executable {0} exited with status {1}")]
    NonZeroExit(String, i32),
    #[error("Executable {0} was terminated by a signal")]
    Terminated(String),
    #[error("Cluster execution was requested but no cluster is configured")]
    NoClusterConfig,
}

#[derive(Debug, Error)]
pub enum PlotFormatError {
    #[error("Plot file ended right after a block marker at line {0}")]
    MissingBlockName(usize),
    #[error("Plot block name at line {0} is not quoted")]
    UnquotedBlockName(usize),
    #[error("Plot attribute at line {0} is missing '='")]
    MissingEquals(usize),
    #[error("Plot subplot at line {0} appears before any block")]
    SubplotOutsideBlock(usize),
    #[error("Plot data at line {0} appears before any subplot")]
    DataOutsideSubplot(usize),
    #[error("Plot data at line {0} has fewer than two values")]
    ShortDataRow(usize),
    #[error("Plot data at line {0} could not be parsed: {1}")]
    BadValue(usize, std::num::ParseFloatError),
    #[error("Plot file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SpotFileError {
    #[error("Could not open spot file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Spot file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Spot file failed to parse a value: {0}")]
    ParsingError(#[from] std::num::ParseFloatError),
    #[error("Spot file row {0} has {1} columns; expected {2}")]
    RaggedRow(usize, usize, usize),
    #[error("Spot file could not be shaped into a table: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Summary failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Summary requires at least one image result")]
    NoResults,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch failed because it contains no images")]
    EmptyBatch,
    #[error("Batch failed because image {0} is missing from the image set")]
    MissingImage(u32),
    #[error("Batch failed due to ImageSet error: {0}")]
    ImageSetError(#[from] ImageSetError),
    #[error("Batch failed due to header error: {0}")]
    HeaderError(#[from] HeaderError),
    #[error("Batch failed due to CommandEncoder error: {0}")]
    EncoderError(#[from] EncoderError),
    #[error("Batch failed due to execution error: {0}")]
    ExecutionError(#[from] ExecutionError),
    #[error("Batch failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to ImageSet error: {0}")]
    ImageSetError(#[from] ImageSetError),
    #[error("Processor failed due to Summary error: {0}")]
    SummaryError(#[from] SummaryError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
