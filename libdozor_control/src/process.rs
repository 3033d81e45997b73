use serde::Serialize;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use super::batch::partition;
use super::config::Config;
use super::decoder::ImageResultRecord;
use super::detector::DetectorType;
use super::error::ProcessorError;
use super::execution::ExecutionService;
use super::header::HeaderService;
use super::image_set::{CatalogRecord, ImageSet, ImageSource};
use super::mesh;
use super::orchestrator::{BatchOrchestrator, RunOutcome};
use super::plot::PlotDocument;
use super::summary::{write_summary, SummaryFiles};
use super::worker_status::WorkerStatus;

/// Upper limit on the number of images handed to one dozor invocation
pub const MAX_BATCH_SIZE: usize = 5000;
/// Catalog overlaps at or below this (degrees) are treated as no overlap
const CATALOG_OVERLAP_THRESHOLD: f64 = 1.0;

/// Everything a finished run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub records: Vec<ImageResultRecord>,
    pub detector_type: Option<DetectorType>,
    pub n_batches: usize,
    /// First image number of every batch which failed
    pub failed_batches: Vec<u32>,
    pub half_dose_time: Option<f64>,
    pub plots: Vec<PlotDocument>,
    pub summary: Option<SummaryFiles>,
    /// Mesh results of the whole run, only in mesh mode
    pub dozor_all_file: Option<PathBuf>,
}

impl RunReport {
    fn new(
        outcome: RunOutcome,
        n_batches: usize,
        summary: Option<SummaryFiles>,
        dozor_all_file: Option<PathBuf>,
    ) -> Self {
        Self {
            records: outcome.records,
            detector_type: outcome.detector_type,
            n_batches,
            failed_batches: outcome.failed_batches,
            half_dose_time: outcome.half_dose_time,
            plots: outcome.plots,
            summary,
            dozor_all_file,
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failed_batches.is_empty()
    }
}

fn catalog_record(config: &Config) -> Option<&CatalogRecord> {
    match &config.image_source {
        Some(ImageSource::Catalog(record)) => Some(record),
        _ => None,
    }
}

/// Batch size: the configured value, else the catalog image count, else the maximum.
/// Never more than [`MAX_BATCH_SIZE`].
pub fn determine_batch_size(config: &Config) -> usize {
    config
        .batch_size
        .or_else(|| catalog_record(config).map(|record| record.number_of_images as usize))
        .unwrap_or(MAX_BATCH_SIZE)
        .clamp(1, MAX_BATCH_SIZE)
}

/// Overlap of the run: the configured value wins, else a significant catalog overlap
pub fn determine_overlap(config: &Config) -> f64 {
    if config.overlap != 0.0 {
        return config.overlap;
    }
    catalog_record(config)
        .and_then(|record| record.overlap)
        .filter(|overlap| overlap.abs() > CATALOG_OVERLAP_THRESHOLD)
        .unwrap_or(0.0)
}

/// The main loop of dozor_control.
///
/// Resolves the images, splits them into batches and runs every batch. Batches that fail
/// are left out of the report rather than failing the run. Progress is sent over `tx`
/// when given.
pub fn process_run(
    config: &Config,
    header_service: &dyn HeaderService,
    executor: &dyn ExecutionService,
    tx: Option<&Sender<WorkerStatus>>,
    worker_id: usize,
) -> Result<RunReport, ProcessorError> {
    config.validate()?;
    let image_set = ImageSet::resolve(config.image_source.as_ref())?;
    let batch_size = determine_batch_size(config);
    let overlap = determine_overlap(config);
    let settings = config.batch_settings(overlap);
    let mesh_mode = settings.mesh;
    spdlog::info!(
        "Found {} images in {}, batch size: {}, overlap: {}",
        image_set.len(),
        image_set.directory().display(),
        batch_size,
        overlap
    );

    let batches = partition(
        image_set.images().keys().copied(),
        batch_size,
        settings.is_overlap_mode(),
    );
    std::fs::create_dir_all(&config.working_path)?;
    let orchestrator = BatchOrchestrator::new(
        &config.site,
        header_service,
        executor,
        &config.working_path,
        settings,
    )
    .with_worker_id(worker_id);
    let outcome = orchestrator.run_all(image_set.images(), &batches, tx)?;

    let dozor_all_file = if mesh_mode {
        Some(mesh::assemble_run(
            &config.working_path,
            &outcome.dozor_all_files,
        )?)
    } else {
        None
    };

    let mut summary = None;
    if let Some(dcid) = config.data_collection_id {
        if outcome.records.is_empty() {
            spdlog::warn!("No image results; skipping summary for data collection {dcid}");
        } else {
            summary = Some(write_summary(
                &config.working_path,
                dcid,
                image_set.directory(),
                image_set.template(),
                &outcome.records,
            )?);
        }
    }

    spdlog::info!(
        "Finished {} batches with {} image records.",
        batches.len(),
        outcome.records.len()
    );
    Ok(RunReport::new(outcome, batches.len(), summary, dozor_all_file))
}

/// The function to be called by a separate thread (typically the CLI).
pub fn process(
    config: Config,
    header_service: &dyn HeaderService,
    executor: &dyn ExecutionService,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<RunReport, ProcessorError> {
    process_run(&config, header_service, executor, Some(&tx), worker_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn catalog_config(number_of_images: u32, overlap: Option<f64>) -> Config {
        Config {
            image_source: Some(ImageSource::Catalog(CatalogRecord {
                image_directory: PathBuf::from("/data"),
                file_template: String::from("x_%04d.cbf"),
                start_image_number: 1,
                number_of_images,
                overlap,
            })),
            ..Default::default()
        }
    }

    #[test]
    fn test_batch_size_rules() {
        let mut config = Config::default();
        assert_eq!(determine_batch_size(&config), MAX_BATCH_SIZE);
        config.batch_size = Some(20);
        assert_eq!(determine_batch_size(&config), 20);
        config.batch_size = Some(100_000);
        assert_eq!(determine_batch_size(&config), MAX_BATCH_SIZE);

        let config = catalog_config(360, None);
        assert_eq!(determine_batch_size(&config), 360);
        let config = catalog_config(7200, None);
        assert_eq!(determine_batch_size(&config), MAX_BATCH_SIZE);
    }

    #[test]
    fn test_overlap_rules() {
        assert_eq!(determine_overlap(&Config::default()), 0.0);
        assert_eq!(determine_overlap(&catalog_config(10, Some(0.5))), 0.0);
        assert_eq!(determine_overlap(&catalog_config(10, Some(-2.0))), -2.0);
        let mut config = catalog_config(10, Some(5.0));
        config.overlap = 0.2;
        assert_eq!(determine_overlap(&config), 0.2);
    }
}
