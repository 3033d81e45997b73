use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::batch::{partition, Batch};
use super::decoder::{self, DozorOutput, ImageResultRecord};
use super::detector::DetectorType;
use super::encoder::CommandEncoder;
use super::error::{BatchError, ProcessorError};
use super::execution::{ExecutionRequest, ExecutionService};
use super::header::HeaderService;
use super::image_set::{ImageMap, ImageName};
use super::mesh;
use super::params::{BatchSettings, RunParameters};
use super::plot::{read_plot_file, PlotDocument};
use super::site::SiteConfig;
use super::spot_file::load_spot_file;
use super::worker_status::{BarColor, WorkerStatus};

/// Result of one successful batch
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub output: DozorOutput,
    pub detector_type: DetectorType,
    pub working_directory: PathBuf,
    /// Collected mesh results, only in mesh mode
    pub dozor_all_file: Option<PathBuf>,
}

/// Aggregated result of a run over many batches
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Records of every successful batch, batch by batch in submission order
    pub records: Vec<ImageResultRecord>,
    /// Detector of the last successful batch
    pub detector_type: Option<DetectorType>,
    /// First image number of every batch which failed
    pub failed_batches: Vec<u32>,
    pub half_dose_time: Option<f64>,
    pub plots: Vec<PlotDocument>,
    /// Mesh result file of every successful batch, in submission order
    pub dozor_all_files: Vec<PathBuf>,
}

impl RunOutcome {
    /// True when at least one batch was dropped
    pub fn is_partial(&self) -> bool {
        !self.failed_batches.is_empty()
    }

    fn absorb(&mut self, outcome: BatchOutcome) {
        let BatchOutcome {
            output,
            detector_type,
            dozor_all_file,
            ..
        } = outcome;
        self.detector_type = Some(detector_type);
        self.dozor_all_files.extend(dozor_all_file);
        if output.half_dose_time.is_some() {
            self.half_dose_time = output.half_dose_time;
        }
        if let Some(mtv) = &output.plot_mtv_file {
            match read_plot_file(mtv) {
                Ok(doc) => self.plots.push(doc),
                Err(e) => spdlog::warn!("Skipping plots of {}: {}", mtv.display(), e),
            }
        }
        self.records.extend(output.images);
    }
}

/// Attach the spot table to every record that has a spot file.
/// A table that cannot be read is left out.
fn load_spot_lists(records: &mut [ImageResultRecord]) {
    for record in records.iter_mut() {
        if let Some(path) = &record.spot_file {
            match load_spot_file(path) {
                Ok(table) => record.spot_list = Some(table),
                Err(e) => spdlog::warn!("Skipping spot list of image {}: {}", record.number, e),
            }
        }
    }
}

/// Drives batches through encoding, execution and decoding
#[derive(Clone)]
pub struct BatchOrchestrator<'a> {
    site: &'a SiteConfig,
    header_service: &'a dyn HeaderService,
    executor: &'a dyn ExecutionService,
    working_directory: PathBuf,
    settings: BatchSettings,
    worker_id: usize,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(
        site: &'a SiteConfig,
        header_service: &'a dyn HeaderService,
        executor: &'a dyn ExecutionService,
        working_directory: &Path,
        settings: BatchSettings,
    ) -> Self {
        Self {
            site,
            header_service,
            executor,
            working_directory: working_directory.to_path_buf(),
            settings,
            worker_id: 0,
        }
    }

    /// Worker id reported in progress messages
    pub fn with_worker_id(mut self, worker_id: usize) -> Self {
        self.worker_id = worker_id;
        self
    }

    /// Process a single batch. Each batch gets its own working directory.
    pub fn run_batch(&self, images: &ImageMap, batch: &Batch) -> Result<BatchOutcome, BatchError> {
        if batch.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        let first_image = images
            .get(&batch.first())
            .ok_or(BatchError::MissingImage(batch.first()))?;
        let name = ImageName::parse(first_image)?;
        let header = self.header_service.read_header(first_image)?;

        // Overlapped container data is addressed from the start of its file
        let first_number = if name.is_hdf5() && self.settings.is_overlap_mode() {
            1
        } else {
            batch.first()
        };
        let template = first_image
            .parent()
            .unwrap_or(Path::new(""))
            .join(name.dozor_template())
            .to_string_lossy()
            .to_string();
        let params = RunParameters::from_header(
            &header,
            &self.settings,
            first_number,
            batch.len() as u32,
            template,
        )?;
        let commands = CommandEncoder::new(self.site).encode(&params)?;

        let working_directory = self.working_directory.join(batch.directory_name());
        let request = ExecutionRequest {
            commands: &commands,
            working_directory: &working_directory,
            radiation_damage: self.settings.radiation_damage,
            mesh: self.settings.mesh,
            on_cluster: self.settings.on_cluster,
        };
        let executed = self.executor.execute(&request)?;
        let mut output = decoder::decode(&executed.stdout, &params, Some(&working_directory));

        if let [only] = output.images.as_mut_slice() {
            if only.image.ends_with(".h5") && only.number != batch.first() {
                only.number = batch.first();
            }
        }
        if self.settings.return_spot_list {
            load_spot_lists(&mut output.images);
        }
        let dozor_all_file = if self.settings.mesh {
            Some(mesh::collect_batch(&working_directory)?)
        } else {
            None
        };

        spdlog::info!(
            "Batch {} produced {} image records",
            batch.directory_name(),
            output.images.len()
        );
        Ok(BatchOutcome {
            output,
            detector_type: header.detector_type,
            working_directory,
            dozor_all_file,
        })
    }

    /// Process every batch in order. A failed batch is logged and skipped.
    ///
    /// Progress is reported after every batch when a sender is given; only a closed
    /// channel is an error.
    pub fn run_all(
        &self,
        images: &ImageMap,
        batches: &[Batch],
        tx: Option<&Sender<WorkerStatus>>,
    ) -> Result<RunOutcome, ProcessorError> {
        let mut outcome = RunOutcome::default();
        let total = batches.len().max(1) as f32;
        for (idx, batch) in batches.iter().enumerate() {
            spdlog::info!(
                "Running dozor on batch {} ({} images)...",
                batch.directory_name(),
                batch.len()
            );
            let color = match self.run_batch(images, batch) {
                Ok(batch_outcome) => {
                    outcome.absorb(batch_outcome);
                    BarColor::CYAN
                }
                Err(e) => {
                    spdlog::error!("Batch {} failed: {}", batch.directory_name(), e);
                    outcome.failed_batches.push(batch.first());
                    BarColor::RED
                }
            };
            if let Some(tx) = tx {
                tx.send(WorkerStatus::new(
                    (idx + 1) as f32 / total,
                    batch.first(),
                    self.worker_id,
                    color,
                ))?;
            }
        }
        if outcome.is_partial() {
            spdlog::warn!(
                "{} of {} batches failed",
                outcome.failed_batches.len(),
                batches.len()
            );
        }
        Ok(outcome)
    }

    fn run_sub_wedge(&self, image: &Path) -> Result<BatchOutcome, BatchError> {
        let name = ImageName::parse(image)?;
        let batch = partition([name.number], 1, false)
            .into_iter()
            .next()
            .ok_or(BatchError::EmptyBatch)?;
        let images = ImageMap::from([(name.number, image.to_path_buf())]);
        let mut orchestrator = self.clone();
        orchestrator.working_directory = self
            .working_directory
            .join(format!("{}_{:04}", name.prefix, name.number));
        orchestrator.run_batch(&images, &batch)
    }

    /// Run one single image batch per sub-wedge image, all at once on their own threads.
    ///
    /// The result lines up with `images`: a failed sub-wedge leaves a None in its slot.
    pub fn run_sub_wedges(&self, images: &[PathBuf]) -> Vec<Option<BatchOutcome>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = images
                .iter()
                .map(|image| scope.spawn(move || self.run_sub_wedge(image)))
                .collect();
            handles
                .into_iter()
                .zip(images)
                .map(|(handle, image)| match handle.join() {
                    Ok(Ok(outcome)) => Some(outcome),
                    Ok(Err(e)) => {
                        spdlog::error!("Sub-wedge {} failed: {}", image.display(), e);
                        None
                    }
                    Err(_) => {
                        spdlog::error!("Sub-wedge {} worker panicked", image.display());
                        None
                    }
                })
                .collect()
        })
    }
}
