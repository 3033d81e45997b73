/// Bar color used by front ends to tell apart what a worker is doing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BarColor {
    #[default]
    CYAN,
    RED,
}

/// Progress message sent from the orchestrator after every batch.
///
/// `batch` is the first image number of the batch which was just handled.
/// A batch that failed is reported with `BarColor::RED`.
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub batch: u32,
    pub worker_id: usize,
    pub color: BarColor,
}

impl WorkerStatus {
    pub fn new(progress: f32, batch: u32, worker_id: usize, color: BarColor) -> Self {
        Self {
            progress,
            batch,
            worker_id,
            color,
        }
    }
}
