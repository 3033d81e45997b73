use serde::{Deserialize, Serialize};
use std::path::Path;

use super::detector::DetectorType;
use super::error::HeaderError;

/// Experimental conditions read from the header of an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageHeader {
    pub detector_type: DetectorType,
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
    /// Beam position in mm
    pub beam_position_x: f64,
    pub beam_position_y: f64,
    pub detector_distance: f64,
    pub wavelength: f64,
    pub exposure_time: f64,
    pub oscillation_width: f64,
    pub rotation_axis_start: f64,
}

impl ImageHeader {
    /// Beam center in pixels
    pub fn beam_center(&self) -> Result<(f64, f64), HeaderError> {
        if self.pixel_size_x <= 0.0 || self.pixel_size_y <= 0.0 {
            return Err(HeaderError::BadPixelSize(
                self.pixel_size_x,
                self.pixel_size_y,
            ));
        }
        Ok((
            self.beam_position_x / self.pixel_size_x,
            self.beam_position_y / self.pixel_size_y,
        ))
    }
}

/// Reads image headers. Implementations must be shareable between worker threads.
pub trait HeaderService: Sync {
    fn read_header(&self, image: &Path) -> Result<ImageHeader, HeaderError>;
}

/// Header service which answers every request with the same header.
///
/// Used when the experimental conditions are known up front (given in the config) and
/// no header reader is available. The image must still exist on disk.
#[derive(Debug, Clone)]
pub struct FixedHeaderService {
    header: ImageHeader,
    check_exists: bool,
}

impl FixedHeaderService {
    pub fn new(header: ImageHeader) -> Self {
        Self {
            header,
            check_exists: true,
        }
    }

    /// Skip the existence check, for images that live on another machine
    pub fn without_existence_check(mut self) -> Self {
        self.check_exists = false;
        self
    }
}

impl HeaderService for FixedHeaderService {
    fn read_header(&self, image: &Path) -> Result<ImageHeader, HeaderError> {
        if self.check_exists && !image.exists() {
            return Err(HeaderError::BadFilePath(image.to_path_buf()));
        }
        Ok(self.header.clone())
    }
}
