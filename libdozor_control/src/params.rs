use serde::{Deserialize, Serialize};

use super::detector::DetectorType;
use super::error::HeaderError;
use super::header::ImageHeader;

pub const DEFAULT_FRACTION_POLARIZATION: f64 = 0.99;
pub const DEFAULT_IMAGE_STEP: f64 = 1.0;
pub const DEFAULT_SPOT_SIZE: u32 = 3;
pub const DEFAULT_SPOT_LEVEL: u32 = 6;

/// Settings shared by every batch of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSettings {
    pub beamline: Option<String>,
    pub spot_size: Option<u32>,
    pub spot_level: Option<u32>,
    pub wedge_number: Option<u32>,
    /// Angular overlap between consecutive images (degrees). Non-zero means overlap mode.
    pub overlap: f64,
    pub radiation_damage: bool,
    pub mesh: bool,
    pub on_cluster: bool,
    /// Load every image's spot file into its record
    pub return_spot_list: bool,
}

impl BatchSettings {
    pub fn is_overlap_mode(&self) -> bool {
        self.overlap != 0.0
    }
}

/// Everything dozor needs to know to process one batch
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub detector_type: DetectorType,
    pub beamline: Option<String>,
    pub exposure_time: f64,
    pub spot_size: u32,
    pub spot_level: Option<u32>,
    pub detector_distance: f64,
    pub wavelength: f64,
    pub fraction_polarization: Option<f64>,
    pub orgx: f64,
    pub orgy: f64,
    pub oscillation_range: f64,
    pub image_step: Option<f64>,
    /// Rotation angle at the start of the first image of this batch
    pub starting_angle: f64,
    pub first_image_number: u32,
    pub number_images: u32,
    pub name_template_image: String,
    pub wedge_number: Option<u32>,
    pub overlap: f64,
    pub radiation_damage: bool,
    pub on_cluster: bool,
}

impl RunParameters {
    /// Combine the header of the first image of a batch with the shared settings
    pub fn from_header(
        header: &ImageHeader,
        settings: &BatchSettings,
        first_image_number: u32,
        number_images: u32,
        name_template_image: String,
    ) -> Result<Self, HeaderError> {
        let (orgx, orgy) = header.beam_center()?;
        Ok(Self {
            detector_type: header.detector_type,
            beamline: settings.beamline.clone(),
            exposure_time: header.exposure_time,
            spot_size: settings.spot_size.unwrap_or(DEFAULT_SPOT_SIZE),
            spot_level: settings.spot_level,
            detector_distance: header.detector_distance,
            wavelength: header.wavelength,
            fraction_polarization: None,
            orgx,
            orgy,
            oscillation_range: header.oscillation_width,
            image_step: None,
            starting_angle: header.rotation_axis_start,
            first_image_number,
            number_images,
            name_template_image,
            wedge_number: settings.wedge_number,
            overlap: settings.overlap,
            radiation_damage: settings.radiation_damage,
            on_cluster: settings.on_cluster,
        })
    }

    /// The angle image #1 would have started at, whichever image the batch starts at
    pub fn overall_starting_angle(&self) -> f64 {
        self.starting_angle - (self.first_image_number as f64 - 1.0) * self.oscillation_range
    }

    /// Mid-point rotation angle of an image of this batch
    pub fn image_angle(&self, image_number: u32) -> f64 {
        self.starting_angle
            + (image_number as f64 - self.first_image_number as f64)
                * (self.oscillation_range - self.overlap)
            + self.oscillation_range / 2.0
    }
}
