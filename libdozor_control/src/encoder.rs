use super::error::EncoderError;
use super::params::{
    RunParameters, DEFAULT_FRACTION_POLARIZATION, DEFAULT_IMAGE_STEP, DEFAULT_SPOT_LEVEL,
};
use super::site::SiteConfig;

const PIXEL_MIN: u32 = 0;
const PIXEL_MAX: u32 = 64000;

/// CommandEncoder writes the `dozor.dat` input file for one batch.
///
/// The field order and numeric precision are what the dozor parser expects and must not
/// change: three decimals for physical quantities, one for the beam center, integers for
/// counts.
#[derive(Debug, Clone)]
pub struct CommandEncoder<'a> {
    site: &'a SiteConfig,
}

impl<'a> CommandEncoder<'a> {
    pub fn new(site: &'a SiteConfig) -> Self {
        Self { site }
    }

    /// Encode the run parameters into the dozor command protocol
    pub fn encode(&self, params: &RunParameters) -> Result<String, EncoderError> {
        let beamline = params.beamline.as_deref();
        let geometry = self.site.geometry(params.detector_type, beamline);
        let is_hdf5 = params.detector_type.is_eiger();
        let library = self
            .site
            .library(is_hdf5, params.on_cluster)
            .ok_or_else(|| {
                EncoderError::MissingLibrary(String::from(if is_hdf5 { "hdf5" } else { "cbf" }))
            })?;

        let mut lines: Vec<String> = vec![String::from("!")];
        lines.push(format!("detector {}", params.detector_type));
        lines.push(format!("library {library}"));
        lines.push(format!("nx {}", geometry.nx));
        lines.push(format!("ny {}", geometry.ny));
        lines.push(format!("pixel {:.6}", geometry.pixel_size));
        lines.push(format!("exposure {:.3}", params.exposure_time));
        lines.push(format!("spot_size {}", params.spot_size));
        lines.push(format!(
            "spot_level {}",
            params.spot_level.unwrap_or(DEFAULT_SPOT_LEVEL)
        ));
        lines.push(format!("detector_distance {:.3}", params.detector_distance));
        lines.push(format!("X-ray_wavelength {:.3}", params.wavelength));
        lines.push(format!(
            "fraction_polarization {:.3}",
            params
                .fraction_polarization
                .unwrap_or(DEFAULT_FRACTION_POLARIZATION)
        ));
        lines.push(format!("pixel_min {PIXEL_MIN}"));
        lines.push(format!("pixel_max {PIXEL_MAX}"));
        if let Some(region) = self.site.bad_region(params.detector_type, beamline) {
            lines.push(format!("ix_min {}", region.ix_min));
            lines.push(format!("ix_max {}", region.ix_max));
            lines.push(format!("iy_min {}", region.iy_min));
            lines.push(format!("iy_max {}", region.iy_max));
        }
        if let Some(bad_zona) = &self.site.bad_zona {
            lines.push(format!("bad_zona {bad_zona}"));
        }
        lines.push(format!("orgx {:.1}", params.orgx));
        lines.push(format!("orgy {:.1}", params.orgy));
        lines.push(format!("oscillation_range {:.3}", params.oscillation_range));
        lines.push(format!(
            "image_step {:.3}",
            params.image_step.unwrap_or(DEFAULT_IMAGE_STEP)
        ));
        lines.push(format!(
            "starting_angle {:.3}",
            params.overall_starting_angle()
        ));
        lines.push(format!("first_image_number {}", params.first_image_number));
        lines.push(format!("number_images {}", params.number_images));
        if let Some(wedge) = params.wedge_number {
            lines.push(format!("wedge_number {wedge}"));
        }
        lines.push(format!("name_template_image {}", params.name_template_image));
        lines.push(String::from("end"));

        spdlog::debug!(
            "Encoded dozor commands -- template: {}, first image: {}, images: {}",
            params.name_template_image,
            params.first_image_number,
            params.number_images
        );
        Ok(lines.join("\n") + "\n")
    }
}
