use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::execution::ExecutorConfig;
use super::header::ImageHeader;
use super::image_set::ImageSource;
use super::params::BatchSettings;
use super::site::SiteConfig;

/// Structure representing the application configuration. Contains the image source, batch
/// controls and the site/executor setup.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub image_source: Option<ImageSource>,
    pub working_path: PathBuf,
    pub batch_size: Option<usize>,
    /// Angular overlap between images in degrees; non-zero forces one image per batch
    pub overlap: f64,
    pub beamline: Option<String>,
    pub spot_size: Option<u32>,
    pub spot_level: Option<u32>,
    pub wedge_number: Option<u32>,
    pub radiation_damage: bool,
    pub mesh: bool,
    pub on_cluster: bool,
    /// Attach the spot table of every image to the results
    pub return_spot_list: bool,
    /// When set a CSV summary and gnuplot script are written for this data collection
    pub data_collection_id: Option<u64>,
    pub executor: ExecutorConfig,
    pub site: SiteConfig,
    /// Experimental conditions to use for every image when no header reader is available
    pub header: Option<ImageHeader>,
}

impl Default for Config {
    /// Generate a new Config object. Paths are placeholders
    fn default() -> Self {
        Self {
            image_source: Some(ImageSource::Template {
                directory: PathBuf::from("None"),
                template: String::from("sample_1_####.cbf"),
                start_number: 1,
                end_number: 1,
            }),
            working_path: PathBuf::from("None"),
            batch_size: None,
            overlap: 0.0,
            beamline: None,
            spot_size: None,
            spot_level: None,
            wedge_number: None,
            radiation_damage: false,
            mesh: false,
            on_cluster: false,
            return_spot_list: false,
            data_collection_id: None,
            executor: ExecutorConfig::default(),
            site: SiteConfig::default(),
            header: None,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;
        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.batch_size {
            Some(0) => Err(ConfigError::BadBatchSize(0)),
            _ => Ok(()),
        }
    }

    /// Settings shared by every batch, given the overlap the run was resolved to
    pub fn batch_settings(&self, overlap: f64) -> BatchSettings {
        BatchSettings {
            beamline: self.beamline.clone(),
            spot_size: self.spot_size,
            spot_level: self.spot_level,
            wedge_number: self.wedge_number,
            overlap,
            radiation_damage: self.radiation_damage,
            mesh: self.mesh,
            on_cluster: self.on_cluster,
            return_spot_list: self.return_spot_list,
        }
    }
}
