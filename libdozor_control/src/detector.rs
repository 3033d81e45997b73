use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::error::DetectorError;

/// The detectors dozor knows how to read, keyed by the identifier the image headers use.
///
/// Serialized as that identifier; an unknown one fails to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DetectorType {
    Pilatus2M,
    Pilatus3_2M,
    Pilatus6M,
    Eiger4M,
    Eiger9M,
    Eiger16M,
    Eiger2_9M,
    Eiger2_16M,
}

/// Pixel dimensions and physical pixel size (mm) of a detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorGeometry {
    pub nx: u32,
    pub ny: u32,
    pub pixel_size: f64,
}

/// Rectangle of pixels (inclusive) excluded from spot search, usually the beamstop shadow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadRegion {
    pub ix_min: u32,
    pub ix_max: u32,
    pub iy_min: u32,
    pub iy_max: u32,
}

impl BadRegion {
    pub const fn new(ix_min: u32, ix_max: u32, iy_min: u32, iy_max: u32) -> Self {
        Self {
            ix_min,
            ix_max,
            iy_min,
            iy_max,
        }
    }
}

const PILATUS_PIXEL_SIZE: f64 = 0.172;
const EIGER_PIXEL_SIZE: f64 = 0.075;

// Default beamstop regions for the ESRF detectors
// Pilatus 2M, ID30a1
const BAD_REGION_PILATUS_2M: BadRegion = BadRegion::new(1, 776, 826, 894);
// Pilatus 6M, ID23eh1
const BAD_REGION_PILATUS_6M: BadRegion = BadRegion::new(1, 1230, 1228, 1298);
// Eiger 4M, ID30a3
const BAD_REGION_EIGER_4M: BadRegion = BadRegion::new(1, 1120, 1025, 1140);

impl DetectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pilatus2M => "pilatus2m",
            Self::Pilatus3_2M => "pilatus3_2m",
            Self::Pilatus6M => "pilatus6m",
            Self::Eiger4M => "eiger4m",
            Self::Eiger9M => "eiger9m",
            Self::Eiger16M => "eiger16m",
            Self::Eiger2_9M => "eiger2_9m",
            Self::Eiger2_16M => "eiger2_16m",
        }
    }

    /// Built-in geometry of the detector
    pub fn geometry(&self) -> DetectorGeometry {
        let (nx, ny, pixel_size) = match self {
            Self::Pilatus2M | Self::Pilatus3_2M => (1475, 1679, PILATUS_PIXEL_SIZE),
            Self::Pilatus6M => (2463, 2527, PILATUS_PIXEL_SIZE),
            Self::Eiger4M => (2070, 2167, EIGER_PIXEL_SIZE),
            Self::Eiger9M => (3110, 3269, EIGER_PIXEL_SIZE),
            Self::Eiger16M => (4150, 4371, EIGER_PIXEL_SIZE),
            Self::Eiger2_9M => (3108, 3262, EIGER_PIXEL_SIZE),
            Self::Eiger2_16M => (4148, 4362, EIGER_PIXEL_SIZE),
        };
        DetectorGeometry { nx, ny, pixel_size }
    }

    /// Eiger images are read through the HDF5 container library
    pub fn is_eiger(&self) -> bool {
        matches!(
            self,
            Self::Eiger4M | Self::Eiger9M | Self::Eiger16M | Self::Eiger2_9M | Self::Eiger2_16M
        )
    }

    /// Built-in bad region preset. Only three detectors have one.
    pub fn default_bad_region(&self) -> Option<BadRegion> {
        match self {
            Self::Pilatus2M => Some(BAD_REGION_PILATUS_2M),
            Self::Pilatus6M => Some(BAD_REGION_PILATUS_6M),
            Self::Eiger4M => Some(BAD_REGION_EIGER_4M),
            _ => None,
        }
    }
}

impl FromStr for DetectorType {
    type Err = DetectorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pilatus2m" => Ok(Self::Pilatus2M),
            "pilatus3_2m" => Ok(Self::Pilatus3_2M),
            "pilatus6m" => Ok(Self::Pilatus6M),
            "eiger4m" => Ok(Self::Eiger4M),
            "eiger9m" => Ok(Self::Eiger9M),
            "eiger16m" => Ok(Self::Eiger16M),
            "eiger2_9m" => Ok(Self::Eiger2_9M),
            "eiger2_16m" => Ok(Self::Eiger2_16M),
            _ => Err(DetectorError::UnknownDetector(s.to_string())),
        }
    }
}

impl TryFrom<String> for DetectorType {
    type Error = DetectorError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<DetectorType> for String {
    fn from(value: DetectorType) -> Self {
        value.as_str().to_string()
    }
}

impl Display for DetectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
