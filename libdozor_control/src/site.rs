use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::detector::{BadRegion, DetectorGeometry, DetectorType};

/// Backend library paths handed to dozor, one per image container format.
///
/// The cluster variants are used when batches are submitted to the scheduler, as the
/// compute nodes do not share the operating system of the control machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub cbf: Option<String>,
    pub hdf5: Option<String>,
    pub cluster_cbf: Option<String>,
    pub cluster_hdf5: Option<String>,
}

/// Overrides for a single beamline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeamlineConfig {
    pub bad_region: Option<BadRegion>,
    pub geometry: Option<DetectorGeometry>,
}

/// Site wide configuration for dozor runs.
///
/// Everything the CommandEncoder needs beyond the run parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    pub libraries: LibraryConfig,
    pub bad_zona: Option<String>,
    pub beamlines: FxHashMap<String, BeamlineConfig>,
}

impl SiteConfig {
    fn beamline(&self, beamline: Option<&str>) -> Option<&BeamlineConfig> {
        beamline.and_then(|name| self.beamlines.get(name))
    }

    /// Geometry for a detector; a beamline override wins over the built-in table
    pub fn geometry(&self, detector: DetectorType, beamline: Option<&str>) -> DetectorGeometry {
        self.beamline(beamline)
            .and_then(|bl| bl.geometry)
            .unwrap_or_else(|| detector.geometry())
    }

    /// Bad region for a detector; a beamline entry wins over the detector preset
    pub fn bad_region(&self, detector: DetectorType, beamline: Option<&str>) -> Option<BadRegion> {
        self.beamline(beamline)
            .and_then(|bl| bl.bad_region)
            .or_else(|| detector.default_bad_region())
    }

    /// Library path for the given container format
    pub fn library(&self, is_hdf5: bool, on_cluster: bool) -> Option<&str> {
        let libs = &self.libraries;
        let lib = match (is_hdf5, on_cluster) {
            (true, true) => &libs.cluster_hdf5,
            (true, false) => &libs.hdf5,
            (false, true) => &libs.cluster_cbf,
            (false, false) => &libs.cbf,
        };
        lib.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beamline_override_wins() {
        let mut site = SiteConfig::default();
        site.beamlines.insert(
            String::from("id23eh1"),
            BeamlineConfig {
                bad_region: Some(BadRegion::new(10, 20, 30, 40)),
                geometry: None,
            },
        );
        assert_eq!(
            site.bad_region(DetectorType::Pilatus6M, Some("id23eh1")),
            Some(BadRegion::new(10, 20, 30, 40))
        );
        assert_eq!(
            site.bad_region(DetectorType::Pilatus6M, Some("id30a1")),
            DetectorType::Pilatus6M.default_bad_region()
        );
        assert_eq!(site.bad_region(DetectorType::Eiger9M, None), None);
        assert_eq!(
            site.geometry(DetectorType::Eiger4M, Some("id23eh1")),
            DetectorType::Eiger4M.geometry()
        );
    }

    #[test]
    fn test_library_selection() {
        let site = SiteConfig {
            libraries: LibraryConfig {
                cbf: Some(String::from("/opt/xds-zcbf.so")),
                hdf5: Some(String::from("/opt/dectris-neggia.so")),
                cluster_cbf: None,
                cluster_hdf5: None,
            },
            ..Default::default()
        };
        assert_eq!(site.library(true, false), Some("/opt/dectris-neggia.so"));
        assert_eq!(site.library(false, false), Some("/opt/xds-zcbf.so"));
        assert_eq!(site.library(false, true), None);
    }
}
