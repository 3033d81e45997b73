use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::error::ImageSetError;

/// Mapping of image number to image path. Iteration is always in ascending image number.
pub type ImageMap = BTreeMap<u32, PathBuf>;

static WILDCARD_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#+|\?+").expect("valid wildcard regex"));
static PRINTF_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%0?(\d*)d").expect("valid printf regex"));

/// A data collection record as stored in the external catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub image_directory: PathBuf,
    /// printf style template, i.e. `sample_1_%04d.cbf`
    pub file_template: String,
    pub start_image_number: u32,
    pub number_of_images: u32,
    pub overlap: Option<f64>,
}

/// The three ways a set of images can be described
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Images(Vec<PathBuf>),
    Template {
        directory: PathBuf,
        template: String,
        start_number: u32,
        end_number: u32,
    },
    Catalog(CatalogRecord),
}

/// The pieces of an image file name, split around the embedded image number.
///
/// `sample_1_0042.cbf` -> prefix `sample_1`, number 42, suffix `cbf`. The number is the
/// last `_` separated token of the stem made only of digits, so container master files
/// (`sample_1_master.h5`) resolve to their file number.
///
/// Container data files (`sample_1_data_000042.h5`) carry the frame as their number and
/// the container file number separately: prefix `sample`, file number 1, number 42.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageName {
    pub prefix: String,
    pub number: u32,
    /// Number of the container file the image lives in; equal to `number` otherwise
    pub file_number: u32,
    pub suffix: String,
}

fn is_number_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

impl ImageName {
    pub fn parse(path: &Path) -> Result<Self, ImageSetError> {
        let bad_name = || ImageSetError::NoImageNumber(path.to_path_buf());
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(bad_name)?;
        let (stem, suffix) = match file_name.split_once('.') {
            Some((stem, suffix)) => (stem, suffix),
            None => (file_name.as_str(), ""),
        };
        let tokens: Vec<&str> = stem.split('_').collect();
        let idx = tokens
            .iter()
            .rposition(|tok| is_number_token(tok))
            .ok_or_else(bad_name)?;
        let number: u32 = tokens[idx].parse().map_err(|_| bad_name())?;

        // <prefix>_<file>_data_<frame>.h5
        if suffix.ends_with("h5") && idx >= 2 && tokens[idx - 1] == "data" {
            if let Ok(file_number) = tokens[idx - 2].parse::<u32>() {
                return Ok(Self {
                    prefix: tokens[..idx - 2].join("_"),
                    number,
                    file_number,
                    suffix: suffix.to_string(),
                });
            }
        }
        Ok(Self {
            prefix: tokens[..idx].join("_"),
            number,
            file_number: number,
            suffix: suffix.to_string(),
        })
    }

    pub fn is_hdf5(&self) -> bool {
        self.suffix.ends_with("h5")
    }

    /// The `?` name template dozor expects for a batch starting at this image
    pub fn dozor_template(&self) -> String {
        if self.is_hdf5() {
            format!("{}_{}_??????.{}", self.prefix, self.file_number, self.suffix)
        } else if self.number < 10000 {
            format!("{}_????.{}", self.prefix, self.suffix)
        } else {
            format!("{}_?????.{}", self.prefix, self.suffix)
        }
    }
}

/// Extract the image number embedded in an image path
pub fn image_number(path: &Path) -> Result<u32, ImageSetError> {
    Ok(ImageName::parse(path)?.number)
}

/// Replace the first run of `#` or `?` in a template with a zero padded number
pub fn render_wildcard_template(template: &str, number: u32) -> Option<String> {
    let found = WILDCARD_PLACEHOLDER.find(template)?;
    let width = found.len();
    Some(format!(
        "{}{:0width$}{}",
        &template[..found.start()],
        number,
        &template[found.end()..]
    ))
}

/// Replace a printf style `%0Nd` in a template with a zero padded number
fn render_printf_template(template: &str, number: u32) -> Option<String> {
    let caps = PRINTF_PLACEHOLDER.captures(template)?;
    let found = caps.get(0)?;
    let width: usize = caps
        .get(1)
        .and_then(|w| w.as_str().parse().ok())
        .unwrap_or(0);
    Some(format!(
        "{}{:0width$}{}",
        &template[..found.start()],
        number,
        &template[found.end()..]
    ))
}

/// Display form of a printf template, `%04d` becomes `####`
fn printf_to_display(template: &str) -> String {
    PRINTF_PLACEHOLDER
        .replace(template, |caps: &regex::Captures| {
            let width: usize = caps[1].parse().unwrap_or(1);
            "#".repeat(width)
        })
        .to_string()
}

/// The resolved set of images of a data collection.
///
/// Besides the image map it keeps a display directory and template (`####` form) which
/// are used to label summaries.
#[derive(Debug, Clone)]
pub struct ImageSet {
    images: ImageMap,
    directory: PathBuf,
    template: String,
}

impl ImageSet {
    /// Resolve an image source into an ImageSet
    pub fn resolve(source: Option<&ImageSource>) -> Result<Self, ImageSetError> {
        match source {
            None => Err(ImageSetError::NoImageSource),
            Some(ImageSource::Images(list)) => Self::from_image_list(list),
            Some(ImageSource::Template {
                directory,
                template,
                start_number,
                end_number,
            }) => Self::from_template(directory, template, *start_number, *end_number),
            Some(ImageSource::Catalog(record)) => Self::from_catalog(record),
        }
    }

    fn from_image_list(list: &[PathBuf]) -> Result<Self, ImageSetError> {
        let first = list.first().ok_or(ImageSetError::EmptyImageList)?;
        let directory = first.parent().map(Path::to_path_buf).unwrap_or_default();
        let template = first
            .file_name()
            .map(|name| name.to_string_lossy().replace("0001", "####"))
            .unwrap_or_default();
        let mut images = ImageMap::new();
        for path in list {
            images.insert(image_number(path)?, path.clone());
        }
        Ok(Self {
            images,
            directory,
            template,
        })
    }

    fn from_template(
        directory: &Path,
        template: &str,
        start: u32,
        end: u32,
    ) -> Result<Self, ImageSetError> {
        if !WILDCARD_PLACEHOLDER.is_match(template) {
            return Err(ImageSetError::BadTemplate(template.to_string()));
        }
        if end < start {
            return Err(ImageSetError::BadRange(start, end));
        }
        let mut images = ImageMap::new();
        for index in start..=end {
            let name = render_wildcard_template(template, index)
                .ok_or_else(|| ImageSetError::BadTemplate(template.to_string()))?;
            let path = directory.join(name);
            images.insert(image_number(&path)?, path);
        }
        Ok(Self {
            images,
            directory: directory.to_path_buf(),
            template: template.replace('?', "#"),
        })
    }

    fn from_catalog(record: &CatalogRecord) -> Result<Self, ImageSetError> {
        let template = &record.file_template;
        if !PRINTF_PLACEHOLDER.is_match(template) {
            return Err(ImageSetError::BadTemplate(template.clone()));
        }
        if record.number_of_images == 0 {
            return Err(ImageSetError::EmptyImageList);
        }
        let start = record.start_image_number;
        let end = start
            .checked_add(record.number_of_images - 1)
            .ok_or(ImageSetError::BadRange(start, u32::MAX))?;
        let mut images = ImageMap::new();
        for index in start..=end {
            let name = render_printf_template(template, index)
                .ok_or_else(|| ImageSetError::BadTemplate(template.clone()))?;
            let path = record.image_directory.join(name);
            images.insert(image_number(&path)?, path);
        }
        Ok(Self {
            images,
            directory: record.image_directory.clone(),
            template: printf_to_display(template),
        })
    }

    pub fn images(&self) -> &ImageMap {
        &self.images
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_name() {
        let name = ImageName::parse(Path::new("/data/id23/sample_1_0042.cbf")).unwrap();
        assert_eq!(
            name,
            ImageName {
                prefix: String::from("sample_1"),
                number: 42,
                file_number: 42,
                suffix: String::from("cbf")
            }
        );
        assert_eq!(name.dozor_template(), "sample_1_????.cbf");

        let master = ImageName::parse(Path::new("/data/mesh_1_master.h5")).unwrap();
        assert_eq!(master.number, 1);
        assert!(master.is_hdf5());
        assert_eq!(master.dozor_template(), "mesh_1_??????.h5");

        let big = ImageName::parse(Path::new("line_12345.cbf")).unwrap();
        assert_eq!(big.dozor_template(), "line_?????.cbf");

        assert!(ImageName::parse(Path::new("/data/notes.txt")).is_err());
    }

    #[test]
    fn test_container_data_file_name() {
        let name = ImageName::parse(Path::new("/data/x_1_data_000005.h5")).unwrap();
        assert_eq!(
            name,
            ImageName {
                prefix: String::from("x"),
                number: 5,
                file_number: 1,
                suffix: String::from("h5")
            }
        );
        assert_eq!(name.dozor_template(), "x_1_??????.h5");

        let other = ImageName::parse(Path::new("/data/ref-x_2_3_data_000104.h5")).unwrap();
        assert_eq!(other.prefix, "ref-x_2");
        assert_eq!(other.file_number, 3);
        assert_eq!(other.number, 104);
        assert_eq!(other.dozor_template(), "ref-x_2_3_??????.h5");

        // Only container files get the data file split
        let cbf = ImageName::parse(Path::new("/data/x_1_data_0005.cbf")).unwrap();
        assert_eq!(cbf.prefix, "x_1_data");
        assert_eq!(cbf.file_number, 5);
    }

    #[test]
    fn test_resolve_image_list() {
        let source = ImageSource::Images(vec![
            PathBuf::from("/data/x_0001.cbf"),
            PathBuf::from("/data/x_0007.cbf"),
            PathBuf::from("/data/x_0003.cbf"),
        ]);
        let set = ImageSet::resolve(Some(&source)).unwrap();
        let keys: Vec<u32> = set.images().keys().copied().collect();
        assert_eq!(keys, vec![1, 3, 7]);
        assert_eq!(set.template(), "x_####.cbf");
        assert_eq!(set.directory(), Path::new("/data"));
    }

    #[test]
    fn test_resolve_template() {
        let source = ImageSource::Template {
            directory: PathBuf::from("/data"),
            template: String::from("ref-x_1_####.cbf"),
            start_number: 9,
            end_number: 11,
        };
        let set = ImageSet::resolve(Some(&source)).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.images()[&10], PathBuf::from("/data/ref-x_1_0010.cbf"));

        let wildcard = ImageSource::Template {
            directory: PathBuf::from("/data"),
            template: String::from("x_?????.cbf"),
            start_number: 1,
            end_number: 1,
        };
        let set = ImageSet::resolve(Some(&wildcard)).unwrap();
        assert_eq!(set.images()[&1], PathBuf::from("/data/x_00001.cbf"));
    }

    #[test]
    fn test_resolve_catalog() {
        let source = ImageSource::Catalog(CatalogRecord {
            image_directory: PathBuf::from("/data/visit"),
            file_template: String::from("insulin_1_%04d.cbf"),
            start_image_number: 1,
            number_of_images: 4,
            overlap: None,
        });
        let set = ImageSet::resolve(Some(&source)).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(
            set.images()[&4],
            PathBuf::from("/data/visit/insulin_1_0004.cbf")
        );
        assert_eq!(set.template(), "insulin_1_####.cbf");
    }

    #[test]
    fn test_resolve_failures() {
        assert!(matches!(
            ImageSet::resolve(None),
            Err(ImageSetError::NoImageSource)
        ));
        assert!(matches!(
            ImageSet::resolve(Some(&ImageSource::Images(vec![]))),
            Err(ImageSetError::EmptyImageList)
        ));
        let no_placeholder = ImageSource::Template {
            directory: PathBuf::from("/data"),
            template: String::from("x_0001.cbf"),
            start_number: 1,
            end_number: 2,
        };
        assert!(matches!(
            ImageSet::resolve(Some(&no_placeholder)),
            Err(ImageSetError::BadTemplate(_))
        ));
        let no_printf = ImageSource::Catalog(CatalogRecord {
            image_directory: PathBuf::from("/data"),
            file_template: String::from("x_####.cbf"),
            start_image_number: 1,
            number_of_images: 2,
            overlap: None,
        });
        assert!(matches!(
            ImageSet::resolve(Some(&no_printf)),
            Err(ImageSetError::BadTemplate(_))
        ));
        let past_the_end = ImageSource::Catalog(CatalogRecord {
            image_directory: PathBuf::from("/data"),
            file_template: String::from("x_%04d.cbf"),
            start_image_number: u32::MAX,
            number_of_images: 2,
            overlap: None,
        });
        assert!(matches!(
            ImageSet::resolve(Some(&past_the_end)),
            Err(ImageSetError::BadRange(u32::MAX, u32::MAX))
        ));
    }
}
