use ndarray::Array2;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::image_set::render_wildcard_template;
use super::params::RunParameters;
use super::spot_file::spot_file_path;

/// Number of banner lines at the top of the dozor log
const BANNER_LINES: usize = 6;
/// Rows shorter than this always use the short layout
const EXTENDED_MIN_TOKENS: usize = 11;
/// dozor reports this visible resolution when it has nothing better
pub const DEFAULT_VISIBLE_RESOLUTION: f64 = 40.0;
/// Plot description written by dozor in radiation damage mode
pub const PLOT_MTV_FILE_NAME: &str = "dozor_rd.mtv";

/// Secondary intensity falloff statistics, only present in the extended layout
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PowderWilson {
    pub scale: Option<f64>,
    pub b_factor: Option<f64>,
    pub resolution: Option<f64>,
    pub correlation: Option<f64>,
    pub r_factor: Option<f64>,
}

/// dozor's verdict on a single image. Every numeric field may be missing when the log
/// row could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageResultRecord {
    pub number: u32,
    pub image: String,
    pub angle: f64,
    pub spots_num_of: Option<u32>,
    pub spots_int_aver: Option<f64>,
    pub spots_r_factor: Option<f64>,
    pub spots_resolution: Option<f64>,
    pub powder_wilson: Option<PowderWilson>,
    pub main_score: Option<f64>,
    pub spot_score: Option<f64>,
    pub visible_resolution: Option<f64>,
    pub spot_file: Option<PathBuf>,
    /// Contents of the spot file, only loaded on request
    pub spot_list: Option<Array2<f64>>,
}

/// Everything extracted from one dozor run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DozorOutput {
    pub images: Vec<ImageResultRecord>,
    pub half_dose_time: Option<f64>,
    pub plot_mtv_file: Option<PathBuf>,
}

/// Parse a floating point field, logging instead of failing
fn parse_double(token: &str) -> Option<f64> {
    match token.parse::<f64>() {
        Ok(value) => Some(value),
        Err(e) => {
            spdlog::warn!("Could not parse '{}' from the dozor log: {}", token, e);
            None
        }
    }
}

fn parse_count(token: &str) -> Option<u32> {
    match token.parse::<u32>() {
        Ok(value) => Some(value),
        Err(e) => {
            spdlog::warn!("Could not parse '{}' from the dozor log: {}", token, e);
            None
        }
    }
}

/// Whitespace tokenizer that keeps quoted runs together and drops the quotes
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Concrete image file name for an image number, from the batch name template
fn image_name(template: &str, number: u32) -> String {
    let template = if template.ends_with(".h5") {
        template.replace("1_??????", "??????")
    } else {
        template.to_string()
    };
    render_wildcard_template(&template, number).unwrap_or(template)
}

fn parse_half_dose_time(line: &str) -> Option<f64> {
    let value = line.split('=').nth(1)?.split_whitespace().next()?;
    parse_double(value)
}

/// Decode one result row. The first token has already been checked to be an image number.
fn decode_row(
    tokens: &[String],
    number: u32,
    params: &RunParameters,
    working_dir: Option<&Path>,
) -> ImageResultRecord {
    let field = |idx: usize| tokens.get(idx).and_then(|tok| parse_double(tok));
    // Missing trailing column keeps dozor's default, an unreadable one is unknown
    let visible = |idx: usize| match tokens.get(idx) {
        Some(tok) => parse_double(tok),
        None => Some(DEFAULT_VISIBLE_RESOLUTION),
    };

    let is_short = tokens.len() < EXTENDED_MIN_TOKENS
        || tokens.get(5).is_some_and(|tok| tok.starts_with('-'));

    let mut record = ImageResultRecord {
        number,
        image: image_name(&params.name_template_image, number),
        angle: params.image_angle(number),
        spots_num_of: tokens.get(1).and_then(|tok| parse_count(tok)),
        spots_int_aver: field(2),
        spots_r_factor: field(3),
        spots_resolution: field(4),
        powder_wilson: None,
        main_score: None,
        spot_score: None,
        visible_resolution: Some(DEFAULT_VISIBLE_RESOLUTION),
        spot_file: None,
        spot_list: None,
    };
    if is_short {
        record.main_score = field(8);
        record.spot_score = field(9);
        record.visible_resolution = visible(10);
    } else {
        record.powder_wilson = Some(PowderWilson {
            scale: field(5),
            b_factor: field(6),
            resolution: field(7),
            correlation: field(8),
            r_factor: field(9),
        });
        record.main_score = field(10);
        record.spot_score = field(11);
        record.visible_resolution = visible(12);
    }

    if let Some(dir) = working_dir {
        let spot_file = spot_file_path(dir, number);
        if spot_file.exists() {
            record.spot_file = Some(spot_file);
        }
    }
    record
}

/// Decode the captured dozor log into per image records.
///
/// Records come out in log order. Lines which do not start with an image number are
/// ignored, apart from the half dose time line. Unparseable fields are left empty and
/// never abort the decode.
pub fn decode(log: &str, params: &RunParameters, working_dir: Option<&Path>) -> DozorOutput {
    let mut output = DozorOutput::default();
    for line in log.split('\n').skip(BANNER_LINES) {
        let tokens = tokenize(&line.replace('|', " "));
        let number = tokens
            .first()
            .filter(|tok| !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()))
            .and_then(|tok| tok.parse::<u32>().ok());
        if let Some(number) = number {
            output
                .images
                .push(decode_row(&tokens, number, params, working_dir));
        } else if line.starts_with('h') {
            if let Some(half_dose_time) = parse_half_dose_time(line) {
                output.half_dose_time = Some(half_dose_time);
            }
        }
    }

    if let Some(dir) = working_dir {
        let mtv = dir.join(PLOT_MTV_FILE_NAME);
        if mtv.exists() {
            output.plot_mtv_file = Some(mtv);
        }
    }
    output
}
