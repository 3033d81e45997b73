use serde::Serialize;
use std::path::{Path, PathBuf};

use super::decoder::ImageResultRecord;
use super::error::SummaryError;

/// Visible resolutions at or above this are ignored when picking the low resolution limit
const RESOLUTION_CUTOFF: f64 = 10.0;
const HIGH_RESOLUTION_LIMIT: f64 = 0.8;
const LOW_RESOLUTION_LIMIT: f64 = 4.5;
/// Scores below this are considered zero
const FLAT_SCORE: f64 = 0.001;

/// Files written by [`write_summary`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryFiles {
    pub csv: PathBuf,
    pub gnuplot_script: PathBuf,
    /// Image the gnuplot script renders to; it only exists once the script has been run
    pub plot: PathBuf,
}

/// Axis ranges for the image quality plot
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRanges {
    pub min_image_number: f64,
    pub max_image_number: f64,
    pub min_angle: f64,
    pub max_angle: f64,
    pub min_resolution: f64,
    pub max_resolution: f64,
    pub xtics: &'static str,
    pub yscale: &'static str,
}

impl PlotRanges {
    pub fn from_records(records: &[ImageResultRecord]) -> Result<Self, SummaryError> {
        let first_by_number = records
            .iter()
            .min_by_key(|rec| rec.number)
            .ok_or(SummaryError::NoResults)?;
        let last_by_number = records
            .iter()
            .max_by_key(|rec| rec.number)
            .ok_or(SummaryError::NoResults)?;

        let mut min_image_number = first_by_number.number as f64;
        let mut max_image_number = last_by_number.number as f64;
        let mut min_angle = first_by_number.angle;
        let mut max_angle = last_by_number.angle;
        let mut xtics = "";

        if first_by_number.number == last_by_number.number {
            min_angle -= 1.0;
            max_angle += 1.0;
        }
        let n_images = max_image_number - min_image_number + 1.0;
        if n_images <= 4.0 {
            min_image_number -= 0.1;
            max_image_number += 0.1;
            let delta = max_angle - min_angle;
            min_angle -= delta * 0.1 / n_images;
            max_angle += delta * 0.1 / n_images;
            xtics = "1";
        }

        let visible = records.iter().filter_map(|rec| rec.visible_resolution);
        let best = visible.clone().reduce(f64::min);
        let worst = visible
            .filter(|res| *res < RESOLUTION_CUTOFF)
            .reduce(f64::max);
        let max_resolution = match best {
            Some(res) if res <= HIGH_RESOLUTION_LIMIT => (res * 10.0).trunc() / 10.0,
            _ => HIGH_RESOLUTION_LIMIT,
        };
        let min_resolution = match worst {
            Some(res) if res >= LOW_RESOLUTION_LIMIT => (res * 10.0).trunc() / 10.0 + 1.0,
            _ => LOW_RESOLUTION_LIMIT,
        };

        let flat_scores = records
            .iter()
            .filter_map(|rec| rec.main_score)
            .all(|score| score < FLAT_SCORE);
        let yscale = if flat_scores {
            "set yrange [-0.5:0.5]\n    set ytics 1"
        } else {
            "set autoscale  y"
        };

        Ok(Self {
            min_image_number,
            max_image_number,
            min_angle,
            max_angle,
            min_resolution,
            max_resolution,
            xtics,
            yscale,
        })
    }
}

fn fmt_optional(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

/// CSV table of the per image quality indicators. Missing values print as NaN.
pub fn csv_text(directory: &Path, template: &str, records: &[ImageResultRecord]) -> String {
    let mut text = format!(
        "# Data directory: {}\n# File template: {template}\n",
        directory.display()
    );
    text.push_str(&format!(
        "# {:>9}{:>16}{:>16}{:>16}{:>16}{:>16}\n",
        "'Image no'",
        "'Angle'",
        "'No of spots'",
        "'Main score (*10)'",
        "'Spot score'",
        "'Visible res.'"
    ));
    for rec in records {
        let spots = rec
            .spots_num_of
            .map(|n| n.to_string())
            .unwrap_or_else(|| String::from("NaN"));
        text.push_str(&format!(
            "{:10},{:15.3},{:>15},{:15.3},{:15.3},{:15.3}\n",
            rec.number,
            rec.angle,
            spots,
            10.0 * fmt_optional(rec.main_score),
            fmt_optional(rec.spot_score),
            fmt_optional(rec.visible_resolution)
        ));
    }
    text
}

/// gnuplot script drawing spots, score and visible resolution against image number
pub fn gnuplot_script(
    title: &str,
    plot_file_name: &str,
    csv_file_name: &str,
    ranges: &PlotRanges,
) -> String {
    format!(
        "#
set terminal png
set output '{plot_file_name}'
set title '{title}'
set grid x2 y2
set xlabel 'Image number'
set x2label 'Angle (degrees)'
set y2label 'Resolution (A)'
set ylabel 'Number of spots / ExecDozor score (*10)'
set xtics {xtics} nomirror
set x2tics
set ytics nomirror
set y2tics
set xrange [{min_image}:{max_image}]
set x2range [{min_angle}:{max_angle}]
{yscale}
set y2range [{min_res}:{max_res}]
set key below
plot '{csv_file_name}' using 1:3 title 'Number of spots' axes x1y1 with points linetype rgb 'goldenrod' pointtype 7 pointsize 1.5, \\
    '{csv_file_name}' using 1:4 title 'ExecDozor score' axes x1y1 with points linetype 3 pointtype 7 pointsize 1.5, \\
    '{csv_file_name}' using 1:6 title 'Visible resolution' axes x1y2 with points linetype 1 pointtype 7 pointsize 1.5
",
        xtics = ranges.xtics,
        min_image = ranges.min_image_number,
        max_image = ranges.max_image_number,
        min_angle = ranges.min_angle,
        max_angle = ranges.max_angle,
        yscale = ranges.yscale,
        min_res = ranges.min_resolution,
        max_res = ranges.max_resolution,
    )
}

/// Write `dozor_<id>.csv` and `gnuplot.sh` into the working directory
pub fn write_summary(
    working_dir: &Path,
    data_collection_id: u64,
    directory: &Path,
    template: &str,
    records: &[ImageResultRecord],
) -> Result<SummaryFiles, SummaryError> {
    let ranges = PlotRanges::from_records(records)?;
    let csv_name = format!("dozor_{data_collection_id}.csv");
    let plot_name = format!("dozor_{data_collection_id}.png");

    let files = SummaryFiles {
        csv: working_dir.join(&csv_name),
        gnuplot_script: working_dir.join("gnuplot.sh"),
        plot: working_dir.join(&plot_name),
    };
    let csv = csv_text(directory, template, records);
    std::fs::write(&files.csv, &csv)?;
    std::fs::write(
        &files.gnuplot_script,
        gnuplot_script(template, &plot_name, &csv_name, &ranges),
    )?;
    spdlog::info!(
        "Wrote quality summary for {} images to {} ({})",
        records.len(),
        files.csv.display(),
        human_bytes::human_bytes(csv.len() as f64)
    );
    Ok(files)
}
