use fxhash::FxHashMap;
use serde::Serialize;
use std::path::Path;

use super::error::PlotFormatError;

/// One series of a plot, with its own attributes and x/y data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubPlot {
    pub name: String,
    pub attributes: FxHashMap<String, String>,
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
}

/// How a series should be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotStyle {
    Marker,
    Line,
}

impl SubPlot {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn style(&self) -> PlotStyle {
        if self.attributes.contains_key("markercolor") {
            PlotStyle::Marker
        } else {
            PlotStyle::Line
        }
    }

    pub fn legend_label(&self) -> Option<&str> {
        self.attributes.get("linelabel").map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLimits {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// A single plot: a name, its attributes (axis labels, range overrides) and its series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlotBlock {
    pub name: String,
    pub attributes: FxHashMap<String, String>,
    pub subplots: Vec<SubPlot>,
}

impl PlotBlock {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Data range over every series, with the `xmin` and `ymin` attributes taking precedence.
    ///
    /// Returns None when the block holds no data points.
    pub fn axis_limits(&self) -> Option<AxisLimits> {
        let (x_min, x_max) = min_max(self.subplots.iter().flat_map(|s| s.x_values.iter()))?;
        let (y_min, y_max) = min_max(self.subplots.iter().flat_map(|s| s.y_values.iter()))?;
        Some(AxisLimits {
            x_min: self.attribute_f64("xmin").unwrap_or(x_min),
            x_max,
            y_min: self.attribute_f64("ymin").unwrap_or(y_min),
            y_max,
        })
    }

    /// File stem for the rendered plot: no spaces, dots replaced by underscores
    pub fn output_file_stem(&self) -> String {
        self.name.replace(' ', "").replace('.', "_")
    }

    fn attribute_f64(&self, key: &str) -> Option<f64> {
        let raw = self.attributes.get(key)?;
        match raw.parse::<f64>() {
            Ok(value) => Some(value),
            Err(e) => {
                spdlog::warn!("Ignoring plot attribute {} = '{}': {}", key, raw, e);
                None
            }
        }
    }
}

fn min_max<'a>(values: impl Iterator<Item = &'a f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
    })
}

/// Every plot described by one plot file, in file order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlotDocument {
    pub blocks: Vec<PlotBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    AwaitingBlock,
    InBlockAttrs,
    AwaitingSubplotOrData,
    InSubplotAttrs,
    InSubplotData,
}

/// Split a `%label = value` line. Quoted values keep only the text inside the first quotes.
fn parse_attribute(line: &str, line_no: usize) -> Result<(String, String), PlotFormatError> {
    let mut parts = line.split('=');
    let label = parts.next().unwrap_or_default();
    let value = parts
        .next()
        .ok_or(PlotFormatError::MissingEquals(line_no))?;
    let value = if value.contains('\'') {
        value.split('\'').nth(1).unwrap_or_default()
    } else {
        value
    };
    Ok((
        label.trim_start_matches('%').trim().to_string(),
        value.trim().to_string(),
    ))
}

fn parse_data_row(line: &str, line_no: usize) -> Result<(f64, f64), PlotFormatError> {
    let mut tokens = line.split_whitespace();
    let (x, y) = match (tokens.next(), tokens.next()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(PlotFormatError::ShortDataRow(line_no)),
    };
    let parse = |tok: &str| {
        tok.parse::<f64>()
            .map_err(|e| PlotFormatError::BadValue(line_no, e))
    };
    Ok((parse(x)?, parse(y)?))
}

/// Decode a plot description in one forward pass.
///
/// Line numbers in errors are 1-based. Blank lines are skipped. Any malformed line
/// rejects the whole document.
pub fn decode(text: &str) -> Result<PlotDocument, PlotFormatError> {
    let mut doc = PlotDocument::default();
    let mut state = ParseState::AwaitingBlock;
    let mut lines = text.lines().enumerate().map(|(idx, line)| (idx + 1, line));

    while let Some((line_no, line)) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with('$') {
            let (_, name_line) = lines
                .next()
                .ok_or(PlotFormatError::MissingBlockName(line_no))?;
            let name = name_line
                .split('\'')
                .nth(1)
                .ok_or(PlotFormatError::UnquotedBlockName(line_no + 1))?;
            doc.blocks.push(PlotBlock::new(name.to_string()));
            state = ParseState::InBlockAttrs;
            continue;
        }

        if line.starts_with('%') {
            let target = match (state, doc.blocks.last_mut()) {
                (ParseState::InBlockAttrs, Some(block)) => Some(&mut block.attributes),
                (ParseState::InSubplotAttrs, Some(block)) => {
                    block.subplots.last_mut().map(|sub| &mut sub.attributes)
                }
                _ => None,
            };
            // Outside an attribute run a % line falls through to the data rules
            if let Some(attributes) = target {
                let (label, value) = parse_attribute(line, line_no)?;
                attributes.insert(label, value);
                continue;
            }
        }

        if let Some(rest) = line.strip_prefix('#') {
            let block = doc
                .blocks
                .last_mut()
                .ok_or(PlotFormatError::SubplotOutsideBlock(line_no))?;
            let name = rest.split('#').next().unwrap_or_default().trim();
            block.subplots.push(SubPlot::new(name.to_string()));
            state = ParseState::InSubplotAttrs;
            continue;
        }

        if state == ParseState::InBlockAttrs {
            state = ParseState::AwaitingSubplotOrData;
        }
        let subplot = match state {
            ParseState::InSubplotAttrs | ParseState::InSubplotData => doc
                .blocks
                .last_mut()
                .and_then(|block| block.subplots.last_mut()),
            _ => None,
        }
        .ok_or(PlotFormatError::DataOutsideSubplot(line_no))?;
        let (x, y) = parse_data_row(line, line_no)?;
        subplot.x_values.push(x);
        subplot.y_values.push(y);
        state = ParseState::InSubplotData;
    }
    Ok(doc)
}

/// Read and decode a plot description file
pub fn read_plot_file(path: &Path) -> Result<PlotDocument, PlotFormatError> {
    let text = std::fs::read_to_string(path)?;
    let doc = decode(&text)?;
    spdlog::info!(
        "Decoded {} plot(s) from {} ({})",
        doc.blocks.len(),
        path.display(),
        human_bytes::human_bytes(text.len() as f64)
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RD_PLOT: &str = "$ DATA=CURVE2D\n\
% toplabel = 'Plot1'\n\
%xlabel = 'Dose'\n\
%ylabel = \"Intensity\"\n\
% xmin = 0.0\n\
# Series A\n\
% linelabel = 'A'\n\
1.0 2.0\n\
2.0 3.0\n";

    #[test]
    fn test_single_block_and_subplot() {
        let doc = decode(RD_PLOT).unwrap();
        assert_eq!(doc.blocks.len(), 1);
        let block = &doc.blocks[0];
        assert_eq!(block.name, "Plot1");
        assert_eq!(block.attributes.get("xlabel").map(String::as_str), Some("Dose"));
        assert_eq!(block.attributes.get("xmin").map(String::as_str), Some("0.0"));
        assert_eq!(block.subplots.len(), 1);
        let sub = &block.subplots[0];
        assert_eq!(sub.name, "Series A");
        assert_eq!(sub.legend_label(), Some("A"));
        assert_eq!(sub.x_values, vec![1.0, 2.0]);
        assert_eq!(sub.y_values, vec![2.0, 3.0]);
        assert_eq!(sub.style(), PlotStyle::Line);
    }

    #[test]
    fn test_multiple_blocks_and_limits() {
        let text = "$\n'Rel. Intensity'\n%xlabel = Dose\n%ymin = -1\n#fit\n%markercolor = 3\n%linelabel='fit'\n0 5\n4 1\n#data\n1 6\n2 0.5\n$\n'Second'\n#only\n10 10\n";
        let doc = decode(text).unwrap();
        assert_eq!(doc.blocks.len(), 2);
        let first = &doc.blocks[0];
        assert_eq!(first.subplots.len(), 2);
        assert_eq!(first.subplots[0].style(), PlotStyle::Marker);
        assert_eq!(first.subplots[1].legend_label(), None);
        assert_eq!(
            first.axis_limits(),
            Some(AxisLimits {
                x_min: 0.0,
                x_max: 4.0,
                y_min: -1.0,
                y_max: 6.0,
            })
        );
        assert_eq!(first.output_file_stem(), "Rel_Intensity");
        assert_eq!(doc.blocks[1].subplots[0].x_values, vec![10.0]);
    }

    #[test]
    fn test_missing_equals() {
        let text = "$\n'P'\n%xlabel Dose\n";
        assert!(matches!(decode(text), Err(PlotFormatError::MissingEquals(3))));
    }

    #[test]
    fn test_short_data_row() {
        let text = "$\n'P'\n#s\n1.0\n";
        assert!(matches!(decode(text), Err(PlotFormatError::ShortDataRow(4))));
    }

    #[test]
    fn test_bad_value() {
        let text = "$\n'P'\n#s\n1.0 abc\n";
        assert!(matches!(decode(text), Err(PlotFormatError::BadValue(4, _))));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(decode("$\n"), Err(PlotFormatError::MissingBlockName(1))));
        assert!(matches!(
            decode("$\nPlot\n"),
            Err(PlotFormatError::UnquotedBlockName(2))
        ));
        assert!(matches!(
            decode("#s\n1 2\n"),
            Err(PlotFormatError::SubplotOutsideBlock(1))
        ));
        assert!(matches!(
            decode("$\n'P'\n1 2\n"),
            Err(PlotFormatError::DataOutsideSubplot(3))
        ));
    }

    #[test]
    fn test_empty_block_has_no_limits() {
        let doc = decode("$\n'P'\n#s\n").unwrap();
        assert_eq!(doc.blocks[0].axis_limits(), None);
    }

    #[test]
    fn test_read_plot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dozor_rd.mtv");
        std::fs::write(&path, RD_PLOT).unwrap();
        let doc = read_plot_file(&path).unwrap();
        assert_eq!(doc.blocks[0].subplots[0].y_values, vec![2.0, 3.0]);
    }
}
