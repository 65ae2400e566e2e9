use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One CSV row: a named skill active between two calendar dates.
///
/// `end` is always resolved; rows without an end date carry the ongoing
/// sentinel and `ongoing = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInterval {
    pub name: String,
    pub category: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub ongoing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisRole {
    Start,
    End,
}

/// Long-form point; two per skill interval.
///
/// `record` is the row index of the interval it came from, which is how the
/// renderer groups points back into one line even when skill names repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotPoint {
    pub record: usize,
    pub name: String,
    pub category: Option<String>,
    pub axis_role: AxisRole,
    pub value: NaiveDate,
    pub ongoing: bool,
}

/// X-axis domain. `max = None` means the axis grows to fit the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisDomain {
    pub min: NaiveDate,
    pub max: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
    #[default]
    Linear,
    Log,
}

/// Visual encoding of a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEncoding {
    pub category: String,
    pub color: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSpec {
    pub domain: AxisDomain,
    pub scale: TimeScale,
    pub tick_interval_years: u32,
    pub category_colors: BTreeMap<String, String>,
    /// Indexed by record.
    pub encodings: Vec<RecordEncoding>,
    /// Record indices from the top lane to the bottom lane.
    pub lanes: Vec<usize>,
    pub title: String,
    pub today: NaiveDate,
    pub canvas: Canvas,
    pub png_path: PathBuf,
    pub html_path: Option<PathBuf>,
}

/// Output of the transform phase, consumed once by the renderer.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub points: Vec<PlotPoint>,
    pub spec: RenderSpec,
}

#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub png: Vec<u8>,
    pub html: Option<String>,
}

/// Paths written by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub png_path: PathBuf,
    pub html_path: Option<PathBuf>,
}
