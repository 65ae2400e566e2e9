use crate::config::toml_config::{CategoryRule, LaneOrder, TimelineConfig, WeightConfig, WeightCurve};
use crate::core::reshape::{skill_lines, SkillLine};
use crate::domain::model::{AxisDomain, PlotPoint, RecordEncoding, RenderSpec};
use crate::utils::error::{Result, TimelineError};
use chrono::NaiveDate;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

pub const UNCATEGORIZED: &str = "uncategorized";

/// Colors for categories missing from the lookup table, picked by a stable
/// hash of the category name.
pub const FALLBACK_PALETTE: [&str; 10] = [
    "#2E86AB", "#A23B72", "#F18F01", "#C73E1D", "#592E83", "#048A81", "#6C757D", "#2A9D8F",
    "#E76F51", "#264653",
];

const DAYS_PER_YEAR: f64 = 365.25;

fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Keyword rules used when a row carries no category.
pub struct CategoryClassifier {
    rules: Vec<(String, Regex)>,
}

impl CategoryClassifier {
    pub fn new(rules: &[CategoryRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules.iter().filter(|rule| !rule.keywords.is_empty()) {
            let alternatives = rule
                .keywords
                .iter()
                .map(|keyword| regex::escape(keyword.trim()))
                .collect::<Vec<_>>()
                .join("|");
            // Whole words only: "Go" must not match "Google Cloud".
            let pattern = format!(r"(?i)(?:^|[^\p{{L}}\p{{N}}])(?:{})(?:$|[^\p{{L}}\p{{N}}])", alternatives);
            let regex = Regex::new(&pattern).map_err(|e| TimelineError::ConfigValidationError {
                field: format!("categories.rules.{}", rule.name),
                message: e.to_string(),
            })?;
            compiled.push((rule.name.clone(), regex));
        }
        Ok(Self { rules: compiled })
    }

    pub fn classify(&self, name: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(_, regex)| regex.is_match(name))
            .map(|(category, _)| category.as_str())
    }
}

/// Category → color. Same name, same color, on every run.
pub struct ColorMap {
    table: HashMap<String, String>,
}

impl ColorMap {
    pub fn new(colors: &BTreeMap<String, String>) -> Self {
        let table = colors
            .iter()
            .map(|(category, color)| (normalize(category), color.to_uppercase()))
            .collect();
        Self { table }
    }

    pub fn color_for(&self, category: &str) -> String {
        let key = normalize(category);
        if let Some(color) = self.table.get(&key) {
            return color.clone();
        }
        let digest = Sha256::digest(key.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let index = (u64::from_be_bytes(prefix) % FALLBACK_PALETTE.len() as u64) as usize;
        FALLBACK_PALETTE[index].to_string()
    }
}

/// Line weight for an interval ending on `end`.
///
/// Monotonic non-decreasing in `end` and always within `[min, max]`. End
/// dates on or after `today` get `max`; end dates `horizon_years` or more in
/// the past get `min`.
pub fn recency_weight(end: NaiveDate, today: NaiveDate, weight: &WeightConfig) -> f64 {
    let age_years = (today - end).num_days() as f64 / DAYS_PER_YEAR;
    let horizon = weight.horizon_years.max(f64::EPSILON);
    let recency = 1.0 - (age_years / horizon).clamp(0.0, 1.0);

    let shaped = match weight.curve {
        WeightCurve::Linear => recency,
        WeightCurve::Log => (1.0 + 9.0 * recency).log10(),
        WeightCurve::Step => {
            let steps = weight.steps.max(1) as f64;
            (recency * steps).floor() / steps
        }
    };

    let (low, high) = if weight.min <= weight.max {
        (weight.min, weight.max)
    } else {
        (weight.max, weight.min)
    };
    (low + (high - low) * shaped.clamp(0.0, 1.0)).clamp(low, high)
}

/// Chart title with `{date}` replaced by the run date.
pub fn format_title(template: &str, date_format: &str, today: NaiveDate) -> String {
    let mut stamp = String::new();
    if write!(stamp, "{}", today.format(date_format)).is_err() {
        stamp = today.format("%Y-%m-%d").to_string();
    }
    if template.contains("{date}") {
        template.replace("{date}", &stamp)
    } else {
        format!("{} ({})", template, stamp)
    }
}

pub struct EncodingMapper<'a> {
    config: &'a TimelineConfig,
    today: NaiveDate,
    classifier: CategoryClassifier,
    colors: ColorMap,
}

impl<'a> EncodingMapper<'a> {
    pub fn new(config: &'a TimelineConfig, today: NaiveDate) -> Result<Self> {
        Ok(Self {
            config,
            today,
            classifier: CategoryClassifier::new(&config.categories.rules)?,
            colors: ColorMap::new(&config.categories.colors),
        })
    }

    /// Explicit category, then keyword rules, then the configured default.
    pub fn resolve_category(&self, name: &str, category: Option<&str>) -> Result<String> {
        if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
            return Ok(category.to_string());
        }
        if let Some(category) = self.classifier.classify(name) {
            return Ok(category.to_string());
        }
        match &self.config.input.default_category {
            Some(default) => Ok(default.clone()),
            None if self.config.input.require_category => {
                Err(TimelineError::UnknownCategoryError {
                    name: name.to_string(),
                })
            }
            None => Ok(UNCATEGORIZED.to_string()),
        }
    }

    pub fn domain(&self) -> AxisDomain {
        AxisDomain {
            min: self.config.axis.domain_start,
            max: self.config.axis.domain_end,
        }
    }

    fn lane_order(&self, lines: &[SkillLine<'_>], encodings: &[RecordEncoding]) -> Vec<usize> {
        let mut lanes: Vec<usize> = lines.iter().map(|line| line.record).collect();
        match self.config.axis.lane_order {
            LaneOrder::Input => {}
            LaneOrder::Start => {
                let start: HashMap<usize, NaiveDate> =
                    lines.iter().map(|line| (line.record, line.start)).collect();
                lanes.sort_by_key(|record| (start[record], *record));
            }
            LaneOrder::Category => {
                let mut rank: HashMap<String, usize> = HashMap::new();
                for category in &self.config.categories.order {
                    let next = rank.len();
                    rank.entry(normalize(category)).or_insert(next);
                }
                // Categories outside the configured order follow it, by first appearance.
                for line in lines {
                    let next = rank.len();
                    rank.entry(normalize(&encodings[line.record].category))
                        .or_insert(next);
                }
                let key: HashMap<usize, (usize, NaiveDate)> = lines
                    .iter()
                    .map(|line| {
                        let category = normalize(&encodings[line.record].category);
                        (line.record, (rank[&category], line.start))
                    })
                    .collect();
                lanes.sort_by_key(|record| (key[record], *record));
            }
        }
        lanes
    }

    pub fn encode(&self, points: &[PlotPoint]) -> Result<RenderSpec> {
        let lines = skill_lines(points);
        let record_count = lines.iter().map(|line| line.record + 1).max().unwrap_or(0);

        let mut encodings = vec![
            RecordEncoding {
                category: UNCATEGORIZED.to_string(),
                color: self.colors.color_for(UNCATEGORIZED),
                weight: self.config.weight.min,
            };
            record_count
        ];
        let mut category_colors = BTreeMap::new();
        // Legend entries are unique by normalized name; the first spelling is shown.
        let mut legend_keys = HashSet::new();

        for line in &lines {
            let category = self.resolve_category(line.name, line.category)?;
            let color = self.colors.color_for(&category);
            let weight = recency_weight(line.end, self.today, &self.config.weight);
            if legend_keys.insert(normalize(&category)) {
                category_colors.insert(category.clone(), color.clone());
            }
            encodings[line.record] = RecordEncoding {
                category,
                color,
                weight,
            };
        }

        let lanes = self.lane_order(&lines, &encodings);
        let title = format_title(
            &self.config.chart.title,
            &self.config.chart.date_format,
            self.today,
        );

        tracing::debug!(
            "Encoded {} lines across {} categories",
            lanes.len(),
            category_colors.len()
        );

        Ok(RenderSpec {
            domain: self.domain(),
            scale: self.config.axis.scale,
            tick_interval_years: self.config.axis.tick_interval_years,
            category_colors,
            encodings,
            lanes,
            title,
            today: self.today,
            canvas: self.config.output.canvas(),
            png_path: self.config.output.png_path.clone(),
            html_path: self.config.output.html_target(),
        })
    }
}
