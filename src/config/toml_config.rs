use crate::domain::model::{Canvas, TimeScale};
use crate::utils::error::{Result, TimelineError};
use crate::utils::validation::{self, Validate};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Run configuration. Every section falls back to its defaults, so an empty
/// file (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub axis: AxisConfig,
    pub weight: WeightConfig,
    pub categories: CategoryConfig,
    pub chart: ChartConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: PathBuf,
    pub require_category: bool,
    pub default_category: Option<String>,
    pub strip_numeric_prefix: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("skills.csv"),
            require_category: false,
            default_category: Some("Other".to_string()),
            strip_numeric_prefix: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub png_path: PathBuf,
    pub html_path: PathBuf,
    pub write_html: bool,
    pub width: u32,
    pub height: u32,
    /// Pixel density multiplier applied when rasterising.
    pub scale: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            png_path: PathBuf::from("public/skills.png"),
            html_path: PathBuf::from("public/timeline.html"),
            write_html: true,
            width: 1200,
            height: 800,
            scale: 3,
        }
    }
}

impl OutputConfig {
    pub fn html_target(&self) -> Option<PathBuf> {
        self.write_html.then(|| self.html_path.clone())
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
            scale: self.scale,
        }
    }
}

/// End date given to rows whose `end` cell is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OngoingEnd {
    #[default]
    Today,
    Fixed(NaiveDate),
}

impl OngoingEnd {
    pub fn resolve(self, today: NaiveDate) -> NaiveDate {
        match self {
            OngoingEnd::Today => today,
            OngoingEnd::Fixed(date) => date,
        }
    }
}

impl TryFrom<String> for OngoingEnd {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("today") || trimmed.eq_ignore_ascii_case("now") {
            return Ok(OngoingEnd::Today);
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(OngoingEnd::Fixed)
            .map_err(|_| format!("expected \"today\" or a YYYY-MM-DD date, got \"{}\"", value))
    }
}

impl From<OngoingEnd> for String {
    fn from(value: OngoingEnd) -> Self {
        match value {
            OngoingEnd::Today => "today".to_string(),
            OngoingEnd::Fixed(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneOrder {
    /// Category rank, then start date.
    #[default]
    Category,
    Start,
    Input,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    pub domain_start: NaiveDate,
    /// Lower bound for the right edge; the axis still grows to fit the data.
    pub domain_end: Option<NaiveDate>,
    pub tick_interval_years: u32,
    pub scale: TimeScale,
    pub ongoing: OngoingEnd,
    pub lane_order: LaneOrder,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            domain_start: NaiveDate::from_ymd_opt(1998, 1, 1).unwrap_or_default(),
            domain_end: None,
            tick_interval_years: 3,
            scale: TimeScale::Linear,
            ongoing: OngoingEnd::Today,
            lane_order: LaneOrder::Category,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightCurve {
    #[default]
    Linear,
    Log,
    Step,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub min: f64,
    pub max: f64,
    pub curve: WeightCurve,
    /// End dates at least this many years old get the minimum weight.
    pub horizon_years: f64,
    pub steps: u32,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            min: 2.0,
            max: 8.0,
            curve: WeightCurve::Linear,
            horizon_years: 25.0,
            steps: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub colors: BTreeMap<String, String>,
    pub order: Vec<String>,
    pub rules: Vec<CategoryRule>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        let colors = [
            ("Programming", "#2E86AB"),
            ("Tools & Systems", "#A23B72"),
            ("Protocols & Standards", "#F18F01"),
            ("Platforms & Cloud", "#C73E1D"),
            ("Frameworks & Libraries", "#592E83"),
            ("Other", "#048A81"),
        ]
        .into_iter()
        .map(|(name, color)| (name.to_string(), color.to_string()))
        .collect();

        let order = [
            "Programming",
            "Tools & Systems",
            "Platforms & Cloud",
            "Protocols & Standards",
            "Frameworks & Libraries",
            "Other",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let rules = vec![
            CategoryRule::new(
                "Programming",
                &["C++", "STL", "Python", "JavaScript", "Haskell", "Go", "R", "Bash"],
            ),
            CategoryRule::new(
                "Tools & Systems",
                &["Vi", "Git", "Linux", "Unix", "Make", "CMake", "Docker", "Jenkins"],
            ),
            CategoryRule::new("Protocols & Standards", &["TCP", "XMPP", "SIP", "FIX", "ONVIF"]),
            CategoryRule::new(
                "Platforms & Cloud",
                &["Google Cloud", "AWS", "Cloudflare", "Raspberry Pi"],
            ),
            CategoryRule::new(
                "Frameworks & Libraries",
                &["Qt", "JUCE", "ZeroMQ", "Hugo", "Jekyll"],
            ),
        ];

        Self {
            colors,
            order,
            rules,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// `{date}` is replaced with the run date formatted by `date_format`.
    pub title: String,
    pub date_format: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "Skills Timeline • Updated {date}".to_string(),
            date_format: "%B %Y".to_string(),
        }
    }
}

impl TimelineConfig {
    /// Reads and parses a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TimelineError::ConfigError {
            message: format!("cannot read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses TOML text after `${VAR}` substitution.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TimelineError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TimelineError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("input.path", &self.input.path.to_string_lossy())?;
        if let Some(default_category) = &self.input.default_category {
            validation::validate_non_empty_string("input.default_category", default_category)?;
        }

        validation::validate_path("output.png_path", &self.output.png_path.to_string_lossy())?;
        if self.output.write_html {
            validation::validate_path("output.html_path", &self.output.html_path.to_string_lossy())?;
        }
        validation::validate_range("output.width", self.output.width, 100, 20_000)?;
        validation::validate_range("output.height", self.output.height, 100, 20_000)?;
        validation::validate_range("output.scale", self.output.scale, 1, 8)?;

        validation::validate_positive_number(
            "axis.tick_interval_years",
            self.axis.tick_interval_years,
            1,
        )?;
        if let Some(domain_end) = self.axis.domain_end {
            if domain_end <= self.axis.domain_start {
                return Err(TimelineError::InvalidConfigValueError {
                    field: "axis.domain_end".to_string(),
                    value: domain_end.to_string(),
                    reason: "Must be later than axis.domain_start".to_string(),
                });
            }
        }

        validation::validate_range("weight.min", self.weight.min, 0.1, 100.0)?;
        validation::validate_range("weight.max", self.weight.max, self.weight.min, 100.0)?;
        validation::validate_range("weight.horizon_years", self.weight.horizon_years, 0.1, 1000.0)?;
        validation::validate_positive_number("weight.steps", self.weight.steps, 1)?;

        for (category, color) in &self.categories.colors {
            validation::validate_hex_color(&format!("categories.colors.{}", category), color)?;
        }
        for rule in &self.categories.rules {
            validation::validate_non_empty_string("categories.rules.name", &rule.name)?;
            for keyword in &rule.keywords {
                validation::validate_non_empty_string(
                    &format!("categories.rules.{}.keywords", rule.name),
                    keyword,
                )?;
            }
        }

        validation::validate_non_empty_string("chart.date_format", &self.chart.date_format)?;
        if StrftimeItems::new(&self.chart.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(TimelineError::InvalidConfigValueError {
                field: "chart.date_format".to_string(),
                value: self.chart.date_format.clone(),
                reason: "Not a valid strftime format".to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for TimelineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TimelineConfig::from_toml_str("").unwrap();

        assert_eq!(config, TimelineConfig::default());
        assert_eq!(config.input.path, PathBuf::from("skills.csv"));
        assert_eq!(config.output.canvas().width, 1200);
        assert_eq!(config.axis.ongoing, OngoingEnd::Today);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r##"
[input]
path = "data/skills.csv"
require_category = true

[output]
png_path = "out/chart.png"
write_html = false
scale = 2

[axis]
domain_start = "2005-01-01"
tick_interval_years = 2
scale = "log"
ongoing = "2030-12-31"
lane_order = "start"

[weight]
min = 1.0
max = 6.0
curve = "step"
steps = 3

[categories.colors]
programming = "#112233"

[chart]
title = "CV skills ({date})"
"##;

        let config = TimelineConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.input.path, PathBuf::from("data/skills.csv"));
        assert!(config.input.require_category);
        assert_eq!(config.output.scale, 2);
        assert_eq!(config.output.html_target(), None);
        assert_eq!(config.output.width, 1200);
        assert_eq!(config.axis.scale, TimeScale::Log);
        assert_eq!(config.axis.lane_order, LaneOrder::Start);
        assert_eq!(
            config.axis.ongoing,
            OngoingEnd::Fixed(NaiveDate::from_ymd_opt(2030, 12, 31).unwrap())
        );
        assert_eq!(config.weight.curve, WeightCurve::Step);
        assert_eq!(config.categories.colors["programming"], "#112233");
        assert!(!config.categories.rules.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SKILLS_TIMELINE_TEST_INPUT", "from-env.csv");

        let config =
            TimelineConfig::from_toml_str("[input]\npath = \"${SKILLS_TIMELINE_TEST_INPUT}\"\n")
                .unwrap();
        assert_eq!(config.input.path, PathBuf::from("from-env.csv"));

        std::env::remove_var("SKILLS_TIMELINE_TEST_INPUT");
    }

    #[test]
    fn test_invalid_ongoing_value_is_rejected() {
        let result = TimelineConfig::from_toml_str("[axis]\nongoing = \"someday\"\n");
        assert!(matches!(
            result,
            Err(TimelineError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = TimelineConfig::default();
        config.weight.min = 9.0;
        assert!(config.validate().is_err());

        let mut config = TimelineConfig::default();
        config
            .categories
            .colors
            .insert("Other".to_string(), "green".to_string());
        assert!(config.validate().is_err());

        let mut config = TimelineConfig::default();
        config.axis.tick_interval_years = 0;
        assert!(config.validate().is_err());

        let mut config = TimelineConfig::default();
        config.axis.domain_end = NaiveDate::from_ymd_opt(1990, 1, 1);
        assert!(config.validate().is_err());

        let mut config = TimelineConfig::default();
        config.chart.date_format = "%Q".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[output]\npng_path = \"cv/skills.png\"\n")
            .unwrap();

        let config = TimelineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.png_path, PathBuf::from("cv/skills.png"));
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let result = TimelineConfig::from_file("/definitely/not/here/timeline.toml");
        assert!(matches!(result, Err(TimelineError::ConfigError { .. })));
    }
}
