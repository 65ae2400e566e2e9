pub mod cli;
pub mod toml_config;

pub use toml_config::TimelineConfig;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given.
#[cfg(feature = "cli")]
pub const DEFAULT_CONFIG_FILE: &str = "timeline.toml";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "skills-timeline")]
#[command(about = "Render a CV skills timeline from a CSV of date ranges")]
pub struct CliArgs {
    /// Path to TOML configuration file [default: timeline.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// CSV with name,start,end[,category] columns
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// PNG destination
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// HTML view destination
    #[arg(long, conflicts_with = "no_html")]
    pub html: Option<PathBuf>,

    /// Skip the HTML view
    #[arg(long)]
    pub no_html: bool,

    /// Pixel density multiplier for the PNG
    #[arg(long)]
    pub scale: Option<u32>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Load and encode the data without writing any file
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliArgs {
    /// Whether `--config` was left out.
    pub fn uses_default_config(&self) -> bool {
        self.config.is_none()
    }

    pub fn config_path(&self) -> &Path {
        self.config
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Loads the config file and layers the command line flags on top.
    ///
    /// The default config file is optional; an explicitly named one is not.
    pub fn resolve_config(&self) -> crate::Result<TimelineConfig> {
        let path = self.config_path();
        let mut config = if self.uses_default_config() && !path.exists() {
            tracing::debug!("No {} found, using built-in defaults", path.display());
            TimelineConfig::default()
        } else {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            TimelineConfig::from_file(path)?
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut TimelineConfig) {
        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output.png_path = output.clone();
        }
        if let Some(html) = &self.html {
            config.output.html_path = html.clone();
            config.output.write_html = true;
        }
        if self.no_html {
            config.output.write_html = false;
        }
        if let Some(scale) = self.scale {
            config.output.scale = scale;
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_is_a_valid_invocation() {
        let args = CliArgs::try_parse_from(["skills-timeline"]).unwrap();

        assert!(args.uses_default_config());
        assert_eq!(args.config_path(), Path::new(DEFAULT_CONFIG_FILE));
        assert!(!args.dry_run);

        let mut config = TimelineConfig::default();
        args.apply(&mut config);
        assert_eq!(config, TimelineConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs::try_parse_from([
            "skills-timeline",
            "--input",
            "cv/skills.csv",
            "--output",
            "cv/skills.png",
            "--no-html",
            "--scale",
            "1",
        ])
        .unwrap();

        let mut config = TimelineConfig::default();
        args.apply(&mut config);

        assert_eq!(config.input.path, PathBuf::from("cv/skills.csv"));
        assert_eq!(config.output.png_path, PathBuf::from("cv/skills.png"));
        assert_eq!(config.output.html_target(), None);
        assert_eq!(config.output.scale, 1);
    }

    #[test]
    fn test_html_conflicts_with_no_html() {
        let result =
            CliArgs::try_parse_from(["skills-timeline", "--html", "a.html", "--no-html"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let args =
            CliArgs::try_parse_from(["skills-timeline", "--config", "/no/such/timeline.toml"])
                .unwrap();
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn test_explicit_default_name_must_exist() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        let missing = missing.to_string_lossy();
        let args =
            CliArgs::try_parse_from(["skills-timeline", "--config", &*missing]).unwrap();

        assert!(!args.uses_default_config());
        assert!(matches!(
            args.resolve_config(),
            Err(crate::TimelineError::ConfigError { .. })
        ));
    }
}
