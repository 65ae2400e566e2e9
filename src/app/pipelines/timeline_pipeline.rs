use crate::config::TimelineConfig;
use crate::core::encoding::EncodingMapper;
use crate::core::loader::{parse_intervals, LoadOptions};
use crate::core::{render, reshape};
use crate::domain::model::{ChartData, RunOutput, SkillInterval};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::{Result, TimelineError};
use chrono::NaiveDate;
use std::path::Path;

/// Loader → Reshaper → Encoding Mapper → Renderer, with file access through
/// a [`Storage`].
pub struct TimelinePipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) config: TimelineConfig,
    /// Captured once at run start; used for the ongoing sentinel, recency
    /// weights and the title stamp.
    pub(crate) today: NaiveDate,
}

impl<S: Storage> TimelinePipeline<S> {
    pub fn new(storage: S, config: TimelineConfig, today: NaiveDate) -> Self {
        Self {
            storage,
            config,
            today,
        }
    }

    fn write_output(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.storage
            .write_file(path, data)
            .map_err(|e| TimelineError::RenderBackendError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

impl<S: Storage> Pipeline for TimelinePipeline<S> {
    fn extract(&self) -> Result<Vec<SkillInterval>> {
        let path = &self.config.input.path;
        tracing::debug!("Reading skills from {}", path.display());

        let data = self.storage.read_file(path)?;
        let options = LoadOptions {
            ongoing_end: self.config.axis.ongoing.resolve(self.today),
            strip_numeric_prefix: self.config.input.strip_numeric_prefix,
        };
        parse_intervals(&data, &path.display().to_string(), &options)
    }

    fn transform(&self, intervals: Vec<SkillInterval>) -> Result<ChartData> {
        let points = reshape::reshape(&intervals);
        let spec = EncodingMapper::new(&self.config, self.today)?.encode(&points)?;
        Ok(ChartData { points, spec })
    }

    fn load(&self, chart: ChartData) -> Result<RunOutput> {
        // Render everything before writing so a failed render writes nothing.
        let rendered = render::render(&chart)?;

        self.write_output(&chart.spec.png_path, &rendered.png)?;
        let html_path = match (&chart.spec.html_path, &rendered.html) {
            (Some(path), Some(html)) => {
                self.write_output(path, html.as_bytes())?;
                Some(path.clone())
            }
            _ => None,
        };

        Ok(RunOutput {
            png_path: chart.spec.png_path.clone(),
            html_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::TimelineEngine;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[derive(Default)]
    struct MockStorage {
        files: RefCell<HashMap<PathBuf, Vec<u8>>>,
        read_only: bool,
    }

    impl MockStorage {
        fn with_file(path: &str, data: &str) -> Self {
            let storage = Self::default();
            storage
                .files
                .borrow_mut()
                .insert(PathBuf::from(path), data.as_bytes().to_vec());
            storage
        }

        fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.borrow().get(Path::new(path)).cloned()
        }
    }

    impl Storage for MockStorage {
        fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| TimelineError::MissingFileError {
                    path: path.to_path_buf(),
                })
        }

        fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
            if self.read_only {
                return Err(TimelineError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only storage",
                )));
            }
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), data.to_vec());
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn small_config() -> TimelineConfig {
        let mut config = TimelineConfig::default();
        config.output.width = 300;
        config.output.height = 200;
        config.output.scale = 1;
        config
    }

    const SKILLS: &str = "name,start,end,category\n\
                          Python,2015-01-01,2025-12-31,programming\n\
                          01 Rust,2019-06-01,,\n";

    #[test]
    fn test_pipeline_writes_png_and_html() {
        let storage = MockStorage::with_file("skills.csv", SKILLS);
        let pipeline = TimelinePipeline::new(storage, small_config(), today());

        let intervals = pipeline.extract().unwrap();
        assert_eq!(intervals[1].name, "Rust");
        assert_eq!(intervals[1].end, today());

        let chart = pipeline.transform(intervals).unwrap();
        assert_eq!(chart.points.len(), 4);

        let output = pipeline.load(chart).unwrap();
        assert_eq!(output.png_path, PathBuf::from("public/skills.png"));
        assert_eq!(output.html_path, Some(PathBuf::from("public/timeline.html")));

        let png = pipeline.storage.get_file("public/skills.png").unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        let html = pipeline.storage.get_file("public/timeline.html").unwrap();
        assert!(String::from_utf8(html).unwrap().contains("Rust"));
    }

    #[test]
    fn test_write_failure_is_render_backend_error() {
        let mut storage = MockStorage::with_file("skills.csv", SKILLS);
        storage.read_only = true;
        let engine = TimelineEngine::new(TimelinePipeline::new(storage, small_config(), today()));

        let result = engine.run();
        match result {
            Err(TimelineError::RenderBackendError { path, .. }) => {
                assert_eq!(path, PathBuf::from("public/skills.png"));
            }
            other => panic!("expected RenderBackendError, got {:?}", other),
        }
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let storage = MockStorage::with_file("skills.csv", SKILLS);
        let pipeline = TimelinePipeline::new(storage, small_config(), today());
        let engine = TimelineEngine::new(pipeline);

        let chart = engine.dry_run().unwrap();
        assert_eq!(chart.spec.lanes.len(), 2);
        assert!(engine.pipeline().storage.get_file("public/skills.png").is_none());
        assert!(engine.pipeline().storage.get_file("public/timeline.html").is_none());
    }

    #[test]
    fn test_missing_input_propagates() {
        let pipeline = TimelinePipeline::new(MockStorage::default(), small_config(), today());
        let engine = TimelineEngine::new(pipeline);

        assert!(matches!(
            engine.run(),
            Err(TimelineError::MissingFileError { .. })
        ));
    }
}
