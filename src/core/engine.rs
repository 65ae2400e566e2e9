use crate::domain::model::{ChartData, RunOutput, SkillInterval};
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use chrono::Datelike;

pub struct TimelineEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> TimelineEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    fn log_summary(intervals: &[SkillInterval]) {
        let first = intervals.iter().map(|i| i.start.year()).min();
        let last = intervals.iter().map(|i| i.end.year()).max();
        match (first, last) {
            (Some(first), Some(last)) => tracing::info!(
                "Found {} skills spanning {} to {}",
                intervals.len(),
                first,
                last
            ),
            _ => tracing::warn!("Input contains no skills; rendering an empty timeline"),
        }
    }

    fn prepare(&self) -> Result<ChartData> {
        tracing::info!("Loading skills data...");
        let intervals = self.pipeline.extract()?;
        Self::log_summary(&intervals);

        tracing::info!("Encoding timeline...");
        let chart = self.pipeline.transform(intervals)?;
        tracing::debug!(
            "Prepared {} plot points in {} lanes",
            chart.points.len(),
            chart.spec.lanes.len()
        );
        Ok(chart)
    }

    /// Loads, encodes and renders. Any failure aborts the run.
    pub fn run(&self) -> Result<RunOutput> {
        let chart = self.prepare()?;

        tracing::info!("Rendering timeline...");
        let output = self.pipeline.load(chart)?;
        tracing::info!("PNG saved to: {}", output.png_path.display());
        if let Some(html_path) = &output.html_path {
            tracing::info!("HTML view saved to: {}", html_path.display());
        }

        Ok(output)
    }

    /// Everything except rendering and writing.
    pub fn dry_run(&self) -> Result<ChartData> {
        let chart = self.prepare()?;
        tracing::info!(
            "Dry run: would write {}{}",
            chart.spec.png_path.display(),
            chart
                .spec
                .html_path
                .as_ref()
                .map(|path| format!(" and {}", path.display()))
                .unwrap_or_default()
        );
        Ok(chart)
    }
}
