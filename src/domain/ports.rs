use crate::domain::model::{ChartData, RunOutput, SkillInterval};
use crate::utils::error::Result;
use std::path::Path;

pub trait Storage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Writes the whole file or nothing; readers never observe a partial file.
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;
}

pub trait Pipeline {
    fn extract(&self) -> Result<Vec<SkillInterval>>;
    fn transform(&self, intervals: Vec<SkillInterval>) -> Result<ChartData>;
    fn load(&self, chart: ChartData) -> Result<RunOutput>;
}
