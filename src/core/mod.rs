pub mod encoding;
pub mod engine;
pub mod loader;
pub mod render;
pub mod reshape;

pub use crate::domain::model::{ChartData, PlotPoint, RenderSpec, RunOutput, SkillInterval};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
