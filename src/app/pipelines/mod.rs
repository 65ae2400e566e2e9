pub mod timeline_pipeline;

pub use timeline_pipeline::TimelinePipeline;
