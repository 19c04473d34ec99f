pub mod directional;
pub mod pipeline;
pub mod window;

pub use pipeline::{IndicatorPipeline, enrich};
