pub mod repository;
pub mod status;

pub use repository::{DebugSink, Repository};
