//! # Tincture Pipeline
//!
//! Turns pipeline descriptions into compiled pipelines, once.
//!
//! - [`description`]: what identifies a pipeline and its cache key
//! - [`manager`]: request/resolve front end with in-flight task sharing
//! - [`task`], [`global_cache`]: the shared state behind the manager
//! - [`compiler`]: the backend seam
//! - [`serialization`]: persisted descriptions for precompilation

pub mod compiler;
pub mod description;
pub mod global_cache;
pub mod manager;
pub mod serialization;
pub mod task;

pub use compiler::{PipelineCompiler, PipelineProgram};
pub use description::{PipelineCacheKey, PipelineDescription};
pub use global_cache::GlobalPipelineCache;
pub use manager::{PipelineHandle, PipelineManager, PipelineManagerConfig, PipelineStats, PipelineStatsSnapshot};
pub use serialization::{DeserializeError, deserialize, serialize};
pub use task::PipelineCreationTask;
