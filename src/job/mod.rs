//! Collection jobs: orchestration, registry, and progress events.

pub mod events;
pub mod orchestrator;
pub mod registry;

pub use events::{BroadcastSink, CollectEvent, JobState, StatusSink};
pub use orchestrator::{run_collection, CollectionJob, JobReport};
pub use registry::{CollectOptions, JobRegistry, StatusSnapshot};
