//! The pipeline: discovery, preparation, generation, and posting stage
//! workers, the coordinator that dispatches them, the timeout enforcer, and
//! process lifecycle operations.

pub mod coordinator;
pub mod discovery;
pub mod generation;
pub mod lifecycle;
pub mod posting;
pub mod preparation;
pub mod timeout_enforcer;

pub use coordinator::{Coordinator, DispatchSummary};
pub use discovery::{DiscoverySummary, DiscoveryWorker};
pub use generation::{GenerationSummary, GenerationWorker};
pub use lifecycle::ProcessStatusView;
pub use posting::{PostingSummary, PostingWorker};
pub use preparation::{PreparationSummary, PreparationWorker};
pub use timeout_enforcer::TimeoutEnforcer;
