pub mod eligibility;
pub mod enqueue;
pub mod orchestrator;
pub mod payload;
pub mod runner;
pub mod sweep;

pub use enqueue::JobScheduler;
pub use orchestrator::{EventContext, NotificationOrchestrator, OrchestrationOutcome};
pub use runner::{JobRunner, TickSummary};
pub use sweep::{NoShowSweep, SweepOutcome};
