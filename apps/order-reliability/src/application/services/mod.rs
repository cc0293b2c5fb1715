//! Application Services
//!
//! Building blocks shared by the use cases: the order-details read path,
//! the retry state machine, and the bound operation context.

mod context;
mod orchestrator;
mod order_details;

pub use context::OperationContext;
pub use orchestrator::{
    AttemptDriver, Correction, LoopOutcome, Preparation, RetryOrchestrator, RetryPhase, RetryState, next_phase,
};
pub use order_details::OrderDetailsAccessor;
