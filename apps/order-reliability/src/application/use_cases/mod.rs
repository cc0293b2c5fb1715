//! Application Use Cases
//!
//! One use case per reliable operation. Each validates its request, binds
//! an [`AttemptDriver`](crate::application::services::AttemptDriver) and
//! hands it to the retry orchestrator.

mod cancel_order;
mod close_order;
mod modify_order;
mod send_order;

pub use cancel_order::CancelOrderUseCase;
pub use close_order::CloseOrderUseCase;
pub use modify_order::ModifyOrderUseCase;
pub use send_order::SendOrderUseCase;
