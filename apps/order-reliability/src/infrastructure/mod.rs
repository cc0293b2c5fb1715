//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the application layer:
//!
//! - `paper`: in-memory broker implementing the order endpoint and market-data ports
//! - `clock`: tokio-backed and recording sleepers

pub mod clock;
pub mod paper;

pub use clock::{RecordingSleeper, TokioSleeper};
pub use paper::{PaperBroker, PaperCall, PaperCalls, PaperReply};
