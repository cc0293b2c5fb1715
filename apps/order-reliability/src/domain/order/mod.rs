//! Order value objects.

mod details;
mod direction;
mod order_kind;
mod request;
mod ticket;

pub use details::OrderDetails;
pub use direction::Direction;
pub use order_kind::OrderKind;
pub use request::{CloseRequest, ModifyRequest, OrderRequest, shift_level};
pub use ticket::Ticket;
