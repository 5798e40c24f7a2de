//! Shared data models
//!
//! These carry plain `String` ids on the wire; the server maps them to and
//! from storage record ids at the repository boundary.

mod employee;
mod order;
mod session;

pub use employee::{Employee, Role};
pub use order::{Order, OrderItem, OrderStatus, OrderStatusPatch};
pub use session::{InvalidReason, SessionStats, SessionValidation, TableSession};
