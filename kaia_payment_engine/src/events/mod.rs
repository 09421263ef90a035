//! Order lifecycle events.
//!
//! The order flow API publishes an event after every committed `PAID`, `REFUNDED` or annulment transition. Other parts
//! of the system (e.g. upstream commerce-platform notifications) subscribe via [`EventHooks`].
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers, HookFuture};
