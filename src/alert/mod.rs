//! Alerting module
//!
//! De-duplicates detected signals through a persisted state machine, renders
//! the survivors, and hands them to the delivery channel.

mod machine;
mod render;
mod state;
mod telegram;

pub use machine::{AlertGate, AlertPolicy, Decision, SuppressReason};
pub use render::{RenderConfig, Renderer};
pub use state::{AlertStateStore, MoveState, PendingMove, SignalState, StoreError};
pub use telegram::{AlertSink, DeliveryError, TelegramConfig, TelegramSender};
