//! Delivery simulator
//!
//! Stands in for a real transport: every outbound message gets one
//! independently scheduled, cancellable reply.

mod simulator;
mod strategy;

pub use simulator::{DeliverySimulator, ReplySink, ScheduledReply};
pub use strategy::{
    RandomReplies, ReplyContext, ReplyStrategy, RotatingReplies, StrategyKind, DEFAULT_REPLIES,
};
