//! Streaming module - MQTT transport glue and outbound notifications

mod mqtt;

pub use mqtt::*;

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::Envelope;

/// Fire-and-forget publisher for outbound envelopes
pub trait Notifier: Send + Sync {
    /// Queue `envelope` on `topic` without waiting for delivery
    fn publish(&self, topic: &str, envelope: &Envelope) -> Result<()>;
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn publish(&self, topic: &str, envelope: &Envelope) -> Result<()> {
        (**self).publish(topic, envelope)
    }
}
