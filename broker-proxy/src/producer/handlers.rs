//! Multi-slot handlers for the producer delivery loop.

use crate::event::ProducerEvent;
use crate::message::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// Receives a delivery report, either successful or failed depending on the list it
/// was registered in.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn on_delivery(&self, message: &Message);
}

/// Receives producer events that are not delivery reports.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, event: &ProducerEvent);
}

/// Handler lists as seen by one run of the delivery loop.
#[derive(Clone, Default)]
pub(crate) struct DeliveryHandlers {
    pub(crate) delivered: Vec<Arc<dyn DeliveryHandler>>,
    pub(crate) failed: Vec<Arc<dyn DeliveryHandler>>,
    pub(crate) unrecognized: Vec<Arc<dyn EventHandler>>,
}
