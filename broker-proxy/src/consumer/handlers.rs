//! Single-slot handlers for the consumer dispatch loop.

use crate::error::{BrokerError, ProxyError};
use crate::message::Message;
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};

/// Receives every message event. Nothing is returned to the loop.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: Message);
}

/// Receives every broker-reported error event.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn on_error(&self, error: BrokerError);
}

/// Write-once handler slots, readable by the dispatch loop at any time.
#[derive(Default)]
pub(crate) struct ConsumerHandlers {
    message: OnceLock<Arc<dyn MessageHandler>>,
    error: OnceLock<Arc<dyn ErrorHandler>>,
}

impl ConsumerHandlers {
    pub(crate) fn set_message(&self, handler: Arc<dyn MessageHandler>) -> Result<(), ProxyError> {
        self.message
            .set(handler)
            .map_err(|_| ProxyError::AlreadyRegistered)
    }

    pub(crate) fn set_error(&self, handler: Arc<dyn ErrorHandler>) -> Result<(), ProxyError> {
        self.error
            .set(handler)
            .map_err(|_| ProxyError::AlreadyRegistered)
    }

    pub(crate) fn message(&self) -> Option<&Arc<dyn MessageHandler>> {
        self.message.get()
    }

    pub(crate) fn error(&self) -> Option<&Arc<dyn ErrorHandler>> {
        self.error.get()
    }
}
