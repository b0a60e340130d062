/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Seam towards the broker client library.
//!
//! The proxies never talk to a broker directly. They own an `Arc<dyn ConsumerClient>`
//! or `Arc<dyn ProducerClient>` once bound, and construct one through a builder when
//! initialized from settings.

use crate::error::BrokerError;
use crate::event::{ConsumerEvent, ProducerEvent};
use crate::message::{Message, TopicPartition};
use crate::options::ClientSettings;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Consumer-role connection to a broker.
#[async_trait]
pub trait ConsumerClient: Send + Sync {
    /// Next event from the client's event stream, or `None` once the stream is closed.
    ///
    /// Must be cancel-safe: dropping the future before it resolves loses no event.
    async fn recv_event(&self) -> Option<ConsumerEvent>;

    async fn subscribe(&self, topics: &[String]) -> Result<(), BrokerError>;

    async fn assign(&self, partitions: &[TopicPartition]) -> Result<(), BrokerError>;

    async fn unassign(&self) -> Result<(), BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;
}

/// Producer-role connection to a broker.
#[async_trait]
pub trait ProducerClient: Send + Sync {
    /// Next event (mostly delivery reports), or `None` once the client is closed.
    async fn recv_event(&self) -> Option<ProducerEvent>;

    /// Submits `message` directly. An `Ok` means it was queued, not delivered.
    fn produce(&self, message: Message) -> Result<(), BrokerError>;

    /// Channel feeding the client's internal production queue.
    fn produce_channel(&self) -> mpsc::Sender<Message>;

    /// Closes the client. Its event stream ends after the pending reports are drained.
    async fn close(&self);
}

/// Constructs a consumer client from settings.
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use broker_proxy::{
///     BrokerError, ClientSettings, ConsumerClient, ConsumerClientBuilder, ConsumerEvent,
///     TopicPartition,
/// };
///
/// struct IdleConsumer;
///
/// #[async_trait]
/// impl ConsumerClient for IdleConsumer {
///     async fn recv_event(&self) -> Option<ConsumerEvent> {
///         None
///     }
///     async fn subscribe(&self, _topics: &[String]) -> Result<(), BrokerError> {
///         Ok(())
///     }
///     async fn assign(&self, _partitions: &[TopicPartition]) -> Result<(), BrokerError> {
///         Ok(())
///     }
///     async fn unassign(&self) -> Result<(), BrokerError> {
///         Ok(())
///     }
///     async fn close(&self) -> Result<(), BrokerError> {
///         Ok(())
///     }
/// }
///
/// struct IdleConsumerBuilder;
///
/// impl ConsumerClientBuilder for IdleConsumerBuilder {
///     fn build(&self, _settings: &ClientSettings) -> Result<Arc<dyn ConsumerClient>, BrokerError> {
///         Ok(Arc::new(IdleConsumer))
///     }
/// }
/// ```
pub trait ConsumerClientBuilder: Send + Sync {
    fn build(&self, settings: &ClientSettings) -> Result<Arc<dyn ConsumerClient>, BrokerError>;
}

/// Constructs a producer client from settings.
pub trait ProducerClientBuilder: Send + Sync {
    fn build(&self, settings: &ClientSettings) -> Result<Arc<dyn ProducerClient>, BrokerError>;
}
