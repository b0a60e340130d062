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

//! # broker-proxy
//!
//! `broker-proxy` puts a lifecycle wrapper in front of a message-broker client. Callers
//! declare intent first (on-bind callbacks, handlers, options) and the client is built
//! and bound later. Once bound, broker events are fanned out to the registered handlers.
//!
//! Two proxies are provided:
//!
//! - [`ConsumerProxy`]: accepts partition assignments and dispatches messages and
//!   errors from a single watch loop that can be cancelled.
//! - [`ProducerProxy`]: sends messages and runs a delivery-confirmation loop that
//!   counts successful deliveries.
//!
//! The broker itself sits behind the [`ConsumerClient`] and [`ProducerClient`] traits.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use broker_proxy::{Message, ProducerOptions, ProducerProxy};
//!
//! # pub mod mock_client {
//! #     use async_trait::async_trait;
//! #     use broker_proxy::{BrokerError, Message, ProducerClient, ProducerEvent};
//! #     use tokio::sync::mpsc;
//! #
//! #     pub struct SilentProducer;
//! #
//! #     #[async_trait]
//! #     impl ProducerClient for SilentProducer {
//! #         async fn recv_event(&self) -> Option<ProducerEvent> { None }
//! #         fn produce(&self, _message: Message) -> Result<(), BrokerError> { Ok(()) }
//! #         fn produce_channel(&self) -> mpsc::Sender<Message> { mpsc::channel(1).0 }
//! #         async fn close(&self) {}
//! #     }
//! # }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let producer = ProducerProxy::with_options(ProducerOptions::default().without_confirm_delivery());
//! assert!(!producer.is_ready());
//!
//! producer.bind(Arc::new(mock_client::SilentProducer)).await.unwrap();
//! assert!(producer.is_ready());
//! assert!(!producer.is_watching_delivery());
//!
//! producer
//!     .send_sync(Message::new("orders", b"created".to_vec()).with_key(b"order-1".to_vec()))
//!     .unwrap();
//! producer.close().await.unwrap();
//! # });
//! ```
//!
//! ## Lifecycle
//!
//! - A proxy is bound exactly once, by [`ConsumerProxy::bind`] with a ready client or by
//!   `initialize` with a [`ConsumerClientBuilder`] / [`ProducerClientBuilder`].
//! - On-bind callbacks registered before that run once with the client, either in order
//!   or as detached tasks ([`CallbackMode`]). Registering after binding fails.
//! - Producer delivery handlers are frozen once the delivery loop starts.
//! - Binding must happen inside a Tokio runtime. The watch loop and `send_async` tasks are
//!   spawned on that runtime, so those calls work from any thread.
//!
//! ## Observability model
//!
//! Library code emits `tracing` events with canonical `event` and `component` fields and
//! never installs a global subscriber. Binaries and tests initialize `tracing_subscriber`.

mod client;
pub use client::{ConsumerClient, ConsumerClientBuilder, ProducerClient, ProducerClientBuilder};

mod consumer;
pub use consumer::{ConsumerProxy, ErrorHandler, MessageHandler, WatchHandle};

mod error;
pub use error::{BrokerError, BrokerErrorCode, CallbackError, ProxyError};

mod event;
pub use event::{ConsumerEvent, ProducerEvent};

mod lifecycle;
pub use lifecycle::OnBind;

mod message;
pub use message::{ConciseMessage, Header, Message, Offset, TopicPartition, PARTITION_ANY};

#[doc(hidden)]
pub mod observability;

pub mod options;
pub use options::{
    Acks, CallbackMode, ClientSettings, ConsumerOptions, IsolationLevel, OffsetReset,
    ProducerOptions,
};

mod producer;
pub use producer::{DeliveryHandler, EventHandler, ProducerProxy};
