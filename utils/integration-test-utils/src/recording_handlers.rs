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

use async_trait::async_trait;
use broker_proxy::{
    BrokerError, CallbackError, DeliveryHandler, ErrorHandler, EventHandler, Message,
    MessageHandler, OnBind, ProducerEvent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::debug;

fn snapshot<T: Clone>(store: &Mutex<Vec<T>>) -> Vec<T> {
    store.lock().unwrap().clone()
}

#[derive(Clone, Default)]
pub struct RecordingMessageHandler {
    message_store: Arc<Mutex<Vec<Message>>>,
}

impl RecordingMessageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        snapshot(&self.message_store)
    }
}

#[async_trait]
impl MessageHandler for RecordingMessageHandler {
    async fn on_message(&self, message: Message) {
        debug!("within recording_message_handler! msg: {:?}", message);
        self.message_store.lock().unwrap().push(message);
    }
}

#[derive(Clone, Default)]
pub struct RecordingErrorHandler {
    error_store: Arc<Mutex<Vec<BrokerError>>>,
}

impl RecordingErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<BrokerError> {
        snapshot(&self.error_store)
    }
}

#[async_trait]
impl ErrorHandler for RecordingErrorHandler {
    async fn on_error(&self, error: BrokerError) {
        debug!("within recording_error_handler! err: {}", error);
        self.error_store.lock().unwrap().push(error);
    }
}

/// Records delivery reports, for either the success or the failure list.
#[derive(Clone, Default)]
pub struct RecordingDeliveryHandler {
    report_store: Arc<Mutex<Vec<Message>>>,
}

impl RecordingDeliveryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Message> {
        snapshot(&self.report_store)
    }
}

#[async_trait]
impl DeliveryHandler for RecordingDeliveryHandler {
    async fn on_delivery(&self, message: &Message) {
        debug!("within recording_delivery_handler! msg: {:?}", message);
        self.report_store.lock().unwrap().push(message.clone());
    }
}

#[derive(Clone, Default)]
pub struct RecordingEventHandler {
    event_store: Arc<Mutex<Vec<ProducerEvent>>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProducerEvent> {
        snapshot(&self.event_store)
    }
}

#[async_trait]
impl EventHandler for RecordingEventHandler {
    async fn on_event(&self, event: &ProducerEvent) {
        debug!("within recording_event_handler! event: {:?}", event);
        self.event_store.lock().unwrap().push(event.clone());
    }
}

/// Message handler that parks inside every dispatch until released.
#[derive(Clone, Default)]
pub struct GatedMessageHandler {
    started: Arc<Notify>,
    release: Arc<Notify>,
    finished: Arc<Mutex<Vec<Message>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl GatedMessageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once a dispatch has entered the handler.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Lets one parked dispatch finish.
    pub fn release_one(&self) {
        self.release.notify_one();
    }

    pub fn finished(&self) -> Vec<Message> {
        snapshot(&self.finished)
    }

    /// Highest number of dispatches that were parked at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::Acquire)
    }
}

#[async_trait]
impl MessageHandler for GatedMessageHandler {
    async fn on_message(&self, message: Message) {
        let in_flight = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::AcqRel);
        self.started.notify_one();
        self.release.notified().await;
        self.finished.lock().unwrap().push(message);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Hands out labelled on-bind callbacks and records the order they ran in.
#[derive(Clone, Default)]
pub struct BindOrderRecorder {
    order: Arc<Mutex<Vec<String>>>,
}

impl BindOrderRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback<C>(&self, label: impl Into<String>) -> Arc<dyn OnBind<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.callback_with_outcome(label, false)
    }

    /// A callback that records its label, then returns an error.
    pub fn failing_callback<C>(&self, label: impl Into<String>) -> Arc<dyn OnBind<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.callback_with_outcome(label, true)
    }

    fn callback_with_outcome<C>(&self, label: impl Into<String>, fail: bool) -> Arc<dyn OnBind<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let label = label.into();
        let order = self.order.clone();
        Arc::new(move |_client: Arc<C>| {
            let label = label.clone();
            let order = order.clone();
            async move {
                order.lock().unwrap().push(label.clone());
                if fail {
                    return Err::<(), CallbackError>(format!("{label} failed").into());
                }
                Ok(())
            }
        })
    }

    pub fn order(&self) -> Vec<String> {
        snapshot(&self.order)
    }
}
