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

use crate::broker::LoopbackBroker;
use async_trait::async_trait;
use broker_proxy::options::DELIVERY_REPORTS;
use broker_proxy::{
    BrokerError, BrokerErrorCode, ClientSettings, Message, ProducerClient, ProducerEvent,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, Receiver, Sender, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const PRODUCE_CHANNEL_CAPACITY: usize = 1024;

struct ProducerCore {
    broker: LoopbackBroker,
    delivery_reports: bool,
    events_tx: UnboundedSender<ProducerEvent>,
    closed: CancellationToken,
}

impl ProducerCore {
    fn deliver(&self, message: Message) {
        let report = match self.broker.publish(message.clone()) {
            Ok(stored) => stored,
            Err(err) => {
                let mut failed = message;
                failed.topic_partition.error = Some(err);
                failed
            }
        };
        if self.delivery_reports {
            let _ = self.events_tx.send(ProducerEvent::Delivery(report));
        }
    }
}

/// Producer-role client of a [`LoopbackBroker`].
///
/// Every produced message is appended synchronously and, unless `delivery.reports` is
/// `false`, answered with a delivery report on the event stream.
pub struct InMemoryProducer {
    core: Arc<ProducerCore>,
    settings: ClientSettings,
    events_rx: tokio::sync::Mutex<UnboundedReceiver<ProducerEvent>>,
    produce_tx: Sender<Message>,
    produce_rx: Mutex<Option<Receiver<Message>>>,
    runtime: Option<Handle>,
}

impl InMemoryProducer {
    pub fn new(broker: LoopbackBroker, settings: ClientSettings) -> Self {
        let delivery_reports = settings.get(DELIVERY_REPORTS) != Some("false");
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (produce_tx, produce_rx) = mpsc::channel(PRODUCE_CHANNEL_CAPACITY);
        Self {
            core: Arc::new(ProducerCore {
                broker,
                delivery_reports,
                events_tx,
                closed: CancellationToken::new(),
            }),
            settings,
            events_rx: tokio::sync::Mutex::new(events_rx),
            produce_tx,
            produce_rx: Mutex::new(Some(produce_rx)),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Settings the producer was built with.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Pushes `event` onto this producer's event stream. Ignored once closed.
    pub fn inject(&self, event: ProducerEvent) {
        if !self.core.closed.is_cancelled() {
            let _ = self.core.events_tx.send(event);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.core.closed.is_cancelled()
    }

    fn lock_produce_rx(&self) -> MutexGuard<'_, Option<Receiver<Message>>> {
        self.produce_rx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the pump on the runtime the producer was built in, or else the caller's.
    /// Without either, messages stay queued until a later call can start it.
    fn ensure_pump(&self) {
        let mut produce_rx = self.lock_produce_rx();
        if produce_rx.is_none() {
            return;
        }
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            debug!("no runtime to start the loopback produce channel pump on");
            return;
        };
        if let Some(produce_rx) = produce_rx.take() {
            runtime.spawn(pump(self.core.clone(), produce_rx));
        }
    }
}

async fn pump(core: Arc<ProducerCore>, mut produce_rx: Receiver<Message>) {
    loop {
        let message = tokio::select! {
            biased;
            _ = core.closed.cancelled() => break,
            message = produce_rx.recv() => message,
        };
        let Some(message) = message else {
            break;
        };
        core.deliver(message);
    }
    debug!("loopback produce channel pump stopped");
}

#[async_trait]
impl ProducerClient for InMemoryProducer {
    async fn recv_event(&self) -> Option<ProducerEvent> {
        let mut events = self.events_rx.lock().await;
        tokio::select! {
            biased;
            event = events.recv() => event,
            _ = self.core.closed.cancelled() => None,
        }
    }

    fn produce(&self, message: Message) -> Result<(), BrokerError> {
        if self.core.closed.is_cancelled() {
            return Err(BrokerError::fail_with_code(
                BrokerErrorCode::Closed,
                "producer is closed",
            ));
        }
        self.core.deliver(message);
        Ok(())
    }

    fn produce_channel(&self) -> Sender<Message> {
        self.ensure_pump();
        self.produce_tx.clone()
    }

    async fn close(&self) {
        self.core.closed.cancel();
    }
}
