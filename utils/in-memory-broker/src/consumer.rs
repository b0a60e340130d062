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

use crate::broker::{LoopbackBroker, SubscriberId, LOOPBACK_PARTITION};
use async_trait::async_trait;
use broker_proxy::{
    BrokerError, BrokerErrorCode, ClientSettings, ConsumerClient, ConsumerEvent, TopicPartition,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

/// A call made on an [`InMemoryConsumer`], in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsumerCall {
    Subscribe(Vec<String>),
    Assign(Vec<TopicPartition>),
    Unassign,
    Close,
}

/// Consumer-role client of a [`LoopbackBroker`].
///
/// Subscribing triggers an immediate assignment of partition 0 of every topic. Events
/// can also be injected directly.
pub struct InMemoryConsumer {
    id: SubscriberId,
    broker: LoopbackBroker,
    settings: ClientSettings,
    events_tx: UnboundedSender<ConsumerEvent>,
    events_rx: tokio::sync::Mutex<UnboundedReceiver<ConsumerEvent>>,
    calls: Mutex<Vec<ConsumerCall>>,
    closed: CancellationToken,
}

impl InMemoryConsumer {
    pub fn new(broker: LoopbackBroker, settings: ClientSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            id: broker.next_subscriber_id(),
            broker,
            settings,
            events_tx,
            events_rx: tokio::sync::Mutex::new(events_rx),
            calls: Mutex::new(Vec::new()),
            closed: CancellationToken::new(),
        }
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<ConsumerCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settings the consumer was built with.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Pushes `event` onto this consumer's event stream. Ignored once closed.
    pub fn inject(&self, event: ConsumerEvent) {
        if !self.closed.is_cancelled() {
            let _ = self.events_tx.send(event);
        }
    }

    pub fn calls(&self) -> Vec<ConsumerCall> {
        self.lock_calls().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.is_cancelled() {
            return Err(BrokerError::fail_with_code(
                BrokerErrorCode::Closed,
                "consumer is closed",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ConsumerClient for InMemoryConsumer {
    async fn recv_event(&self) -> Option<ConsumerEvent> {
        let mut events = self.events_rx.lock().await;
        tokio::select! {
            biased;
            event = events.recv() => event,
            _ = self.closed.cancelled() => None,
        }
    }

    async fn subscribe(&self, topics: &[String]) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.lock_calls().push(ConsumerCall::Subscribe(topics.to_vec()));

        for topic in topics {
            self.broker.subscribe(self.id, topic, self.events_tx.clone());
        }
        let assigned = topics
            .iter()
            .map(|topic| TopicPartition::new(topic.clone(), LOOPBACK_PARTITION))
            .collect();
        let _ = self
            .events_tx
            .send(ConsumerEvent::PartitionsAssigned(assigned));
        Ok(())
    }

    async fn assign(&self, partitions: &[TopicPartition]) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.lock_calls()
            .push(ConsumerCall::Assign(partitions.to_vec()));
        Ok(())
    }

    async fn unassign(&self) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.lock_calls().push(ConsumerCall::Unassign);
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.lock_calls().push(ConsumerCall::Close);
        self.broker.unsubscribe(self.id);
        self.closed.cancel();
        Ok(())
    }
}
