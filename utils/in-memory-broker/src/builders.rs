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
use crate::consumer::InMemoryConsumer;
use crate::producer::InMemoryProducer;
use broker_proxy::options::{BOOTSTRAP_SERVERS, GROUP_ID};
use broker_proxy::{
    BrokerError, BrokerErrorCode, ClientSettings, ConsumerClient, ConsumerClientBuilder,
    ProducerClient, ProducerClientBuilder,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn require(settings: &ClientSettings, key: &str) -> Result<(), BrokerError> {
    match settings.get(key) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(BrokerError::fail_with_code(
            BrokerErrorCode::InvalidConfig,
            format!("missing required setting `{key}`"),
        )),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds [`InMemoryConsumer`]s on one broker and keeps every client it built.
///
/// `bootstrap.servers` and `group.id` are required.
pub struct InMemoryConsumerBuilder {
    broker: LoopbackBroker,
    built: Mutex<Vec<Arc<InMemoryConsumer>>>,
}

impl InMemoryConsumerBuilder {
    pub fn new(broker: LoopbackBroker) -> Self {
        Self {
            broker,
            built: Mutex::new(Vec::new()),
        }
    }

    pub fn last_built(&self) -> Option<Arc<InMemoryConsumer>> {
        lock(&self.built).last().cloned()
    }
}

impl ConsumerClientBuilder for InMemoryConsumerBuilder {
    fn build(&self, settings: &ClientSettings) -> Result<Arc<dyn ConsumerClient>, BrokerError> {
        require(settings, BOOTSTRAP_SERVERS)?;
        require(settings, GROUP_ID)?;

        let consumer = Arc::new(InMemoryConsumer::new(
            self.broker.clone(),
            settings.clone(),
        ));
        lock(&self.built).push(consumer.clone());
        Ok(consumer)
    }
}

/// Builds [`InMemoryProducer`]s on one broker and keeps every client it built.
///
/// `bootstrap.servers` is required.
pub struct InMemoryProducerBuilder {
    broker: LoopbackBroker,
    built: Mutex<Vec<Arc<InMemoryProducer>>>,
}

impl InMemoryProducerBuilder {
    pub fn new(broker: LoopbackBroker) -> Self {
        Self {
            broker,
            built: Mutex::new(Vec::new()),
        }
    }

    pub fn last_built(&self) -> Option<Arc<InMemoryProducer>> {
        lock(&self.built).last().cloned()
    }
}

impl ProducerClientBuilder for InMemoryProducerBuilder {
    fn build(&self, settings: &ClientSettings) -> Result<Arc<dyn ProducerClient>, BrokerError> {
        require(settings, BOOTSTRAP_SERVERS)?;

        let producer = Arc::new(InMemoryProducer::new(
            self.broker.clone(),
            settings.clone(),
        ));
        lock(&self.built).push(producer.clone());
        Ok(producer)
    }
}
