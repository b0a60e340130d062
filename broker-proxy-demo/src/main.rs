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

mod config;

use crate::config::Config;
use async_trait::async_trait;
use broker_proxy::observability::fields;
use broker_proxy::{
    BrokerError, BrokerErrorCode, CallbackError, ConsumerClient, ConsumerProxy, DeliveryHandler,
    Message, MessageHandler, OnBind, ProducerProxy, ProxyError,
};
use clap::Parser;
use in_memory_broker::{InMemoryConsumerBuilder, InMemoryProducerBuilder, LoopbackBroker};
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);
const SETTLE_POLL: Duration = Duration::from_millis(10);

#[derive(Parser)]
#[command()]
struct DemoArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[derive(Default)]
struct CountingReader {
    received: AtomicU64,
}

#[async_trait]
impl MessageHandler for CountingReader {
    async fn on_message(&self, message: Message) {
        let received = self.received.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            received,
            key = fields::format_message_key(&message).as_str(),
            value = fields::format_message_value(&message).as_str(),
            "demo consumer received a message"
        );
    }
}

struct DeliveryLogger;

#[async_trait]
impl DeliveryHandler for DeliveryLogger {
    async fn on_delivery(&self, message: &Message) {
        info!(
            partition = fields::format_topic_partition(&message.topic_partition).as_str(),
            "demo producer got a delivery report"
        );
    }
}

fn load_config(path: &str) -> Result<Config, ProxyError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        BrokerError::fail_with_code(
            BrokerErrorCode::InvalidConfig,
            format!("Unable to read config file {path}: {e:?}"),
        )
    })?;
    let config = json5::from_str(&contents).map_err(|e| {
        BrokerError::fail_with_code(
            BrokerErrorCode::InvalidConfig,
            format!("Unable to parse config file {path}: {e:?}"),
        )
    })?;
    Ok(config)
}

async fn settle(mut done: impl FnMut() -> bool) -> bool {
    tokio::time::timeout(SETTLE_TIMEOUT, async {
        while !done() {
            tokio::time::sleep(SETTLE_POLL).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::main]
async fn main() -> Result<(), ProxyError> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started broker-proxy-demo");

    let args = DemoArgs::parse();
    let config = load_config(&args.config)?;
    let broker = LoopbackBroker::new();

    let topic = config.topic.clone();
    let subscribe: Arc<dyn OnBind<dyn ConsumerClient>> =
        Arc::new(move |client: Arc<dyn ConsumerClient>| {
            let topics = vec![topic.clone()];
            async move {
                client.subscribe(&topics).await?;
                Ok::<(), CallbackError>(())
            }
        });

    let reader = Arc::new(CountingReader::default());
    let consumer = ConsumerProxy::new();
    consumer.register([subscribe])?;
    consumer.on_message(reader.clone())?;
    consumer
        .initialize(
            &InMemoryConsumerBuilder::new(broker.clone()),
            &config.brokers,
            config.consumer.clone(),
        )
        .await?;
    let watch = consumer.watch()?;

    let producer = ProducerProxy::new();
    producer.on_delivery([Arc::new(DeliveryLogger) as Arc<dyn DeliveryHandler>])?;
    producer
        .initialize(
            &InMemoryProducerBuilder::new(broker.clone()),
            &config.brokers,
            config.producer.clone(),
        )
        .await?;

    for sequence in 0..config.message_count {
        let message = Message::new(config.topic.clone(), format!("payload-{sequence}").into_bytes())
            .with_key(format!("key-{sequence}").into_bytes());
        producer.send_async(message)?;
    }

    let expected = u64::from(config.message_count);
    let confirmed = !producer.is_watching_delivery()
        || settle(|| producer.delivered_count() == expected).await;
    let consumed = settle(|| reader.received.load(Ordering::Acquire) == expected).await;
    if !confirmed || !consumed {
        warn!(
            expected,
            delivered = producer.delivered_count(),
            received = reader.received.load(Ordering::Acquire),
            "demo did not settle in time"
        );
    }

    producer.close().await?;
    watch.cancel();
    watch.stopped().await;
    if let Some(client) = consumer.client() {
        client.close().await?;
    }

    info!(
        sent = expected,
        delivered = producer.delivered_count(),
        received = reader.received.load(Ordering::Acquire),
        appended = broker.message_count(&config.topic),
        "broker-proxy-demo finished"
    );
    Ok(())
}
