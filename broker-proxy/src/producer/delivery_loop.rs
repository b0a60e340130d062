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

//! Delivery-confirmation loop of the producer proxy.

use crate::client::ProducerClient;
use crate::event::ProducerEvent;
use crate::observability::{events, fields};
use crate::producer::handlers::DeliveryHandlers;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

const COMPONENT: &str = "producer_delivery_loop";

/// Classifies events until the client's event stream closes.
///
/// This task is the only writer of `delivered`.
pub(crate) async fn delivery_loop(
    client: Arc<dyn ProducerClient>,
    handlers: DeliveryHandlers,
    delivered: Arc<AtomicU64>,
) {
    info!(
        event = events::PRODUCER_DELIVERY_WATCH_START,
        component = COMPONENT,
        delivered_handlers = handlers.delivered.len(),
        failed_handlers = handlers.failed.len(),
        unrecognized_handlers = handlers.unrecognized.len(),
        "producer delivery loop started"
    );

    while let Some(event) = client.recv_event().await {
        classify_event(&handlers, &delivered, event).await;
    }

    info!(
        event = events::PRODUCER_DELIVERY_WATCH_CLOSED,
        component = COMPONENT,
        reason = fields::REASON_EVENT_STREAM_CLOSED,
        delivered = delivered.load(Ordering::Acquire),
        "event stream closed; stopping producer delivery loop"
    );
}

pub(crate) async fn classify_event(
    handlers: &DeliveryHandlers,
    delivered: &AtomicU64,
    event: ProducerEvent,
) {
    let message = match event {
        ProducerEvent::Delivery(message) => message,
        other => {
            if handlers.unrecognized.is_empty() {
                error!(
                    event = events::PRODUCER_IGNORED_EVENT,
                    component = COMPONENT,
                    kind = other.kind(),
                    detail = ?other,
                    "unrecognized producer event"
                );
            }
            for handler in &handlers.unrecognized {
                handler.on_event(&other).await;
            }
            return;
        }
    };

    match message.delivery_error() {
        None => {
            delivered.fetch_add(1, Ordering::AcqRel);
            if handlers.delivered.is_empty() {
                info!(
                    event = events::PRODUCER_DELIVERED,
                    component = COMPONENT,
                    partition = fields::format_topic_partition(&message.topic_partition).as_str(),
                    key = fields::format_message_key(&message).as_str(),
                    "message delivered"
                );
            }
            for handler in &handlers.delivered {
                handler.on_delivery(&message).await;
            }
        }
        Some(err) => {
            if handlers.failed.is_empty() {
                error!(
                    event = events::PRODUCER_DELIVERY_FAILED,
                    component = COMPONENT,
                    topic = message.topic(),
                    key = fields::format_message_key(&message).as_str(),
                    err = %err,
                    "message delivery failed"
                );
            }
            for handler in &handlers.failed {
                handler.on_delivery(&message).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::classify_event;
    use crate::error::{BrokerError, BrokerErrorCode};
    use crate::event::ProducerEvent;
    use crate::message::Message;
    use crate::producer::handlers::{DeliveryHandler, DeliveryHandlers, EventHandler};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    struct Labelled {
        label: &'static str,
        recorder: Arc<Recorder>,
    }

    #[async_trait]
    impl DeliveryHandler for Labelled {
        async fn on_delivery(&self, message: &Message) {
            self.recorder
                .seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, message.topic()));
        }
    }

    #[async_trait]
    impl EventHandler for Labelled {
        async fn on_event(&self, event: &ProducerEvent) {
            self.recorder
                .seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.kind()));
        }
    }

    fn failed_report(topic: &str) -> ProducerEvent {
        let mut message = Message::new(topic, b"v".to_vec());
        message.topic_partition.error = Some(BrokerError::fail_with_code(
            BrokerErrorCode::MessageTimedOut,
            "delivery timed out",
        ));
        ProducerEvent::Delivery(message)
    }

    #[tokio::test]
    async fn only_successful_reports_are_counted() {
        let handlers = DeliveryHandlers::default();
        let delivered = AtomicU64::new(0);

        for event in [
            ProducerEvent::Delivery(Message::new("a", b"1".to_vec())),
            failed_report("a"),
            ProducerEvent::Other("stats".into()),
            ProducerEvent::Delivery(Message::new("a", b"2".to_vec())),
            ProducerEvent::Error(BrokerError::fail_with_code(
                BrokerErrorCode::Transport,
                "all brokers down",
            )),
        ] {
            classify_event(&handlers, &delivered, event).await;
        }

        assert_eq!(delivered.load(Ordering::Acquire), 2);
    }

    #[tokio::test]
    async fn every_handler_of_a_category_runs_in_order() {
        let recorder = Arc::new(Recorder::default());
        let labelled = |label| {
            Arc::new(Labelled {
                label,
                recorder: recorder.clone(),
            })
        };
        let ok_1: Arc<dyn DeliveryHandler> = labelled("ok-1");
        let ok_2: Arc<dyn DeliveryHandler> = labelled("ok-2");
        let fail: Arc<dyn DeliveryHandler> = labelled("fail");
        let other: Arc<dyn EventHandler> = labelled("other");
        let handlers = DeliveryHandlers {
            delivered: vec![ok_1, ok_2],
            failed: vec![fail],
            unrecognized: vec![other],
        };
        let delivered = AtomicU64::new(0);

        classify_event(
            &handlers,
            &delivered,
            ProducerEvent::Delivery(Message::new("t", b"v".to_vec())),
        )
        .await;
        classify_event(&handlers, &delivered, failed_report("t")).await;
        classify_event(&handlers, &delivered, ProducerEvent::Other("x".into())).await;

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["ok-1:t", "ok-2:t", "fail:t", "other:other"]
        );
        assert_eq!(delivered.load(Ordering::Acquire), 1);
    }
}
