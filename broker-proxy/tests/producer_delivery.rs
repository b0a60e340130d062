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

mod support;

use broker_proxy::{
    BrokerError, BrokerErrorCode, CallbackError, Message, OnBind, ProducerClient, ProducerEvent,
    ProducerOptions, ProducerProxy, ProxyError,
};
use in_memory_broker::{InMemoryProducer, LoopbackBroker};
use integration_test_utils::{
    wait_until, BindOrderRecorder, RecordingDeliveryHandler, RecordingEventHandler,
};
use std::sync::Arc;
use std::time::Duration;
use support::{as_delivery_handler, as_event_handler, initialized_producer, WAIT};

#[tokio::test(flavor = "multi_thread")]
async fn delivered_count_tracks_only_successful_reports() {
    integration_test_utils::init_logging();

    const DELIVERED: usize = 5;
    const FAILED: usize = 3;

    let broker = LoopbackBroker::new();
    broker.fail_deliveries_to("audit");
    let proxy = ProducerProxy::new();
    let delivered = RecordingDeliveryHandler::new();
    let failed = RecordingDeliveryHandler::new();
    let unrecognized = RecordingEventHandler::new();
    proxy.on_delivery([as_delivery_handler(&delivered)]).unwrap();
    proxy.on_delivery_error([as_delivery_handler(&failed)]).unwrap();
    proxy
        .on_unrecognized_event([as_event_handler(&unrecognized)])
        .unwrap();
    assert_eq!(proxy.delivered_count(), 0);

    let producer = initialized_producer(&broker, &proxy, ProducerOptions::default()).await;
    assert!(proxy.is_watching_delivery());

    for i in 0..DELIVERED.max(FAILED) {
        if i < DELIVERED {
            proxy
                .send_sync(Message::new("orders", vec![i as u8]))
                .unwrap();
        }
        if i < FAILED {
            proxy.send_sync(Message::new("audit", vec![i as u8])).unwrap();
        }
        producer.inject(ProducerEvent::Other(format!("stats-{i}")));
    }
    producer.inject(ProducerEvent::Error(BrokerError::fail_with_code(
        BrokerErrorCode::Transport,
        "broker connection reset",
    )));

    assert!(
        wait_until(WAIT, || delivered.reports().len() == DELIVERED
            && failed.reports().len() == FAILED
            && unrecognized.events().len() == DELIVERED + 1)
        .await
    );
    assert_eq!(proxy.delivered_count(), DELIVERED as u64);
    assert!(failed
        .reports()
        .iter()
        .all(|report| report.delivery_error().map(|err| err.code)
            == Some(BrokerErrorCode::MessageTimedOut)));

    proxy.close().await.unwrap();
    assert_eq!(proxy.delivered_count(), DELIVERED as u64);
}

#[tokio::test(flavor = "multi_thread")]
async fn late_handler_registration_is_rejected_and_ignored() {
    integration_test_utils::init_logging();

    let broker = LoopbackBroker::new();
    let proxy = ProducerProxy::new();
    let early = RecordingDeliveryHandler::new();
    let late = RecordingDeliveryHandler::new();
    proxy.on_delivery([as_delivery_handler(&early)]).unwrap();
    initialized_producer(&broker, &proxy, ProducerOptions::default()).await;

    proxy.send_sync(Message::new("orders", b"before".to_vec())).unwrap();
    assert_eq!(
        proxy.on_delivery([as_delivery_handler(&late)]),
        Err(ProxyError::DeliverIsWatching)
    );
    assert_eq!(
        proxy.on_delivery_error([as_delivery_handler(&late)]),
        Err(ProxyError::DeliverIsWatching)
    );
    proxy.send_sync(Message::new("orders", b"after".to_vec())).unwrap();

    assert!(wait_until(WAIT, || early.reports().len() == 2).await);
    assert!(late.reports().is_empty());
    assert_eq!(proxy.delivered_count(), 2);

    proxy.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn disabled_confirmation_never_counts_deliveries() {
    integration_test_utils::init_logging();

    let broker = LoopbackBroker::new();
    let proxy = ProducerProxy::new();
    let producer = initialized_producer(
        &broker,
        &proxy,
        ProducerOptions::default().without_confirm_delivery(),
    )
    .await;

    proxy
        .send_sync(Message::new("orders", b"unconfirmed".to_vec()))
        .expect("submission accepted");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(proxy.delivered_count(), 0);
    assert!(!proxy.is_watching_delivery());
    assert_eq!(broker.message_count("orders"), 1);
    assert_eq!(producer.settings().get("delivery.reports"), Some("false"));
    assert!(proxy
        .on_delivery([as_delivery_handler(&RecordingDeliveryHandler::new())])
        .is_ok());

    proxy.close().await.unwrap();
    assert_eq!(proxy.delivered_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn send_async_goes_through_the_produce_channel() {
    integration_test_utils::init_logging();

    let broker = LoopbackBroker::new();
    let proxy = ProducerProxy::new();
    initialized_producer(&broker, &proxy, ProducerOptions::default()).await;

    for value in ["a", "b", "c"] {
        proxy
            .send_async(Message::new("orders", value.as_bytes().to_vec()))
            .expect("bound proxy accepts async sends");
    }

    assert!(wait_until(WAIT, || proxy.delivered_count() == 3).await);
    assert_eq!(broker.message_count("orders"), 3);

    proxy.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn on_bind_callbacks_see_the_bound_client() {
    integration_test_utils::init_logging();

    let broker = LoopbackBroker::new();
    let recorder = BindOrderRecorder::new();
    let proxy = ProducerProxy::new();
    let warm_up: Arc<dyn OnBind<dyn ProducerClient>> =
        Arc::new(|client: Arc<dyn ProducerClient>| async move {
            client.produce(Message::new("warm-up", b"hello".to_vec()))?;
            Ok::<(), CallbackError>(())
        });
    proxy
        .register([recorder.callback::<dyn ProducerClient>("first"), warm_up])
        .unwrap();

    initialized_producer(&broker, &proxy, ProducerOptions::default()).await;

    assert_eq!(recorder.order(), vec!["first"]);
    assert_eq!(broker.message_count("warm-up"), 1);
    assert!(wait_until(WAIT, || proxy.delivered_count() == 1).await);

    proxy.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_producer_is_released_for_good() {
    integration_test_utils::init_logging();

    let broker = LoopbackBroker::new();
    let proxy = ProducerProxy::new();
    let producer = initialized_producer(&broker, &proxy, ProducerOptions::default()).await;

    proxy.close().await.expect("bound proxy closes");

    assert!(producer.is_closed());
    assert!(!proxy.is_ready());
    assert!(!proxy.is_watching_delivery());
    assert_eq!(proxy.close().await, Err(ProxyError::NotYetBound));
    assert_eq!(
        proxy.send_sync(Message::new("orders", b"x".to_vec())),
        Err(ProxyError::NotYetBound)
    );
    assert_eq!(
        proxy.send_async(Message::new("orders", b"x".to_vec())),
        Err(ProxyError::NotYetBound)
    );

    let replacement: Arc<dyn ProducerClient> = Arc::new(InMemoryProducer::new(
        broker,
        Default::default(),
    ));
    assert_eq!(proxy.bind(replacement).await, Err(ProxyError::AlreadyBound));
}

#[tokio::test(flavor = "multi_thread")]
async fn send_async_works_from_a_thread_outside_the_runtime() {
    integration_test_utils::init_logging();

    let broker = LoopbackBroker::new();
    let proxy = Arc::new(ProducerProxy::new());
    initialized_producer(&broker, &proxy, ProducerOptions::default()).await;

    let sender = proxy.clone();
    let sent = std::thread::spawn(move || {
        sender.send_async(Message::new("orders", b"from-thread".to_vec()))
    })
    .join()
    .expect("sender thread did not panic");

    assert_eq!(sent, Ok(()));
    assert!(wait_until(WAIT, || proxy.delivered_count() == 1).await);
    assert_eq!(broker.message_count("orders"), 1);

    proxy.close().await.unwrap();
}
