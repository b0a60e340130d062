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

use broker_proxy::options::{BOOTSTRAP_SERVERS, GROUP_ID};
use broker_proxy::{
    BrokerErrorCode, ClientSettings, ConsumerClient, ConsumerEvent, ConsumerOptions,
    ConsumerProxy, Message, ProxyError,
};
use in_memory_broker::{ConsumerCall, InMemoryConsumer, InMemoryConsumerBuilder, LoopbackBroker};
use integration_test_utils::{wait_until, BindOrderRecorder, RecordingMessageHandler};
use std::sync::Arc;
use support::{initialized_consumer, subscribe_to, ENDPOINTS, WAIT};

fn same_client(a: &Arc<dyn ConsumerClient>, b: &Arc<InMemoryConsumer>) -> bool {
    Arc::as_ptr(a) as *const u8 == Arc::as_ptr(b) as *const u8
}

#[tokio::test(flavor = "multi_thread")]
async fn sequential_callbacks_run_once_in_registration_order() {
    integration_test_utils::init_logging();

    let recorder = BindOrderRecorder::new();
    let proxy = ConsumerProxy::new();
    proxy
        .register([
            recorder.callback::<dyn ConsumerClient>("first"),
            recorder.failing_callback::<dyn ConsumerClient>("second"),
        ])
        .expect("unbound proxy accepts callbacks");
    proxy
        .register([recorder.callback::<dyn ConsumerClient>("third")])
        .expect("unbound proxy accepts callbacks");

    initialized_consumer(
        &LoopbackBroker::new(),
        &proxy,
        ConsumerOptions::default().with_group_id("lifecycle"),
    )
    .await;

    assert_eq!(recorder.order(), vec!["first", "second", "third"]);
    assert_eq!(
        proxy.register([recorder.callback::<dyn ConsumerClient>("late")]),
        Err(ProxyError::AlreadyBound)
    );
    assert_eq!(recorder.order().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_callbacks_all_run_once() {
    integration_test_utils::init_logging();

    let recorder = BindOrderRecorder::new();
    let proxy = ConsumerProxy::new();
    proxy
        .register(
            ["a", "b", "c"].map(|label| recorder.callback::<dyn ConsumerClient>(label)),
        )
        .unwrap();

    initialized_consumer(
        &LoopbackBroker::new(),
        &proxy,
        ConsumerOptions::default()
            .with_group_id("parallel")
            .with_parallel_callback(),
    )
    .await;

    assert!(wait_until(WAIT, || recorder.order().len() == 3).await);
    let mut order = recorder.order();
    order.sort();
    assert_eq!(order, vec!["a", "b", "c"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn second_bind_is_rejected_and_keeps_first_client() {
    integration_test_utils::init_logging();

    let broker = LoopbackBroker::new();
    let first = Arc::new(InMemoryConsumer::new(broker.clone(), ClientSettings::new()));
    let second = Arc::new(InMemoryConsumer::new(broker, ClientSettings::new()));
    let proxy = ConsumerProxy::new();

    proxy.bind(first.clone()).await.expect("first bind");
    assert_eq!(proxy.bind(second.clone()).await, Err(ProxyError::AlreadyBound));

    let bound = proxy.client().expect("proxy is bound");
    assert!(same_client(&bound, &first));
    assert!(!same_client(&bound, &second));
    assert!(proxy.is_ready());
}

#[tokio::test(flavor = "multi_thread")]
async fn initialize_injects_endpoints_and_keeps_supplied_settings() {
    integration_test_utils::init_logging();

    let proxy = ConsumerProxy::with_options(
        ConsumerOptions::default().with_setting("session.timeout.ms", "45000"),
    );
    let consumer = initialized_consumer(
        &LoopbackBroker::new(),
        &proxy,
        ConsumerOptions::default()
            .with_uuid4_group_id(&["billing"])
            .with_setting(BOOTSTRAP_SERVERS, "somewhere-else:1"),
    )
    .await;

    let settings = consumer.settings();
    assert_eq!(settings.get(BOOTSTRAP_SERVERS), Some(ENDPOINTS));
    assert_eq!(settings.get("session.timeout.ms"), Some("45000"));
    assert!(settings
        .get(GROUP_ID)
        .is_some_and(|group| group.starts_with("billing__")));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_construction_leaves_no_partial_state() {
    integration_test_utils::init_logging();

    let recorder = BindOrderRecorder::new();
    let proxy = ConsumerProxy::new();
    proxy
        .register([recorder.callback::<dyn ConsumerClient>("never")])
        .unwrap();
    let builder = InMemoryConsumerBuilder::new(LoopbackBroker::new());

    let result = proxy
        .initialize(&builder, ENDPOINTS, ConsumerOptions::default())
        .await;

    let err = match result {
        Err(ProxyError::Broker(err)) => err,
        other => panic!("expected the construction error, got {other:?}"),
    };
    assert_eq!(err.code, BrokerErrorCode::InvalidConfig);
    assert!(!proxy.is_ready());
    assert!(builder.last_built().is_none());
    assert!(recorder.order().is_empty());
    assert!(proxy.watch().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn message_handler_cannot_be_replaced() {
    integration_test_utils::init_logging();

    let broker = LoopbackBroker::new();
    let proxy = ConsumerProxy::new();
    let first = RecordingMessageHandler::new();
    let second = RecordingMessageHandler::new();

    assert!(proxy.on_message(Arc::new(first.clone())).is_ok());
    assert_eq!(
        proxy.on_message(Arc::new(second.clone())),
        Err(ProxyError::AlreadyRegistered)
    );

    proxy.register([subscribe_to(&["orders"])]).unwrap();
    let consumer =
        initialized_consumer(&broker, &proxy, ConsumerOptions::default().with_group_id("g")).await;
    let handle = proxy.watch().expect("bound proxy can watch");

    consumer.inject(ConsumerEvent::Message(Message::new("orders", b"one".to_vec())));

    assert!(wait_until(WAIT, || first.messages().len() == 1).await);
    assert!(second.messages().is_empty());
    assert!(consumer
        .calls()
        .contains(&ConsumerCall::Subscribe(vec!["orders".to_string()])));

    handle.cancel();
    handle.stopped().await;
}
