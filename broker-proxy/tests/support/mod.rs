use broker_proxy::{
    CallbackError, ConsumerClient, ConsumerOptions, ConsumerProxy, DeliveryHandler, EventHandler,
    OnBind, ProducerOptions, ProducerProxy,
};
use in_memory_broker::{
    InMemoryConsumer, InMemoryConsumerBuilder, InMemoryProducer, InMemoryProducerBuilder,
    LoopbackBroker,
};
use integration_test_utils::{RecordingDeliveryHandler, RecordingEventHandler};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const ENDPOINTS: &str = "loopback-1:9092,loopback-2:9092";
pub(crate) const WAIT: Duration = Duration::from_secs(2);

#[allow(dead_code)]
pub(crate) fn subscribe_to(topics: &[&str]) -> Arc<dyn OnBind<dyn ConsumerClient>> {
    let topics: Vec<String> = topics.iter().map(|topic| topic.to_string()).collect();
    Arc::new(move |client: Arc<dyn ConsumerClient>| {
        let topics = topics.clone();
        async move {
            client.subscribe(&topics).await?;
            Ok::<(), CallbackError>(())
        }
    })
}

#[allow(dead_code)]
pub(crate) async fn initialized_consumer(
    broker: &LoopbackBroker,
    proxy: &ConsumerProxy,
    options: ConsumerOptions,
) -> Arc<InMemoryConsumer> {
    let builder = InMemoryConsumerBuilder::new(broker.clone());
    proxy
        .initialize(&builder, ENDPOINTS, options)
        .await
        .expect("consumer initialization should succeed");
    builder.last_built().expect("consumer client built")
}

#[allow(dead_code)]
pub(crate) async fn initialized_producer(
    broker: &LoopbackBroker,
    proxy: &ProducerProxy,
    options: ProducerOptions,
) -> Arc<InMemoryProducer> {
    let builder = InMemoryProducerBuilder::new(broker.clone());
    proxy
        .initialize(&builder, ENDPOINTS, options)
        .await
        .expect("producer initialization should succeed");
    builder.last_built().expect("producer client built")
}

#[allow(dead_code)]
pub(crate) fn as_delivery_handler(handler: &RecordingDeliveryHandler) -> Arc<dyn DeliveryHandler> {
    Arc::new(handler.clone())
}

#[allow(dead_code)]
pub(crate) fn as_event_handler(handler: &RecordingEventHandler) -> Arc<dyn EventHandler> {
    Arc::new(handler.clone())
}
