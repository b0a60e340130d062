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

use broker_proxy::{BrokerError, BrokerErrorCode, ConsumerEvent, Message, Offset};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Every topic lives on this single partition.
pub const LOOPBACK_PARTITION: i32 = 0;

pub(crate) type SubscriberId = u64;

#[derive(Default)]
struct Topics {
    subscribers: HashMap<String, Vec<(SubscriberId, UnboundedSender<ConsumerEvent>)>>,
    next_offset: HashMap<String, i64>,
    failing: HashSet<String>,
}

/// A process-local broker shared by every client built from it.
///
/// Messages produced to a topic are appended to its only partition and handed to every
/// consumer subscribed to that topic at that moment.
#[derive(Clone, Default)]
pub struct LoopbackBroker {
    topics: Arc<Mutex<Topics>>,
    next_subscriber: Arc<AtomicU64>,
}

impl LoopbackBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Topics> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every delivery to `topic` fails from now on with `MessageTimedOut`.
    pub fn fail_deliveries_to(&self, topic: impl Into<String>) {
        self.lock().failing.insert(topic.into());
    }

    /// Number of messages appended to `topic` so far.
    pub fn message_count(&self, topic: &str) -> i64 {
        self.lock().next_offset.get(topic).copied().unwrap_or(0)
    }

    pub(crate) fn next_subscriber_id(&self) -> SubscriberId {
        self.next_subscriber.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn subscribe(
        &self,
        id: SubscriberId,
        topic: &str,
        events: UnboundedSender<ConsumerEvent>,
    ) {
        let mut topics = self.lock();
        let subscribers = topics.subscribers.entry(topic.to_string()).or_default();
        if subscribers.iter().all(|(existing, _)| *existing != id) {
            subscribers.push((id, events));
        }
    }

    pub(crate) fn unsubscribe(&self, id: SubscriberId) {
        for subscribers in self.lock().subscribers.values_mut() {
            subscribers.retain(|(existing, _)| *existing != id);
        }
    }

    /// Appends `message` to its topic and fans it out.
    ///
    /// Returns the stored copy, with partition and offset filled in.
    pub(crate) fn publish(&self, mut message: Message) -> Result<Message, BrokerError> {
        let mut topics = self.lock();
        let topic = message.topic().to_string();

        if topics.failing.contains(&topic) {
            return Err(BrokerError::fail_with_code(
                BrokerErrorCode::MessageTimedOut,
                format!("delivery to {topic} timed out"),
            ));
        }

        let offset = topics.next_offset.entry(topic.clone()).or_insert(0);
        message.topic_partition.partition = LOOPBACK_PARTITION;
        message.topic_partition.offset = Offset::Offset(*offset);
        *offset += 1;

        let mut fanned_out = 0usize;
        if let Some(subscribers) = topics.subscribers.get_mut(&topic) {
            subscribers.retain(|(_, events)| {
                let sent = events.send(ConsumerEvent::Message(message.clone())).is_ok();
                fanned_out += usize::from(sent);
                sent
            });
        }
        debug!(topic = topic.as_str(), fanned_out, "loopback message appended");

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::LoopbackBroker;
    use broker_proxy::{BrokerErrorCode, ConsumerEvent, Message, Offset};
    use tokio::sync::mpsc;

    #[test]
    fn publish_assigns_offsets_and_fans_out() {
        let broker = LoopbackBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broker.subscribe(7, "orders", tx.clone());
        broker.subscribe(7, "orders", tx);

        broker
            .publish(Message::new("orders", b"a".to_vec()))
            .unwrap();
        let second = broker
            .publish(Message::new("orders", b"b".to_vec()))
            .unwrap();

        assert_eq!(second.topic_partition.offset, Offset::Offset(1));
        assert_eq!(broker.message_count("orders"), 2);
        assert!(matches!(rx.try_recv(), Ok(ConsumerEvent::Message(_))));
        assert!(matches!(rx.try_recv(), Ok(ConsumerEvent::Message(_))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failing_topics_reject_publish() {
        let broker = LoopbackBroker::new();
        broker.fail_deliveries_to("audit");

        let err = broker
            .publish(Message::new("audit", b"x".to_vec()))
            .unwrap_err();

        assert_eq!(err.code, BrokerErrorCode::MessageTimedOut);
        assert_eq!(broker.message_count("audit"), 0);
    }

    #[test]
    fn unsubscribed_consumers_stop_receiving() {
        let broker = LoopbackBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broker.subscribe(1, "orders", tx);
        broker.unsubscribe(1);

        broker
            .publish(Message::new("orders", b"a".to_vec()))
            .unwrap();

        assert!(rx.try_recv().is_err());
    }
}
