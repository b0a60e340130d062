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

//! Broker message model plus helpers for building and flattening messages.

use crate::error::BrokerError;
use std::collections::HashMap;

/// Lets the broker pick the partition for an outgoing message.
pub const PARTITION_ANY: i32 = -1;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Offset {
    #[default]
    Unset,
    Beginning,
    End,
    Stored,
    Offset(i64),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
    pub offset: Offset,
    /// Per-partition failure, set on failed delivery reports.
    pub error: Option<BrokerError>,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset: Offset::Unset,
            error: None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header {
    pub key: String,
    pub value: Vec<u8>,
}

/// A message as handed to and received from the broker client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub topic_partition: TopicPartition,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Vec<Header>,
}

impl Message {
    /// Builds an outgoing message for `topic` on [`PARTITION_ANY`].
    ///
    /// ```
    /// use broker_proxy::Message;
    ///
    /// let msg = Message::new("orders", b"created".to_vec())
    ///     .with_key(b"order-1".to_vec())
    ///     .add_header("trace", b"abc".to_vec())
    ///     .with_partition(3);
    ///
    /// assert_eq!(msg.topic(), "orders");
    /// assert_eq!(msg.topic_partition.partition, 3);
    /// assert_eq!(msg.key().unwrap(), Some(&b"order-1"[..]));
    /// ```
    pub fn new(topic: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            topic_partition: TopicPartition::new(topic, PARTITION_ANY),
            key: None,
            value: Some(value),
            headers: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: Vec<u8>) -> Self {
        self.key = Some(key);
        self
    }

    /// Appends every entry of `headers` after the headers already present.
    pub fn with_headers(mut self, headers: HashMap<String, Vec<u8>>) -> Self {
        self.headers
            .extend(headers.into_iter().map(|(key, value)| Header { key, value }));
        self
    }

    pub fn add_header(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.headers.push(Header {
            key: key.into(),
            value,
        });
        self
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.topic_partition.partition = partition;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic_partition.topic
    }

    /// Delivery error carried by this message, if it is a failed delivery report.
    pub fn delivery_error(&self) -> Option<&BrokerError> {
        self.topic_partition.error.as_ref()
    }

    pub fn value(&self) -> Result<Option<&[u8]>, BrokerError> {
        self.check_delivery()?;
        Ok(self.value.as_deref())
    }

    pub fn key(&self) -> Result<Option<&[u8]>, BrokerError> {
        self.check_delivery()?;
        Ok(self.key.as_deref())
    }

    /// Headers folded into a map; a repeated key keeps its last value.
    pub fn headers_map(&self) -> Result<HashMap<String, Vec<u8>>, BrokerError> {
        self.check_delivery()?;
        Ok(self
            .headers
            .iter()
            .map(|header| (header.key.clone(), header.value.clone()))
            .collect())
    }

    fn check_delivery(&self) -> Result<(), BrokerError> {
        match self.delivery_error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Flattened view of a [`Message`] for application code.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConciseMessage {
    pub topic: String,
    pub value: Option<Vec<u8>>,
    pub key: Option<Vec<u8>>,
    pub headers: HashMap<String, Vec<u8>>,
}

impl ConciseMessage {
    pub fn extract(message: &Message) -> Result<Self, BrokerError> {
        Ok(Self {
            topic: message.topic().to_string(),
            value: message.value()?.map(<[u8]>::to_vec),
            key: message.key()?.map(<[u8]>::to_vec),
            headers: message.headers_map()?,
        })
    }

    pub fn as_message(&self) -> Message {
        let mut message = Message {
            topic_partition: TopicPartition::new(self.topic.clone(), PARTITION_ANY),
            key: None,
            value: self.value.clone(),
            headers: Vec::new(),
        };
        if let Some(key) = &self.key {
            message.key = Some(key.clone());
        }
        if !self.headers.is_empty() {
            message = message.with_headers(self.headers.clone());
        }
        message
    }
}
