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

//! Tagged event values read from a broker client's event stream.

use crate::error::BrokerError;
use crate::message::{Message, TopicPartition};

/// Events delivered to a consumer-role client.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsumerEvent {
    Message(Message),
    PartitionsAssigned(Vec<TopicPartition>),
    PartitionsRevoked(Vec<TopicPartition>),
    /// The consumer reached the current end of a partition.
    PartitionEof(TopicPartition),
    Error(BrokerError),
    /// Anything the dispatch loop has no routing rule for (offset commits, stats).
    Other(String),
}

/// Events delivered to a producer-role client.
#[derive(Clone, Debug, PartialEq)]
pub enum ProducerEvent {
    /// A delivery report. The outcome is `message.topic_partition.error`.
    Delivery(Message),
    Error(BrokerError),
    Other(String),
}

impl ProducerEvent {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ProducerEvent::Delivery(_) => "delivery",
            ProducerEvent::Error(_) => "error",
            ProducerEvent::Other(_) => "other",
        }
    }
}
