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

//! Canonical structured field keys and value-format helpers.

use crate::message::{Message, Offset, TopicPartition};

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const PROXY: &str = "proxy";
pub const TOPIC: &str = "topic";
pub const PARTITION: &str = "partition";
pub const KEY: &str = "key";
pub const VALUE: &str = "value";
pub const ERR: &str = "err";
pub const REASON: &str = "reason";

pub const NONE: &str = "none";
pub const REASON_EVENT_STREAM_CLOSED: &str = "event_stream_closed";
pub const REASON_CANCELLED: &str = "cancelled";

/// Renders an optional payload as UTF-8, replacing invalid sequences.
pub fn format_bytes(bytes: Option<&[u8]>) -> String {
    bytes
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_else(|| NONE.to_string())
}

pub fn format_offset(offset: Offset) -> String {
    match offset {
        Offset::Unset => "unset".to_string(),
        Offset::Beginning => "beginning".to_string(),
        Offset::End => "end".to_string(),
        Offset::Stored => "stored".to_string(),
        Offset::Offset(value) => value.to_string(),
    }
}

/// `topic[partition]@offset`, with the error appended when one is set.
pub fn format_topic_partition(tp: &TopicPartition) -> String {
    let rendered = format!("{}[{}]@{}", tp.topic, tp.partition, format_offset(tp.offset));
    match &tp.error {
        Some(err) => format!("{rendered} ({err})"),
        None => rendered,
    }
}

pub fn format_partitions(partitions: &[TopicPartition]) -> String {
    if partitions.is_empty() {
        return NONE.to_string();
    }
    partitions
        .iter()
        .map(format_topic_partition)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn format_message_key(message: &Message) -> String {
    format_bytes(message.key.as_deref())
}

pub fn format_message_value(message: &Message) -> String {
    format_bytes(message.value.as_deref())
}
