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

//! Client settings and the behavioural options of both proxies.
//!
//! Settings are passed through to the broker client builder untouched, except for
//! [`BOOTSTRAP_SERVERS`], which initialization always overwrites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

pub const BOOTSTRAP_SERVERS: &str = "bootstrap.servers";
pub const GROUP_ID: &str = "group.id";
pub const AUTO_OFFSET_RESET: &str = "auto.offset.reset";
pub const ISOLATION_LEVEL: &str = "isolation.level";
pub const DELIVERY_REPORTS: &str = "delivery.reports";
pub const BATCH_PRODUCER: &str = "batch.producer";
pub const ACKS: &str = "acks";
pub const QUEUE_BUFFERING_MAX_MS: &str = "queue.buffering.max.ms";

/// String-keyed broker settings.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSettings(BTreeMap<String, String>);

impl ClientSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlays `other` on top of `self`, key by key.
    pub fn merge(&mut self, other: &ClientSettings) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

/// How on-bind callbacks run. Fixed for the proxy's lifetime once bound.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackMode {
    /// One after another on the binding task, in registration order.
    #[default]
    Sequential,
    /// One detached task per callback; bind does not wait for them.
    Parallel,
}

impl CallbackMode {
    fn merged(self, other: CallbackMode) -> CallbackMode {
        if self == CallbackMode::Parallel || other == CallbackMode::Parallel {
            CallbackMode::Parallel
        } else {
            CallbackMode::Sequential
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetReset {
    Earliest,
    Latest,
    Error,
}

impl OffsetReset {
    fn as_setting(self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
            OffsetReset::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
}

impl IsolationLevel {
    fn as_setting(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "read_uncommitted",
            IsolationLevel::ReadCommitted => "read_committed",
        }
    }
}

/// How many replicas must acknowledge a produced message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Acks {
    None,
    Leader,
    All,
    /// Must not be lower than the cluster's `min.insync.replicas`.
    Count(u16),
}

impl Acks {
    fn as_setting(self) -> String {
        match self {
            Acks::None => "0".to_string(),
            Acks::Leader => "1".to_string(),
            Acks::All => "-1".to_string(),
            Acks::Count(count) => count.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerOptions {
    pub settings: ClientSettings,
    pub callback_mode: CallbackMode,
}

impl ConsumerOptions {
    pub fn with_parallel_callback(mut self) -> Self {
        self.callback_mode = CallbackMode::Parallel;
        self
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.settings.set(GROUP_ID, group_id);
        self
    }

    /// Uses a random v4 UUID as group id, prefixed by `namespace` joined with `-`
    /// and separated from the UUID by `__`.
    pub fn with_uuid4_group_id(mut self, namespace: &[&str]) -> Self {
        let uuid = Uuid::new_v4().to_string();
        let group_id = if namespace.is_empty() {
            uuid
        } else {
            format!("{}__{uuid}", namespace.join("-"))
        };
        self.settings.set(GROUP_ID, group_id);
        self
    }

    pub fn with_auto_offset_reset(mut self, strategy: OffsetReset) -> Self {
        self.settings.set(AUTO_OFFSET_RESET, strategy.as_setting());
        self
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.settings.set(ISOLATION_LEVEL, level.as_setting());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.set(key, value);
        self
    }

    /// `other` layered over `self`; the parallel flag is sticky.
    pub fn merged(&self, other: &ConsumerOptions) -> ConsumerOptions {
        let mut settings = self.settings.clone();
        settings.merge(&other.settings);
        ConsumerOptions {
            settings,
            callback_mode: self.callback_mode.merged(other.callback_mode),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProducerOptions {
    pub settings: ClientSettings,
    pub callback_mode: CallbackMode,
    pub confirm_delivery: bool,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            settings: ClientSettings::default(),
            callback_mode: CallbackMode::Sequential,
            confirm_delivery: true,
        }
    }
}

impl ProducerOptions {
    pub fn with_parallel_callback(mut self) -> Self {
        self.callback_mode = CallbackMode::Parallel;
        self
    }

    /// Turns off delivery reports in the client and skips the delivery loop.
    pub fn without_confirm_delivery(mut self) -> Self {
        self.confirm_delivery = false;
        self.settings.set(DELIVERY_REPORTS, "false");
        self
    }

    /// Not recommended; trades latency for throughput.
    pub fn as_batch_producer(mut self) -> Self {
        self.settings.set(BATCH_PRODUCER, "true");
        self
    }

    pub fn with_acks(mut self, acks: Acks) -> Self {
        self.settings.set(ACKS, acks.as_setting());
        self
    }

    /// Delay spent accumulating a batch before it is sent, at millisecond resolution.
    pub fn with_queue_buffering_max_delay(mut self, delay: Duration) -> Self {
        self.settings
            .set(QUEUE_BUFFERING_MAX_MS, delay.as_millis().to_string());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.set(key, value);
        self
    }

    /// `other` layered over `self`; parallel mode and disabled confirmation are sticky.
    pub fn merged(&self, other: &ProducerOptions) -> ProducerOptions {
        let mut settings = self.settings.clone();
        settings.merge(&other.settings);
        ProducerOptions {
            settings,
            callback_mode: self.callback_mode.merged(other.callback_mode),
            confirm_delivery: self.confirm_delivery && other.confirm_delivery,
        }
    }
}
