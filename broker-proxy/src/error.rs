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

//! Error taxonomy shared by both proxies and by broker client implementations.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error returned by an on-bind callback. Only ever logged.
pub type CallbackError = Box<dyn Error + Send + Sync + 'static>;

/// Coarse classification of a failure reported by the broker client library.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BrokerErrorCode {
    InvalidConfig,
    Transport,
    QueueFull,
    MessageTimedOut,
    UnknownTopicOrPartition,
    Closed,
    Internal,
}

impl Display for BrokerErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BrokerErrorCode::InvalidConfig => "invalid_config",
            BrokerErrorCode::Transport => "transport",
            BrokerErrorCode::QueueFull => "queue_full",
            BrokerErrorCode::MessageTimedOut => "message_timed_out",
            BrokerErrorCode::UnknownTopicOrPartition => "unknown_topic_or_partition",
            BrokerErrorCode::Closed => "closed",
            BrokerErrorCode::Internal => "internal",
        };
        f.write_str(label)
    }
}

/// A failure surfaced verbatim from the broker client, either returned from a
/// call or carried as data inside an event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BrokerError {
    pub code: BrokerErrorCode,
    pub message: String,
}

impl BrokerError {
    pub fn fail_with_code(code: BrokerErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for BrokerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "broker error ({}): {}", self.code, self.message)
    }
}

impl Error for BrokerError {}

/// Failures of the proxy lifecycle state machine.
///
/// All variants but `Broker` are state violations and are never retried. `Broker`
/// wraps a client construction or submission failure unchanged.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProxyError {
    AlreadyBound,
    NotYetBound,
    AlreadyRegistered,
    DeliverIsWatching,
    /// A consumer watch loop is still running on the bound client.
    AlreadyWatching,
    Broker(BrokerError),
}

impl Display for ProxyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyError::AlreadyBound => write!(f, "proxy is already bound to a client"),
            ProxyError::NotYetBound => write!(f, "proxy is not bound to a client yet"),
            ProxyError::AlreadyRegistered => write!(f, "handler is already registered"),
            ProxyError::DeliverIsWatching => {
                write!(f, "cannot register handler while delivery is being watched")
            }
            ProxyError::AlreadyWatching => write!(f, "a watch loop is already running"),
            ProxyError::Broker(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProxyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProxyError::Broker(err) => Some(err),
            _ => None,
        }
    }
}

impl ProxyError {
    pub(crate) fn no_runtime(err: impl Display) -> Self {
        ProxyError::Broker(BrokerError::fail_with_code(
            BrokerErrorCode::Internal,
            format!("binding needs a tokio runtime: {err}"),
        ))
    }
}

impl From<BrokerError> for ProxyError {
    fn from(err: BrokerError) -> Self {
        ProxyError::Broker(err)
    }
}
