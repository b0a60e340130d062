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

//! Loopback broker client library for tests and demos.
//!
//! Clients built from one [`LoopbackBroker`] share its topics. Nothing leaves the process.

mod broker;
pub use broker::{LoopbackBroker, LOOPBACK_PARTITION};

mod builders;
pub use builders::{InMemoryConsumerBuilder, InMemoryProducerBuilder};

mod consumer;
pub use consumer::{ConsumerCall, InMemoryConsumer};

mod producer;
pub use producer::InMemoryProducer;
