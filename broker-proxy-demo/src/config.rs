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

use broker_proxy::{ConsumerOptions, ProducerOptions};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) brokers: String,
    pub(crate) topic: String,
    pub(crate) message_count: u32,
    #[serde(default)]
    pub(crate) consumer: ConsumerOptions,
    #[serde(default)]
    pub(crate) producer: ProducerOptions,
}
