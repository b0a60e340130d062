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

//! One-shot client binding guarded by a tagged state value.

use crate::error::ProxyError;
use crate::lifecycle::OnBind;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) type BindCallbacks<C> = Vec<Arc<dyn OnBind<C>>>;

enum BindState<C: ?Sized + Send + Sync + 'static> {
    Unbound { pending: BindCallbacks<C> },
    Bound { client: Arc<C> },
    /// The client was handed back on close. Binding stays forbidden.
    Released,
}

pub(crate) struct BindGate<C: ?Sized + Send + Sync + 'static> {
    state: Mutex<BindState<C>>,
}

impl<C: ?Sized + Send + Sync + 'static> BindGate<C> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(BindState::Unbound {
                pending: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BindState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends callbacks while unbound; rejected with `AlreadyBound` afterwards.
    pub(crate) fn register<I>(&self, callbacks: I) -> Result<(), ProxyError>
    where
        I: IntoIterator<Item = Arc<dyn OnBind<C>>>,
    {
        match &mut *self.lock() {
            BindState::Unbound { pending } => {
                pending.extend(callbacks);
                Ok(())
            }
            BindState::Bound { .. } | BindState::Released => Err(ProxyError::AlreadyBound),
        }
    }

    /// Performs the single `Unbound -> Bound` transition and hands back the
    /// pending callbacks in registration order.
    pub(crate) fn bind(&self, client: Arc<C>) -> Result<BindCallbacks<C>, ProxyError> {
        let mut state = self.lock();
        match &mut *state {
            BindState::Unbound { pending } => {
                let callbacks = std::mem::take(pending);
                *state = BindState::Bound { client };
                Ok(callbacks)
            }
            BindState::Bound { .. } | BindState::Released => Err(ProxyError::AlreadyBound),
        }
    }

    pub(crate) fn client(&self) -> Option<Arc<C>> {
        match &*self.lock() {
            BindState::Bound { client } => Some(client.clone()),
            _ => None,
        }
    }

    pub(crate) fn is_bound(&self) -> bool {
        matches!(&*self.lock(), BindState::Bound { .. })
    }

    /// Gives up ownership of the bound client.
    pub(crate) fn release(&self) -> Result<Arc<C>, ProxyError> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, BindState::Released) {
            BindState::Bound { client } => Ok(client),
            previous => {
                *state = previous;
                Err(ProxyError::NotYetBound)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        match &*self.lock() {
            BindState::Unbound { pending } => pending.len(),
            _ => 0,
        }
    }
}
