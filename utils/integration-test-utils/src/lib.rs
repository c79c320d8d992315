/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
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

//! Test doubles for the collaborators of `dtn-core`, shared by its integration tests.

mod callback;
mod channel;
mod dispatch;
mod harness;
mod storage;

pub use callback::RecordingCallback;
pub use channel::ScriptedChannel;
pub use dispatch::RecordingDispatch;
pub use harness::CoreHarness;
pub use storage::MemoryStorage;

use dtn_core::{Bundle, Eid};
use std::future::Future;
use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Upper bound for every `wait_*` helper.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

static TRACING: Once = Once::new();

/// Installs a test-writer `fmt` subscriber filtered by `RUST_LOG`, once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn eid(value: &str) -> Eid {
    value
        .parse()
        .unwrap_or_else(|err| panic!("invalid test eid {value:?}: {err}"))
}

pub fn bundle(source: &str, destination: &str, payload: &[u8]) -> Bundle {
    Bundle::new(eid(source), eid(destination), payload.to_vec())
}

/// Polls `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(timeout, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}

/// Like [`wait_until`] for conditions that have to be awaited.
pub async fn wait_until_async<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(timeout, async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}
