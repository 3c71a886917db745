// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! Interval polling primitives shared by the operator agent.
//!
//! Two shapes live here: [`spawn_poller`] drives a stateful cycle on a fixed
//! period (one loop per task category, cycles never overlap), and
//! [`new_watcher`] periodically refreshes a value into a `tokio::watch`
//! channel for consumers that only care about the latest state.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use tokio::{
    select,
    sync::watch,
    task::JoinHandle,
    time::{self, sleep, MissedTickBehavior},
};

/// One polling cycle of a long-lived scan loop.
#[async_trait]
pub trait PollCycle: Send + 'static {
    /// Runs a single cycle. An error means the cycle's work should be retried
    /// wholesale on the next tick; it never stops the loop.
    async fn cycle(&mut self) -> anyhow::Result<()>;
}

/// Run `poller` once per `period` until `shutdown` flips to `true`.
///
/// Ticks that fire while a cycle is still running are skipped, so two cycles
/// of the same poller never execute in parallel. Shutdown is observed while
/// waiting for the next tick; a cycle that is already running (including an
/// in-flight submission inside it) always completes first, so its outcome is
/// never silently dropped.
pub fn spawn_poller<P: PollCycle>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut poller: P,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            select! {
                _ = ticker.tick() => {
                    if let Err(err) = poller.cycle().await {
                        tracing::warn!(poller = name, error = %err, "poll cycle failed, will retry next tick");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(poller = name, "poller stopped");
    })
}

/// Create a watcher that resolves `function` for an initial value and then
/// refreshes it on `interval`, publishing into the returned channel.
pub async fn new_watcher<T, F, Fut>(
    interval: Duration,
    function: F,
) -> anyhow::Result<watch::Receiver<T>>
where
    F: Fn() -> Fut + Send + 'static,
    T: Sync + Send + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send,
{
    let initial_value = function().await?;

    let (tx, rx) = watch::channel(initial_value);

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match function().await {
                Ok(value) => {
                    if tx.send(value).is_err() {
                        tracing::debug!("watcher channel closed, stopping watcher task");
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "watcher refresh failed");
                    // Back off a little before the next attempt.
                    sleep(interval.div_f32(2.0)).await;
                }
            }
        }
    });
    Ok(rx)
}
