// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! Agent assembly: one scan loop per task category plus the ambient
//! registration watch, tied to a single shutdown signal.

use std::sync::Arc;

use attestor_attestation::AttestationSigner;
use attestor_config::Config;
use attestor_ledger::InProcessLedger;
use attestor_task::{Credential, Project};
use attestor_watcher::{new_watcher, spawn_poller};
use tokio::{sync::watch, task::JoinHandle};

use crate::{decision::AutoApprover, proofs::ContentAddressedStore, scanner::TaskScanner};

/// A running agent. Dropping it does not stop the loops; call
/// [`Agent::shutdown`].
pub struct Agent {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Agent {
    /// Signal shutdown and wait for the scan loops to wind down. A cycle that
    /// is mid-submission completes first; its outcome is logged, not dropped.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Derive the operator key, initialize one scanner per category against the
/// deployment, and start polling.
pub async fn start_agent(deployment: InProcessLedger, config: &Config) -> anyhow::Result<Agent> {
    let signer = AttestationSigner::from_mnemonic(
        &config.agent.mnemonic.to_string(),
        config.agent.key_index,
    )?;
    let operator = signer.address();
    tracing::info!(%operator, "starting attestor agent");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ledger = Arc::new(deployment.clone());

    // Registration is managed by the staking collaborator; we only observe
    // it. Until it happens every submission bounces with a rejection.
    let mut registration = new_watcher(config.agent.poll_interval, {
        let deployment = deployment.clone();
        move || {
            let deployment = deployment.clone();
            async move { Ok(deployment.lock().is_operator(operator)) }
        }
    })
    .await?;
    if !*registration.borrow() {
        tracing::warn!(%operator, "operator is not registered, responses will be rejected");
    }
    let registration_handle = tokio::spawn({
        let mut shutdown = shutdown_rx.clone();
        async move {
            let mut registered = *registration.borrow();
            loop {
                tokio::select! {
                    changed = registration.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let now_registered = *registration.borrow();
                        if now_registered != registered {
                            registered = now_registered;
                            if registered {
                                tracing::info!(%operator, "operator registration confirmed");
                            } else {
                                tracing::warn!(%operator, "operator is no longer registered");
                            }
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        }
    });

    let credential_scanner = TaskScanner::<Credential, _>::initialize(
        ledger.clone(),
        signer.clone(),
        Arc::new(AutoApprover),
        Arc::new(ContentAddressedStore),
        config.agent.max_scan_window,
    )
    .await?;
    let project_scanner = TaskScanner::<Project, _>::initialize(
        ledger,
        signer,
        Arc::new(AutoApprover),
        Arc::new(ContentAddressedStore),
        config.agent.max_scan_window,
    )
    .await?;

    // Categories are scanned independently and concurrently; there is no
    // ordering between credential and project processing.
    let handles = vec![
        spawn_poller(
            "credential-tasks",
            config.agent.poll_interval,
            shutdown_rx.clone(),
            credential_scanner,
        ),
        spawn_poller(
            "project-tasks",
            config.agent.poll_interval,
            shutdown_rx,
            project_scanner,
        ),
        registration_handle,
    ];

    Ok(Agent {
        shutdown: shutdown_tx,
        handles,
    })
}
