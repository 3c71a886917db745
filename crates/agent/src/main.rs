// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

use attestor_agent::{agent, cli, metrics};
use attestor_attestation::AttestationSigner;
use attestor_ledger::{InProcessLedger, Ledger, LedgerSettings};
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = cli::get_config()?;

    // Single-process deployment: the operator key owns the ledger instance,
    // registers itself, and may request work. The protocol does not forbid
    // the same key requesting and answering a task.
    let signer = AttestationSigner::from_mnemonic(
        &config.agent.mnemonic.to_string(),
        config.agent.key_index,
    )?;
    let operator = signer.address();
    let mut ledger = Ledger::new(
        operator,
        LedgerSettings {
            credential_book: operator.create(0),
            project_book: operator.create(1),
            expiry_threshold: config.ledger.expiry_threshold,
            credential_validity: config.ledger.credential_validity,
        },
    );
    ledger.register_operator(operator, operator)?;
    ledger.authorize_requester(operator, operator)?;
    let deployment = InProcessLedger::new(ledger);

    let agent = agent::start_agent(deployment, &config).await?;
    tracing::info!("Attestor agent started.");

    tokio::spawn(metrics::run_server(config.metrics.port));
    tracing::info!("Metrics port opened");

    // Have tokio wait for SIGTERM or SIGINT.
    let mut signal_sigint = signal(SignalKind::interrupt())?;
    let mut signal_sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = signal_sigint.recv() => tracing::debug!("Received SIGINT."),
        _ = signal_sigterm.recv() => tracing::debug!("Received SIGTERM."),
    }

    tracing::info!("Shutting down...");
    agent.shutdown().await;
    tracing::debug!("Goodbye!");
    Ok(())
}
