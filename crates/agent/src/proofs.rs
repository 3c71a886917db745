// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! The proof-storage collaborator boundary.

use alloy_primitives::{hex, keccak256};
use async_trait::async_trait;

/// Stores opaque evidence bytes and hands back a stable reference.
///
/// A storage failure is fatal to that task's processing attempt: the task
/// stays marked processed and no response is submitted.
#[async_trait]
pub trait ProofStore: Send + Sync + 'static {
    async fn store(&self, evidence: &[u8]) -> anyhow::Result<String>;
}

/// Content-addressed stand-in for the real evidence store.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentAddressedStore;

#[async_trait]
impl ProofStore for ContentAddressedStore {
    async fn store(&self, evidence: &[u8]) -> anyhow::Result<String> {
        Ok(format!("ipfs://{}", hex::encode(keccak256(evidence))))
    }
}
