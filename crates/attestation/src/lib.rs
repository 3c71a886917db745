// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! Canonical response messages and the operator signature scheme.
//!
//! A response is signed over a deterministic, order-preserving packed encoding
//! of `(task id, subject, outcome fields, verifying book address)`. Scoping the
//! message to the verifying address pins a signature to one ledger deployment,
//! so a valid response cannot be replayed against another instance exposing the
//! same interface. Signing goes through the standard personal-message prefix,
//! which keeps wallets from being tricked into signing these bytes for an
//! unrelated purpose.

use alloy_primitives::{Address, Signature, SignatureError};
use alloy_signer::SignerSync;
use alloy_signer_local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use alloy_sol_types::SolValue;
use attestor_task::{CredentialOutcome, ProjectOutcome, TaskId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttestationError {
    /// The submitted bytes do not parse as a 64/65-byte signature.
    #[error("malformed signature: {0}")]
    MalformedSignature(#[source] SignatureError),
    #[error("signature recovery failed: {0}")]
    RecoveryFailed(#[source] SignatureError),
    #[error("signing failed: {0}")]
    SigningFailed(#[from] alloy_signer::Error),
}

/// An outcome payload that can be canonically encoded for signing.
pub trait Attestable {
    /// Deterministic byte encoding of the response. Field order is fixed and
    /// the verifying book address is always the final component.
    fn signing_message(&self, task_id: TaskId, subject: Address, verifier: Address) -> Vec<u8>;
}

impl Attestable for CredentialOutcome {
    fn signing_message(&self, task_id: TaskId, subject: Address, verifier: Address) -> Vec<u8> {
        (
            task_id,
            subject,
            [self.level.as_u8()],
            self.score,
            self.credits,
            self.proof_uri.as_str(),
            verifier,
        )
            .abi_encode_packed()
    }
}

impl Attestable for ProjectOutcome {
    fn signing_message(&self, task_id: TaskId, subject: Address, verifier: Address) -> Vec<u8> {
        (
            task_id,
            subject,
            self.approved,
            self.score,
            self.credits,
            self.proof_uri.as_str(),
            verifier,
        )
            .abi_encode_packed()
    }
}

/// A response signer bound to one operator key.
#[derive(Clone, Debug)]
pub struct AttestationSigner {
    wallet: PrivateKeySigner,
}

impl AttestationSigner {
    pub fn new(wallet: PrivateKeySigner) -> Self {
        Self { wallet }
    }

    /// Derive the operator key from a BIP-39 mnemonic at the given account
    /// index.
    pub fn from_mnemonic(phrase: &str, index: u32) -> Result<Self, anyhow::Error> {
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .index(index)?
            .build()?;
        tracing::debug!(address = %wallet.address(), index, "derived operator key");
        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Sign the canonical message for a response through the personal-message
    /// prefix.
    pub fn sign_response<O: Attestable>(
        &self,
        task_id: TaskId,
        subject: Address,
        outcome: &O,
        verifier: Address,
    ) -> Result<Signature, AttestationError> {
        let message = outcome.signing_message(task_id, subject, verifier);
        Ok(self.wallet.sign_message_sync(&message)?)
    }
}

/// Recompute the canonical message and recover the signer of `signature`.
///
/// Malformed input surfaces as [`AttestationError::MalformedSignature`] rather
/// than an unrecoverable fault; the caller compares the recovered address to
/// the claimed signer identity.
pub fn recover_response_signer<O: Attestable>(
    task_id: TaskId,
    subject: Address,
    outcome: &O,
    verifier: Address,
    signature: &[u8],
) -> Result<Address, AttestationError> {
    let signature = Signature::try_from(signature).map_err(AttestationError::MalformedSignature)?;
    let message = outcome.signing_message(task_id, subject, verifier);
    signature
        .recover_address_from_msg(message)
        .map_err(AttestationError::RecoveryFailed)
}
