// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the workspace's test modules: well-known keys, fixed
//! addresses, and pre-seeded ledger deployments.

use std::sync::LazyLock;

use alloy_primitives::{address, Address};
use attestor_attestation::AttestationSigner;
use attestor_ledger::{Ledger, LedgerSettings};
use attestor_task::{CredentialOutcome, Position, ProjectOutcome, TaskId};

/// The standard test mnemonic. Account 0 is the registered operator.
pub const OPERATOR_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub static OPERATOR_SIGNER: LazyLock<AttestationSigner> = LazyLock::new(|| {
    AttestationSigner::from_mnemonic(OPERATOR_MNEMONIC, 0).expect("valid test mnemonic")
});

/// A perfectly good key that is simply not in the operator registry.
pub static UNREGISTERED_SIGNER: LazyLock<AttestationSigner> = LazyLock::new(|| {
    AttestationSigner::from_mnemonic(OPERATOR_MNEMONIC, 7).expect("valid test mnemonic")
});

pub const OWNER_ADDRESS: Address = address!("C0ffee254729296a45a3885639AC7E10F9d54979");
pub const REQUESTER_ADDRESS: Address = address!("999999cf1046e68e36E1aA2E0E07105eDDD1f08E");
pub const SUBJECT_ADDRESS: Address = address!("1234567890AbcdEF1234567890aBcdef12345678");
pub const CREDENTIAL_BOOK_ADDRESS: Address = address!("533661F0fb14d2E8B26223C86a610Dd7D2260892");
pub const PROJECT_BOOK_ADDRESS: Address = address!("2740f6fA9188cF53ffB6729DDD21575721dE92ce");

pub const EXPIRY_THRESHOLD: Position = 7200;
pub const CREDENTIAL_VALIDITY: u64 = 31_536_000;

pub fn ledger_settings() -> LedgerSettings {
    LedgerSettings {
        credential_book: CREDENTIAL_BOOK_ADDRESS,
        project_book: PROJECT_BOOK_ADDRESS,
        expiry_threshold: EXPIRY_THRESHOLD,
        credential_validity: CREDENTIAL_VALIDITY,
    }
}

/// A fresh deployment with the test operator registered and the test
/// requester authorized.
pub fn seeded_ledger() -> Ledger {
    let mut ledger = Ledger::new(OWNER_ADDRESS, ledger_settings());
    ledger
        .register_operator(OWNER_ADDRESS, OPERATOR_SIGNER.address())
        .expect("owner registers the operator");
    ledger
        .authorize_requester(OWNER_ADDRESS, REQUESTER_ADDRESS)
        .expect("owner authorizes the requester");
    ledger
}

/// Signature bytes for a credential response from the registered operator.
pub fn sign_credential_outcome(
    ledger: &Ledger,
    task_id: TaskId,
    subject: Address,
    outcome: &CredentialOutcome,
) -> Vec<u8> {
    OPERATOR_SIGNER
        .sign_response(task_id, subject, outcome, ledger.credential_book_address())
        .expect("signing with a local key cannot fail")
        .as_bytes()
        .to_vec()
}

/// Signature bytes for a project response from the registered operator.
pub fn sign_project_outcome(
    ledger: &Ledger,
    task_id: TaskId,
    subject: Address,
    outcome: &ProjectOutcome,
) -> Vec<u8> {
    OPERATOR_SIGNER
        .sign_response(task_id, subject, outcome, ledger.project_book_address())
        .expect("signing with a local key cannot fail")
        .as_bytes()
        .to_vec()
}

/// Poll `$cond` until it turns true, panicking after the timeout.
///
/// Keeps async tests free of fixed sleeps when waiting on a background
/// scanner to catch up.
#[macro_export]
macro_rules! wait_until {
    ($cond:expr) => {
        $crate::wait_until!($cond, std::time::Duration::from_secs(2))
    };
    ($cond:expr, $timeout:expr) => {
        if tokio::time::timeout($timeout, async {
            while !$cond {
                tokio::time::sleep(std::time::Duration::from_millis(25)).await;
            }
        })
        .await
        .is_err()
        {
            panic!(
                "condition still false after {:?}: {}",
                $timeout,
                stringify!($cond)
            );
        }
    };
}
