// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! The authoritative side of the verification protocol: a single-writer
//! [`Ledger`] holding one [`TaskBook`] per task category, the operator
//! registry, and the read-only result query surface, plus the async traits
//! ([`LedgerReader`], [`ResponseSink`]) the operator agent consumes and the
//! [`InProcessLedger`] deployment implementing them.
//!
//! The ledger assumes atomic, linearizable application of each operation;
//! ordering is provided by whoever drives it (one state transition per
//! submitted transaction).

mod book;
mod client;
mod error;
mod ledger;

pub use book::TaskBook;
pub use client::{InProcessLedger, LedgerReader, ResponseSink};
pub use error::LedgerError;
pub use ledger::{unix_now, Ledger, LedgerSettings};
