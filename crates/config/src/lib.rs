// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

mod config;

pub use bip39::Mnemonic;
pub use config::*;
