// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Strongbox CLI

pub mod client;
pub mod config;
pub mod setup;

pub use self::client::ClientCommand;
pub use self::config::ConfigCommand;
pub use self::setup::SetupCommand;
