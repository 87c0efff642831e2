// SPDX-License-Identifier: MIT OR Apache-2.0
//! gantry-core
//!
//! Argv construction for the engine CLI: the [`Command`] builder and the
//! value formatters shared by every subcommand surface.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod format;

pub use command::Command;
pub use format::{
    AddHost, PortMapping, Signal, ValidDuration, VolumeSpec, comma_joined_pairs, format_mapping,
};
