// SPDX-License-Identifier: MIT OR Apache-2.0
//! gantry-host
//!
//! Subprocess plumbing: [`Execution`] runs one engine invocation to
//! completion with a configurable capture policy, and [`FrameStream`]
//! multiplexes a child's stdout and stderr into tagged line frames for
//! real-time consumption.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod runner;
mod stream;

pub use runner::{Execution, Output};
pub use stream::{Frame, FrameStream, StreamSource};
