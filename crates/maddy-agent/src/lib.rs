// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exchange orchestration and session management for Maddy.
//!
//! The [`Orchestrator`] is the central coordinator that:
//! - Extracts profile facts and records them in long-term memory
//! - Retrieves relevant past exchanges for the prompt
//! - Calls the completion provider under a timeout
//! - Falls back to text when an image request fails
//! - Updates the session window and schedules background persistence

pub mod orchestrator;
pub mod session;
pub mod shutdown;

pub use orchestrator::{DEFAULT_IMAGE_MIME, ExchangeOutcome, ImageInput, Orchestrator};
pub use session::{ExchangeState, SessionContext};
