//! Domain logic for the LLMO writing assistant.
//!
//! This crate ties together prompt assembly, title parsing, session state,
//! and citation reconciliation into the action dispatcher that both front
//! ends drive (see [`assistant::Assistant::dispatch`]).

pub mod assistant;
pub mod citation;
pub mod prompt;
pub mod session;
pub mod titles;

pub use assistant::{Action, Assistant, GroundedAnswer};
pub use citation::{Reconciliation, reconcile, render_markdown};
pub use prompt::PromptBuilder;
pub use session::{OptionalField, SessionState};
