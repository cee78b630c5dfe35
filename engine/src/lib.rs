//! Activity engine for presence-lsp.
//!
//! Turns document lifecycle events and two inactivity timers into activity
//! payloads, rate-limited by a debounce gate before they reach the presence
//! service.

mod classifier;
mod gate;
mod machine;
pub mod template;
mod timer;

pub use classifier::Classifier;
pub use gate::Debouncer;
pub use machine::{Engine, EngineParts, Phase, Snapshot};
pub use timer::OneShotTimer;
