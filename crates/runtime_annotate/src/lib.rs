//! Drives annotation passes the way a content script is driven: a settle delay after load,
//! a debounce after document mutations, and a periodic safety net, all on virtual time.

pub mod scheduler;
pub mod session;
pub mod triggers;

pub use scheduler::{Fired, TimerHandle, TimerQueue};
pub use session::{MutationSource, PassRecord, Session};
pub use triggers::{Trigger, TriggerWiring};
