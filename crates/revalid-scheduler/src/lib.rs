//! revalid Scheduler - the revalidation state machine
//!
//! Decides whether the rendered page is stale and when to re-fetch it:
//! - Navigation coordinator (veto and preemption during page transitions)
//! - Gating: tracking switch, navigation, in-flight flags, staleness, dedupe
//! - Hard refresh (discard client cache) and soft refresh (warm, then swap)
//! - On-mount policy with escalating CDN backoff
//!
//! The scheduler is a pure transition function: every input is an `Event`
//! (or a `RefreshRequest`) plus the current wall-clock time, and every output
//! is a list of `Effect`s for the host runtime to carry out.

pub mod effect;
pub mod navigation;
pub mod policy;
pub mod scheduler;
pub mod state;

pub use effect::*;
pub use navigation::*;
pub use policy::*;
pub use scheduler::*;
pub use state::*;
