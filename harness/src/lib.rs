//! Sequential script playback over an in-process message hub.
//!
//! This crate executes an ordered collection of scripts one at a time
//! against a remote evaluation service, waiting for each script's outcome
//! before dispatching the next, and terminating the hosting process when a
//! script fails or when a script invokes the well-known exit control. The
//! architecture separates:
//!
//! - **[`protocol`]**: the correlated call types (requests, outcomes,
//!   correlation ids, addresses). Pure data, fully testable in isolation.
//! - **[`hub`]**: the message-routed runtime boundary — collaborator traits
//!   for routing, service lookup and process termination, plus a minimal
//!   single-threaded dispatch loop that satisfies them.
//! - **[`player`]**: the playback core: a state machine holding at most one
//!   in-flight call and advancing through its queue on matching outcomes.
//! - **[`io`]**: filesystem glue (project discovery, settings).

pub mod hub;
pub mod io;
pub mod logging;
pub mod player;
pub mod protocol;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
