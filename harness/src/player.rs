//! Sequential script playback: the player component and its controls.
//!
//! The player owns an ordered queue of script texts and submits them one at
//! a time to whichever component currently provides the [`SCRIPT_EVAL_SERVICE`]
//! role. At most one call is ever outstanding; the queue only advances when
//! the outcome correlated with that call arrives. That single invariant is
//! what gives playback strictly sequential semantics even though the
//! underlying transport is asynchronous.
//!
//! A failure outcome aborts the remaining sequence and terminates the
//! process. A call that never receives an outcome parks the player in its
//! awaiting state forever: there is no timeout (known limitation).

use std::collections::VecDeque;

use anyhow::{Result, bail};
use tracing::{debug, error, info};

use crate::hub::{Root, RootContext};
use crate::protocol::{Call, CallBody, CallId, ComponentAddress, ControlAddress};

/// Role resolved before each dispatch to find the evaluator component.
pub const SCRIPT_EVAL_SERVICE: &str = "script-eval";

/// Control on the evaluator component that accepts script text.
pub const EVAL_CONTROL: &str = "eval";

/// Well-known exit operation: both the advertised service role and the
/// control name. Invoking it terminates the process.
pub const SYSTEM_EXIT: &str = "system-exit";

const SCRIPT_CONTROL: &str = "_script-control";

/// Component that plays an ordered collection of scripts to completion.
///
/// Advertises the [`SYSTEM_EXIT`] role so scripts (or anything else on the
/// hub) can end the process; playback itself starts on activation and is
/// driven entirely by the evaluator's outcome stream from then on.
pub struct ScriptPlayer {
    control: ScriptControl,
}

impl ScriptPlayer {
    /// An empty collection is valid: the player activates, finds nothing to
    /// dispatch and simply stays quiet.
    pub fn new(scripts: Vec<String>) -> Self {
        ScriptPlayer {
            control: ScriptControl::new(scripts),
        }
    }
}

impl Root for ScriptPlayer {
    fn services(&self) -> Vec<String> {
        vec![SYSTEM_EXIT.to_string()]
    }

    fn activate(&mut self, ctx: &mut RootContext<'_>) -> Result<()> {
        self.control.advance(ctx);
        Ok(())
    }

    fn call(&mut self, call: Call, ctx: &mut RootContext<'_>) -> Result<()> {
        match call.to.control() {
            SCRIPT_CONTROL => self.control.handle(call, ctx),
            SYSTEM_EXIT => exit_control(call, ctx),
            other => bail!("no control '{other}' on component {}", ctx.address()),
        }
    }
}

/// Terminates the process on any invocation, arguments ignored.
///
/// The empty acknowledgment is routed before termination is triggered, so
/// the caller gets its reply without waiting for shutdown to complete.
/// Idempotency under repeated invocation is the [`Lifecycle`] impl's
/// responsibility.
///
/// [`Lifecycle`]: crate::hub::Lifecycle
fn exit_control(call: Call, ctx: &mut RootContext<'_>) -> Result<()> {
    match call.body {
        CallBody::Invoke(_) => {
            ctx.route(Call::reply(&call, Vec::new()));
            ctx.terminate();
        }
        CallBody::Reply(_) | CallBody::Error(_) => {
            debug!(id = %call.id, "discarding outcome addressed to exit control");
        }
    }
    Ok(())
}

/// The single in-flight evaluator call.
#[derive(Debug)]
struct PendingCall {
    id: CallId,
    target: ControlAddress,
}

/// The playback state machine.
///
/// `pending` holds the state: `None` is idle (queue possibly non-empty),
/// `Some` is awaiting the outcome for exactly one dispatched call. The
/// terminal state is reached by triggering termination, after which the hub
/// stops delivering.
struct ScriptControl {
    queue: VecDeque<String>,
    pending: Option<PendingCall>,
    eval_address: Option<ControlAddress>,
}

impl ScriptControl {
    fn new(scripts: Vec<String>) -> Self {
        ScriptControl {
            queue: scripts.into(),
            pending: None,
            eval_address: None,
        }
    }

    /// Dispatch the front script, or go quiet once the queue has drained.
    ///
    /// Draining does not force an exit; the hub keeps running until
    /// something invokes the exit control.
    fn advance(&mut self, ctx: &mut RootContext<'_>) {
        match self.queue.pop_front() {
            Some(script) => self.dispatch(script, ctx),
            None => info!("script sequence complete"),
        }
    }

    fn dispatch(&mut self, script: String, ctx: &mut RootContext<'_>) {
        // Re-resolve on every dispatch: the evaluator may have moved or may
        // not have been registered yet when the previous script ran.
        match ctx.locate(SCRIPT_EVAL_SERVICE) {
            Ok(provider) => self.eval_address = Some(provider.control(EVAL_CONTROL)),
            Err(err) => error!(%err, "script evaluator lookup failed"),
        }
        // Last-known address on a lookup gap; a guess from the role name when
        // no lookup has ever succeeded. The send may be undeliverable, which
        // leaves this call pending forever rather than crashing the sequence.
        let target = self.eval_address.clone().unwrap_or_else(|| {
            ComponentAddress::new(SCRIPT_EVAL_SERVICE).control(EVAL_CONTROL)
        });
        let call = Call::invoke(
            target.clone(),
            ctx.control_address(SCRIPT_CONTROL),
            vec![script],
        );
        debug!(id = %call.id, %target, "dispatching script");
        self.pending = Some(PendingCall {
            id: call.id,
            target,
        });
        ctx.route(call);
    }

    /// Correlate an inbound outcome against the pending call.
    ///
    /// Stale outcomes (wrong id, or nothing pending) are discarded without a
    /// state change. An inbound invoke is a misuse of this control by the
    /// surrounding runtime and propagates as an error.
    fn handle(&mut self, call: Call, ctx: &mut RootContext<'_>) -> Result<()> {
        match call.body {
            CallBody::Reply(_) => {
                self.on_reply(call, ctx);
                Ok(())
            }
            CallBody::Error(_) => {
                self.on_error(call, ctx);
                Ok(())
            }
            CallBody::Invoke(_) => {
                bail!("script control accepts outcomes only (invoke from {})", call.from)
            }
        }
    }

    fn on_reply(&mut self, call: Call, ctx: &mut RootContext<'_>) {
        if !self.matches(call.id) {
            debug!(id = %call.id, "discarding stale reply");
            return;
        }
        self.pending = None;
        self.advance(ctx);
    }

    fn on_error(&mut self, call: Call, ctx: &mut RootContext<'_>) {
        if !self.matches(call.id) {
            debug!(id = %call.id, "discarding stale error");
            return;
        }
        let pending = self.pending.take();
        if let (CallBody::Error(err), Some(pending)) = (&call.body, pending) {
            match err.cause() {
                Some(cause) => {
                    error!(target_addr = %pending.target, error = ?cause, "script evaluation failed");
                }
                None => {
                    error!(target_addr = %pending.target, error = %err, "script evaluation failed");
                }
            }
        }
        // One failed script aborts the whole remaining sequence.
        ctx.terminate();
    }

    fn matches(&self, id: CallId) -> bool {
        self.pending.as_ref().is_some_and(|pending| pending.id == id)
    }
}
