//! Test-only collaborator stubs.
//!
//! Everything the player needs from its environment is a trait, so tests
//! drive playback with recorders instead of a live hub, and hub-level tests
//! stand in a scripted evaluator for the real remote service.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::Result;

use crate::hub::{Lifecycle, PacketRouter, Root, RootContext};
use crate::player::{SCRIPT_EVAL_SERVICE, SYSTEM_EXIT};
use crate::protocol::{Call, CallBody, CallError};

/// Router that records routed packets instead of delivering them.
#[derive(Default)]
pub struct RecordingRouter {
    calls: RefCell<Vec<Call>>,
}

impl RecordingRouter {
    /// Drain everything routed since the last call.
    pub fn take(&self) -> Vec<Call> {
        self.calls.take()
    }
}

impl PacketRouter for RecordingRouter {
    fn route(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

/// Termination capability that counts invocations instead of exiting.
#[derive(Default)]
pub struct RecordingLifecycle {
    count: Cell<usize>,
}

impl RecordingLifecycle {
    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl Lifecycle for RecordingLifecycle {
    fn terminate(&self) {
        self.count.set(self.count.get() + 1);
    }
}

/// What the scripted evaluator does with the next script it receives.
pub enum ScriptedOutcome {
    /// Reply with an empty success result.
    Succeed,
    /// Reply with a failure outcome carrying this message.
    Fail(String),
    /// Reply with success, then invoke the well-known exit control — the way
    /// a real playback sequence ends the process.
    SucceedThenExit,
}

/// Evaluator component that advertises [`SCRIPT_EVAL_SERVICE`], records the
/// script texts it receives and answers each with the next scripted outcome.
///
/// Scripts beyond the scripted list get an empty success reply.
pub struct ScriptedEvaluator {
    outcomes: VecDeque<ScriptedOutcome>,
    received: Rc<RefCell<Vec<String>>>,
}

impl ScriptedEvaluator {
    pub fn new(outcomes: Vec<ScriptedOutcome>) -> Self {
        ScriptedEvaluator {
            outcomes: outcomes.into(),
            received: Rc::default(),
        }
    }

    /// Shared handle onto the received-script log, valid after the hub has
    /// consumed the evaluator itself.
    pub fn received(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.received)
    }
}

impl Root for ScriptedEvaluator {
    fn services(&self) -> Vec<String> {
        vec![SCRIPT_EVAL_SERVICE.to_string()]
    }

    fn call(&mut self, call: Call, ctx: &mut RootContext<'_>) -> Result<()> {
        let CallBody::Invoke(args) = &call.body else {
            // Acks for exit invocations land here; nothing to do with them.
            return Ok(());
        };
        self.received
            .borrow_mut()
            .push(args.first().cloned().unwrap_or_default());

        match self.outcomes.pop_front().unwrap_or(ScriptedOutcome::Succeed) {
            ScriptedOutcome::Succeed => ctx.route(Call::reply(&call, Vec::new())),
            ScriptedOutcome::Fail(message) => {
                ctx.route(Call::error(&call, CallError::new(message)));
            }
            ScriptedOutcome::SucceedThenExit => {
                ctx.route(Call::reply(&call, Vec::new()));
                let exit = ctx.locate(SYSTEM_EXIT)?;
                ctx.route(Call::invoke(
                    exit.control(SYSTEM_EXIT),
                    ctx.control_address("eval"),
                    Vec::new(),
                ));
            }
        }
        Ok(())
    }
}
