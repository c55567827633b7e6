//! Message types for the hub's correlated call protocol.
//!
//! A [`Call`] is either an invocation of a control or one of the two outcome
//! kinds (`Reply`, `Error`) produced for it. Outcomes carry the invocation's
//! [`CallId`] so the originator can match them against its outstanding
//! request; an outcome with an unknown id is stale and gets discarded by the
//! receiver.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation identifier tagging a request so its eventual outcome can be
/// matched back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(u64);

impl CallId {
    /// Allocate a fresh identifier from a process-wide monotonic counter.
    ///
    /// Ids are unique for the lifetime of the process, so an outcome can
    /// never collide with a request it does not belong to.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        CallId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of a component registered on the hub.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentAddress(String);

impl ComponentAddress {
    pub fn new(name: impl Into<String>) -> Self {
        ComponentAddress(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address of a named control on this component.
    pub fn control(&self, control: impl Into<String>) -> ControlAddress {
        ControlAddress {
            component: self.clone(),
            control: control.into(),
        }
    }
}

impl fmt::Display for ComponentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// Address of a single control on a component, e.g. `/evaluator.eval`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlAddress {
    component: ComponentAddress,
    control: String,
}

impl ControlAddress {
    pub fn new(component: ComponentAddress, control: impl Into<String>) -> Self {
        ControlAddress {
            component,
            control: control.into(),
        }
    }

    pub fn component(&self) -> &ComponentAddress {
        &self.component
    }

    pub fn control(&self) -> &str {
        &self.control
    }
}

impl fmt::Display for ControlAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.control)
    }
}

/// A packet routed between controls.
#[derive(Debug)]
pub struct Call {
    pub id: CallId,
    pub to: ControlAddress,
    pub from: ControlAddress,
    pub body: CallBody,
}

/// The three packet kinds: a request, or one of its two outcomes.
///
/// Arguments are opaque text payloads; the harness never interprets them.
#[derive(Debug)]
pub enum CallBody {
    /// Request carrying argument payloads for the target control.
    Invoke(Vec<String>),
    /// Success outcome carrying the invoked control's results.
    Reply(Vec<String>),
    /// Failure outcome.
    Error(CallError),
}

impl Call {
    /// Build a request with a freshly assigned correlation identifier.
    pub fn invoke(to: ControlAddress, from: ControlAddress, args: Vec<String>) -> Self {
        Call {
            id: CallId::next(),
            to,
            from,
            body: CallBody::Invoke(args),
        }
    }

    /// Build the success outcome for `invoke`, addressed back to its origin.
    pub fn reply(invoke: &Call, args: Vec<String>) -> Self {
        Call {
            id: invoke.id,
            to: invoke.from.clone(),
            from: invoke.to.clone(),
            body: CallBody::Reply(args),
        }
    }

    /// Build the failure outcome for `invoke`, addressed back to its origin.
    pub fn error(invoke: &Call, error: CallError) -> Self {
        Call {
            id: invoke.id,
            to: invoke.from.clone(),
            from: invoke.to.clone(),
            body: CallBody::Error(error),
        }
    }
}

/// Error payload carried by a failure outcome.
///
/// `message` is the surface form shown in logs; `cause` optionally preserves
/// the underlying error chain for full diagnostic detail.
#[derive(Debug)]
pub struct CallError {
    message: String,
    cause: Option<anyhow::Error>,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        CallError {
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap a lower-level error, keeping it available for diagnostics.
    pub fn from_cause(cause: anyhow::Error) -> Self {
        CallError {
            message: cause.to_string(),
            cause: Some(cause),
        }
    }

    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn call_ids_are_unique() {
        let a = CallId::next();
        let b = CallId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn reply_keeps_id_and_swaps_addresses() {
        let to = ComponentAddress::new("evaluator").control("eval");
        let from = ComponentAddress::new("player").control("script-control");
        let invoke = Call::invoke(to.clone(), from.clone(), vec!["script".into()]);

        let reply = Call::reply(&invoke, Vec::new());
        assert_eq!(reply.id, invoke.id);
        assert_eq!(reply.to, from);
        assert_eq!(reply.from, to);
        assert!(matches!(reply.body, CallBody::Reply(ref args) if args.is_empty()));
    }

    #[test]
    fn error_outcome_preserves_wrapped_cause() {
        let cause = anyhow!("division by zero").context("line 3");
        let error = CallError::from_cause(cause);
        assert_eq!(error.to_string(), "line 3");
        let chain = format!("{:?}", error.cause().expect("cause"));
        assert!(chain.contains("division by zero"));
    }

    #[test]
    fn addresses_render_with_component_and_control() {
        let addr = ComponentAddress::new("player").control("system-exit");
        assert_eq!(addr.to_string(), "/player.system-exit");
        assert_eq!(addr.component().as_str(), "player");
        assert_eq!(addr.control(), "system-exit");
    }
}
