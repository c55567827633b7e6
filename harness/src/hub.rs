//! Minimal in-process message hub hosting addressable components.
//!
//! The hub owns a single [`std::sync::mpsc`] queue and delivers packets to
//! registered [`Root`]s one at a time, so no two deliveries to the same
//! component ever overlap. Components never block waiting for an outcome:
//! sends through [`PacketRouter`] are fire-and-forget and land on a later
//! turn of the loop.
//!
//! The collaborator contracts consumed by components ([`PacketRouter`],
//! [`ServiceDirectory`], [`Lifecycle`]) are traits so tests can substitute
//! recording stubs for the hub's own implementations.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};

use anyhow::{Result, anyhow};
use thiserror::Error;
use tracing::debug;

use crate::protocol::{Call, ComponentAddress, ControlAddress};

/// Outbound transport handed to components during a delivery.
///
/// Sends are fire-and-forget: `route` returns immediately and the packet is
/// delivered on a later turn of the hub loop (or dropped if undeliverable).
pub trait PacketRouter {
    fn route(&self, call: Call);
}

/// Resolves a logical service role to the component currently providing it.
///
/// Resolution is performed lazily, at the moment it is needed, because a
/// provider may register or change between lookups.
pub trait ServiceDirectory {
    fn locate(&self, role: &str) -> Result<ComponentAddress, ServiceUnavailable>;
}

/// No component currently advertises the requested role.
#[derive(Debug, Error)]
#[error("no component provides service '{role}'")]
pub struct ServiceUnavailable {
    pub role: String,
}

/// Process termination capability.
///
/// `terminate` must be idempotent and must not block; callers do not rely on
/// a return value or on shutdown having completed when it returns.
pub trait Lifecycle {
    fn terminate(&self);
}

/// A component hosted on the hub.
pub trait Root {
    /// Service roles this component advertises, resolvable by any other
    /// component through [`ServiceDirectory`].
    fn services(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called exactly once when the hub starts, before any packet is
    /// delivered. The component may already send through `ctx`.
    fn activate(&mut self, ctx: &mut RootContext<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Handle one inbound packet addressed to this component.
    ///
    /// An error return is a programming-contract violation and propagates
    /// out of [`Hub::run`] uncaught.
    fn call(&mut self, call: Call, ctx: &mut RootContext<'_>) -> Result<()>;
}

/// Collaborators available to a component while it is being activated or is
/// handling a packet.
pub struct RootContext<'a> {
    address: &'a ComponentAddress,
    router: &'a dyn PacketRouter,
    services: &'a dyn ServiceDirectory,
    lifecycle: &'a dyn Lifecycle,
}

impl<'a> RootContext<'a> {
    pub fn new(
        address: &'a ComponentAddress,
        router: &'a dyn PacketRouter,
        services: &'a dyn ServiceDirectory,
        lifecycle: &'a dyn Lifecycle,
    ) -> Self {
        RootContext {
            address,
            router,
            services,
            lifecycle,
        }
    }

    /// This component's own address on the hub.
    pub fn address(&self) -> &ComponentAddress {
        self.address
    }

    /// Address of one of this component's own controls, used as the origin
    /// of outbound requests.
    pub fn control_address(&self, control: &str) -> ControlAddress {
        self.address.control(control)
    }

    pub fn route(&self, call: Call) {
        self.router.route(call);
    }

    pub fn locate(&self, role: &str) -> Result<ComponentAddress, ServiceUnavailable> {
        self.services.locate(role)
    }

    pub fn terminate(&self) {
        self.lifecycle.terminate();
    }
}

/// Role-to-provider map built from the advertised services of registered
/// components.
#[derive(Debug, Default)]
pub struct Services {
    roles: HashMap<String, ComponentAddress>,
}

impl Services {
    pub fn register(&mut self, role: impl Into<String>, provider: ComponentAddress) {
        self.roles.insert(role.into(), provider);
    }
}

impl ServiceDirectory for Services {
    fn locate(&self, role: &str) -> Result<ComponentAddress, ServiceUnavailable> {
        self.roles
            .get(role)
            .cloned()
            .ok_or_else(|| ServiceUnavailable {
                role: role.to_string(),
            })
    }
}

enum HubMessage {
    Packet(Call),
    Shutdown,
}

/// Sender half of the hub queue, handed to components as their router.
#[derive(Clone)]
struct QueueRouter {
    tx: Sender<HubMessage>,
}

impl PacketRouter for QueueRouter {
    fn route(&self, call: Call) {
        // Send failure means the hub loop is gone; the packet is undeliverable.
        let _ = self.tx.send(HubMessage::Packet(call));
    }
}

/// The hub's own termination handle: stops the dispatch loop.
///
/// Safe to invoke any number of times from any component; only the first
/// invocation enqueues the shutdown message.
#[derive(Clone)]
pub struct HubShutdown {
    fired: Arc<AtomicBool>,
    tx: Sender<HubMessage>,
}

impl Lifecycle for HubShutdown {
    fn terminate(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(HubMessage::Shutdown);
        }
    }
}

/// Registers components and checks addresses before the hub starts.
#[derive(Default)]
pub struct HubBuilder {
    roots: Vec<(ComponentAddress, Box<dyn Root>)>,
}

impl HubBuilder {
    /// Register `root` under `name`. Registration order is activation order.
    pub fn root(mut self, name: &str, root: impl Root + 'static) -> Self {
        self.roots.push((ComponentAddress::new(name), Box::new(root)));
        self
    }

    pub fn build(self) -> Result<Hub> {
        for (i, (address, _)) in self.roots.iter().enumerate() {
            if self.roots[..i].iter().any(|(other, _)| other == address) {
                return Err(anyhow!("duplicate component address {address}"));
            }
        }
        let mut services = Services::default();
        for (address, root) in &self.roots {
            for role in root.services() {
                services.register(role, address.clone());
            }
        }
        let (tx, rx) = channel();
        Ok(Hub {
            roots: self.roots,
            services,
            router: QueueRouter { tx: tx.clone() },
            shutdown: HubShutdown {
                fired: Arc::new(AtomicBool::new(false)),
                tx,
            },
            rx,
        })
    }
}

/// Single-threaded dispatch loop over the registered components.
pub struct Hub {
    roots: Vec<(ComponentAddress, Box<dyn Root>)>,
    services: Services,
    router: QueueRouter,
    shutdown: HubShutdown,
    rx: Receiver<HubMessage>,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").finish_non_exhaustive()
    }
}

impl Hub {
    pub fn builder() -> HubBuilder {
        HubBuilder::default()
    }

    /// Activate every component, then deliver packets one at a time until a
    /// component triggers termination.
    ///
    /// An empty queue parks the loop in `recv`; the process stays alive
    /// until something invokes the termination capability (typically the
    /// well-known exit control). A component error propagates immediately.
    pub fn run(mut self) -> Result<()> {
        for (address, root) in &mut self.roots {
            let mut ctx =
                RootContext::new(address, &self.router, &self.services, &self.shutdown);
            root.activate(&mut ctx)?;
        }
        loop {
            match self.rx.recv() {
                Ok(HubMessage::Packet(call)) => self.deliver(call)?,
                Ok(HubMessage::Shutdown) | Err(_) => return Ok(()),
            }
        }
    }

    fn deliver(&mut self, call: Call) -> Result<()> {
        let Some((address, root)) = self
            .roots
            .iter_mut()
            .find(|(address, _)| address == call.to.component())
        else {
            // Best-effort transport: packets to unknown components are dropped.
            debug!(to = %call.to, id = %call.id, "dropping undeliverable packet");
            return Ok(());
        };
        let mut ctx = RootContext::new(address, &self.router, &self.services, &self.shutdown);
        root.call(call, &mut ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_component_address_is_a_build_error() {
        struct Quiet;
        impl Root for Quiet {
            fn call(&mut self, _call: Call, _ctx: &mut RootContext<'_>) -> Result<()> {
                Ok(())
            }
        }

        let err = Hub::builder()
            .root("player", Quiet)
            .root("player", Quiet)
            .build()
            .expect_err("duplicate address must be rejected");
        assert!(err.to_string().contains("duplicate component address"));
    }

    #[test]
    fn shutdown_handle_is_idempotent() {
        let (tx, rx) = channel();
        let shutdown = HubShutdown {
            fired: Arc::new(AtomicBool::new(false)),
            tx,
        };

        shutdown.terminate();
        shutdown.terminate();
        shutdown.terminate();

        assert!(matches!(rx.try_recv(), Ok(HubMessage::Shutdown)));
        assert!(rx.try_recv().is_err(), "only the first terminate enqueues");
    }

    #[test]
    fn services_resolve_registered_roles_only() {
        let mut services = Services::default();
        services.register("script-eval", ComponentAddress::new("evaluator"));

        let provider = services.locate("script-eval").expect("registered role");
        assert_eq!(provider.as_str(), "evaluator");

        let err = services.locate("system-exit").expect_err("unregistered");
        assert_eq!(err.role, "system-exit");
    }
}
