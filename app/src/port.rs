use crate::core::runtime::Handle;
use crate::core::time::{DateTime, Duration, Time};
use crate::core::{EntityId, EntityState, ServiceCall};

pub trait StateAccess {
    /// Last known state of the entity, `None` if the host does not know it
    fn state(&self, entity: &EntityId) -> Option<EntityState>;
}

pub trait ServiceCaller {
    fn call_service(&self, call: ServiceCall) -> anyhow::Result<()>;
}

/// Registrations deliver their trigger value back to the app that created them. Cancelling a handle guarantees
/// that no further delivery for it happens, also for deliveries that were already due.
pub trait Scheduler<T> {
    fn listen_state(&mut self, entity: &EntityId, trigger: T) -> Handle;

    fn run_daily(&mut self, at: Time, trigger: T) -> Handle;

    fn run_every(&mut self, first: DateTime, period: Duration, trigger: T) -> Handle;

    fn run_in(&mut self, delay: Duration, trigger: T) -> Handle;

    /// Unknown or already cancelled handles are ignored
    fn cancel(&mut self, handle: Handle);
}

pub trait Runtime<T>: StateAccess + ServiceCaller + Scheduler<T> {}

impl<T, R> Runtime<T> for R where R: StateAccess + ServiceCaller + Scheduler<T> {}
