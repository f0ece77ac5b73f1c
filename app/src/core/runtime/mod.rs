#[cfg(test)]
mod fake;
mod live;
mod registry;

use std::fmt::Debug;

use crate::core::StateChange;
use crate::port::Runtime;

#[cfg(test)]
pub use fake::FakeRuntime;
pub use live::{AppRunner, LiveRuntime};
pub use registry::{Registry, Schedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("#{_0}")]
pub struct Handle(u64);

#[derive(Debug, Clone)]
pub struct Fired<T> {
    pub handle: Handle,
    pub trigger: T,
    /// Set for state listeners only
    pub change: Option<StateChange>,
}

pub trait App {
    type Trigger: Clone + Debug + Send + 'static;

    fn name(&self) -> String;

    fn initialize(&mut self, rt: &mut impl Runtime<Self::Trigger>) -> anyhow::Result<()>;

    fn on_trigger(&mut self, fired: Fired<Self::Trigger>, rt: &mut impl Runtime<Self::Trigger>) -> anyhow::Result<()>;
}
