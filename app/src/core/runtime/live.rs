use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use infrastructure::EventListener;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::task::AbortOnDropHandle;

use crate::core::time::{DateTime, Duration, Time};
use crate::core::{EntityId, EntityState, ServiceCall, StateChange};
use crate::port::{Scheduler, ServiceCaller, StateAccess};
use crate::t;

use super::{App, Fired, Handle, Registry, Schedule};

/// Runtime backed by tokio timers. Timer tasks only post the handle that became due, the trigger is looked up
/// when the event is dispatched, so cancelled registrations are never delivered.
pub struct LiveRuntime<T> {
    states: Arc<dyn StateAccess + Send + Sync>,
    services: Arc<dyn ServiceCaller + Send + Sync>,
    registry: Registry<T>,
    timers: HashMap<Handle, AbortOnDropHandle<()>>,
    due_tx: mpsc::UnboundedSender<Handle>,
}

impl<T: Clone> LiveRuntime<T> {
    fn new(
        states: Arc<dyn StateAccess + Send + Sync>,
        services: Arc<dyn ServiceCaller + Send + Sync>,
        due_tx: mpsc::UnboundedSender<Handle>,
    ) -> Self {
        Self {
            states,
            services,
            registry: Registry::new(),
            timers: HashMap::new(),
            due_tx,
        }
    }

    fn start_timer<F>(&mut self, handle: Handle, task: F)
    where
        F: FnOnce(Handle, mpsc::UnboundedSender<Handle>) -> tokio::task::JoinHandle<()>,
    {
        let join_handle = task(handle, self.due_tx.clone());
        self.timers.insert(handle, AbortOnDropHandle::new(join_handle));
    }

    fn take_trigger(&mut self, handle: Handle) -> Option<T> {
        let trigger = self.registry.take_trigger(handle)?;
        if !self.registry.is_active(handle) {
            self.timers.remove(&handle);
        }
        Some(trigger)
    }
}

impl<T> StateAccess for LiveRuntime<T> {
    fn state(&self, entity: &EntityId) -> Option<EntityState> {
        self.states.state(entity)
    }
}

impl<T> ServiceCaller for LiveRuntime<T> {
    fn call_service(&self, call: ServiceCall) -> anyhow::Result<()> {
        self.services.call_service(call)
    }
}

impl<T: Clone> Scheduler<T> for LiveRuntime<T> {
    fn listen_state(&mut self, entity: &EntityId, trigger: T) -> Handle {
        self.registry.add(Schedule::State(entity.clone()), trigger)
    }

    fn run_daily(&mut self, at: Time, trigger: T) -> Handle {
        let handle = self.registry.add(Schedule::Daily(at), trigger);

        self.start_timer(handle, move |handle, tx| {
            tokio::spawn(async move {
                loop {
                    let next = match t!(now).next_occurrence_of(at) {
                        Ok(next) => next,
                        Err(e) => {
                            tracing::error!("Error scheduling daily timer {} at {}: {:?}", handle, at, e);
                            return;
                        }
                    };

                    tokio::time::sleep(Duration::until(&next).into()).await;

                    if tx.send(handle).is_err() {
                        return;
                    }
                }
            })
        });

        handle
    }

    fn run_every(&mut self, first: DateTime, period: Duration, trigger: T) -> Handle {
        let handle = self.registry.add(Schedule::Every { first, period }, trigger);

        let delay: std::time::Duration = Duration::until(&first).into();
        let start = tokio::time::Instant::now() + delay;
        let period: std::time::Duration = period.into();
        let period = period.max(std::time::Duration::from_secs(1));

        self.start_timer(handle, move |handle, tx| {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval_at(start, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    interval.tick().await;
                    if tx.send(handle).is_err() {
                        return;
                    }
                }
            })
        });

        handle
    }

    fn run_in(&mut self, delay: Duration, trigger: T) -> Handle {
        let handle = self.registry.add(Schedule::Once(delay), trigger);

        self.start_timer(handle, move |handle, tx| {
            tokio::spawn(async move {
                tokio::time::sleep(delay.into()).await;
                let _ = tx.send(handle);
            })
        });

        handle
    }

    fn cancel(&mut self, handle: Handle) {
        if self.registry.remove(handle) {
            tracing::trace!("Cancelled registration {}", handle);
        }
        self.timers.remove(&handle);
    }
}

/// Drives one app: initializes it and then delivers due timers and state changes strictly one at a time.
pub struct AppRunner<A: App> {
    app: A,
    runtime: LiveRuntime<A::Trigger>,
    due_rx: mpsc::UnboundedReceiver<Handle>,
    state_changes: EventListener<StateChange>,
}

impl<A: App> AppRunner<A> {
    pub fn new(
        app: A,
        states: Arc<dyn StateAccess + Send + Sync>,
        services: Arc<dyn ServiceCaller + Send + Sync>,
        state_changes: EventListener<StateChange>,
    ) -> Self {
        let (due_tx, due_rx) = mpsc::unbounded_channel();

        Self {
            app,
            runtime: LiveRuntime::new(states, services, due_tx),
            due_rx,
            state_changes,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let name = self.app.name();

        self.app
            .initialize(&mut self.runtime)
            .with_context(|| format!("Error initializing {}", name))?;

        tracing::info!("{} started with {} registrations", name, self.runtime.registry.len());

        loop {
            tokio::select! {
                Some(handle) = self.due_rx.recv() => self.dispatch(handle, None),
                change = self.state_changes.recv() => match change {
                    Some(change) => self.on_state_change(change),
                    None => anyhow::bail!("State changes for {} are no longer available", name),
                },
            }
        }
    }

    fn on_state_change(&mut self, change: StateChange) {
        for handle in self.runtime.registry.listeners_of(&change.entity) {
            //an earlier listener of the same change may have cancelled this one
            if self.runtime.registry.is_active(handle) {
                self.dispatch(handle, Some(change.clone()));
            }
        }
    }

    #[tracing::instrument(skip(self, change), fields(app = %self.app.name()))]
    fn dispatch(&mut self, handle: Handle, change: Option<StateChange>) {
        let Some(trigger) = self.runtime.take_trigger(handle) else {
            tracing::trace!("Dropping delivery for inactive registration {}", handle);
            return;
        };

        tracing::debug!("Delivering {:?}", trigger);

        let fired = Fired { handle, trigger, change };

        if let Err(e) = self.app.on_trigger(fired, &mut self.runtime) {
            tracing::error!("Error handling trigger of {}: {:?}", handle, e);
        }
    }
}
