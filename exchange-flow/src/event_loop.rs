//! Serialized event loop for one exchange flow.
//!
//! # Flow
//!
//! ```text
//! host / runtime ── Event ──► mpsc ──► loop task ── update ──► watch<Model>
//!                                          │
//!                                          ├── native Effect ──► NativeEffects (host)
//!                                          └── other Effect ───► EffectRuntime
//! ```
//!
//! The loop task is the only owner of the `Model`. Events are applied one at
//! a time in arrival order, so a reducer step never observes a half-applied
//! transition.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, trace, Instrument};
use uuid::Uuid;

use exchange_engine::{init, update, Effect, Event, Model};
use exchange_exec::{EffectRuntime, RuntimeConfig, RuntimeDeps};

use crate::error::{FlowError, FlowResult};

/// Effects the host performs: analytics, user actions, exit, error haptics.
pub type NativeEffects = UnboundedReceiver<Effect>;

/// Handle to a running exchange flow.
///
/// Dropping the handle disposes the flow.
pub struct ExchangeLoop {
    flow_id: Uuid,
    events: UnboundedSender<Event>,
    model: watch::Receiver<Model>,
    runtime: EffectRuntime,
    cancel: CancellationToken,
}

impl ExchangeLoop {
    /// Start a flow from `model` and run its initial effects.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(model: Model, deps: RuntimeDeps, config: RuntimeConfig) -> (Self, NativeEffects) {
        let flow_id = Uuid::now_v7();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (native_tx, native_rx) = mpsc::unbounded_channel();
        let (model_tx, model_rx) = watch::channel(model.clone());
        let runtime = EffectRuntime::new(deps, config, event_tx.clone());
        let cancel = CancellationToken::new();

        info!(
            %flow_id,
            mode = model.mode.as_str(),
            settings_only = model.settings_only,
            "Starting exchange flow"
        );

        let router = EffectRouter {
            runtime: runtime.clone(),
            native: native_tx,
        };
        let span = info_span!("exchange_flow", %flow_id);
        tokio::spawn(
            run(model, event_rx, model_tx, router, cancel.clone()).instrument(span),
        );

        let handle = Self {
            flow_id,
            events: event_tx,
            model: model_rx,
            runtime,
            cancel,
        };
        (handle, native_rx)
    }

    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    /// Enqueue `event` behind every event already waiting.
    pub fn dispatch(&self, event: Event) -> FlowResult<()> {
        if self.is_disposed() {
            return Err(FlowError::Disposed);
        }
        self.events.send(event).map_err(|_| FlowError::Disposed)
    }

    /// Snapshot of the current model.
    pub fn model(&self) -> Model {
        self.model.borrow().clone()
    }

    /// Observe every model the loop publishes.
    pub fn subscribe(&self) -> watch::Receiver<Model> {
        self.model.clone()
    }

    /// Wait until the published model satisfies `predicate`.
    ///
    /// Checks the current model first. Fails once the flow is disposed.
    pub async fn wait_for<F>(&self, mut predicate: F) -> FlowResult<Model>
    where
        F: FnMut(&Model) -> bool,
    {
        let mut model = self.model.clone();
        let matched = model
            .wait_for(|current| predicate(current))
            .await
            .map_err(|_| FlowError::Disposed)?;
        Ok(matched.clone())
    }

    /// Stop the loop and cancel every running effect.
    ///
    /// Events dispatched afterwards are rejected; results of effects that
    /// were still running are dropped.
    pub fn dispose(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!(flow_id = %self.flow_id, "Disposing exchange flow");
        self.cancel.cancel();
        self.runtime.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ExchangeLoop {
    fn drop(&mut self) {
        self.dispose();
    }
}

// =============================================================================
// Loop task
// =============================================================================

struct EffectRouter {
    runtime: EffectRuntime,
    native: UnboundedSender<Effect>,
}

impl EffectRouter {
    fn route(&self, effects: Vec<Effect>) {
        for effect in effects {
            if effect.is_native() {
                let name = effect.name();
                if self.native.send(effect).is_err() {
                    debug!(effect = name, "Host stopped listening, native effect dropped");
                }
            } else {
                self.runtime.dispatch(effect);
            }
        }
    }
}

async fn run(
    mut model: Model,
    mut events: UnboundedReceiver<Event>,
    published: watch::Sender<Model>,
    router: EffectRouter,
    cancel: CancellationToken,
) {
    let first = init(&model);
    if let Some(next) = first.model {
        model = next;
        published.send_replace(model.clone());
    }
    router.route(first.effects);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                let name = event.name();
                let next = update(&model, event);
                if next.model.is_none() && next.effects.is_empty() {
                    trace!(event = name, state = model.state.name(), "No transition");
                    continue;
                }
                if let Some(next_model) = next.model {
                    if next_model.state.name() != model.state.name() {
                        debug!(
                            event = name,
                            from = model.state.name(),
                            to = next_model.state.name(),
                            "State changed"
                        );
                    }
                    model = next_model;
                    published.send_replace(model.clone());
                }
                debug!(event = name, effects = next.effects.len(), "Event applied");
                router.route(next.effects);
            }
        }
    }

    router.runtime.dispose();
    info!(state = model.state.name(), "Exchange flow stopped");
}

// =============================================================================
// Tests
// =============================================================================
