//! Reconciliation engine for the PyThra widget framework.
//!
//! A producer hands in a tree of [`Node`]s per render context; the
//! [`Reconciler`] diffs it against the context's previous [`Snapshot`] and
//! returns the ordered [`Patch`] list that brings the rendered surface in
//! line with the new tree, while keeping stateful widgets' state alive
//! across rebuilds.
mod config;
mod diff_engine;
mod errors;
mod html_generator;
mod identity;
mod lifecycle;
mod node;
mod scheduler;
mod snapshot;
mod types;

#[cfg(feature = "python")]
mod converters;
#[cfg(feature = "python")]
mod python;

pub use config::{MoveStrategy, ReconcilerConfig, ReplaceMode};
pub use errors::{BuildError, KeyError, ReconcilerError};
pub use html_generator::{generate_html_stub, html_escape};
pub use identity::{Identity, Key};
pub use node::{
    CSS_CLASS_PROP, CallbackId, Element, ElementKind, LAYOUT_OVERRIDE_PROP, Layout, Node, NodeKind, Props, State,
    StatefulNode, StatefulWidget, StatelessNode, StatelessWidget,
};
pub use scheduler::Scheduler;
pub use snapshot::{Record, Snapshot};
pub use types::{
    CallbackBinding, IdGenerator, JsInitializer, Patch, PatchAction, PropChange, PropDelta, REMOVED_MARKER,
    RebuildFailure, ReconciliationResult, SurfaceId,
};

use diff_engine::DiffEngine;
use lifecycle::Lifecycle;
use log::{debug, error, info};
use std::collections::HashMap;

pub const MAIN_CONTEXT: &str = "main";

/// Everything the engine remembers about one render context.
struct Context {
    snapshot: Snapshot,
    lifecycle: Lifecycle,
    mount: SurfaceId,
}

impl Context {
    fn new(mount: SurfaceId) -> Self {
        Context { snapshot: Snapshot::new(), lifecycle: Lifecycle::default(), mount }
    }
}

pub struct Reconciler {
    config: ReconcilerConfig,
    ids: IdGenerator,
    contexts: HashMap<String, Context>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Reconciler::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Reconciler::with_config(ReconcilerConfig::default())
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        info!(
            "PyThra Framework | Reconciler initialized (moves: {:?}, replace: {:?})",
            config.move_strategy, config.replace_mode
        );
        let mut contexts = HashMap::new();
        contexts.insert(MAIN_CONTEXT.to_string(), Context::new(SurfaceId::from(config.default_mount.as_str())));
        Reconciler { config, ids: IdGenerator::new(), contexts }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run one reconciliation cycle for `context`, rendering `root` under
    /// `mount`. `None` unmounts whatever the context rendered before.
    ///
    /// On error no patches are returned and the context keeps its previous
    /// snapshot and states. States mounted during the aborted cycle are
    /// disposed again and states displaced by a kind change are restored;
    /// rebuild hooks that already ran are not undone.
    pub fn reconcile(
        &mut self,
        context: &str,
        root: Option<Node>,
        mount: impl Into<SurfaceId>,
    ) -> Result<ReconciliationResult, ReconcilerError> {
        let mount = mount.into();
        let ctx = self
            .contexts
            .entry(context.to_string())
            .or_insert_with(|| Context::new(mount.clone()));

        debug!("Reconciler: cycle for context '{}' under '{}'", context, mount);
        let engine = DiffEngine::new(&self.config, &self.ids, &ctx.snapshot, &mut ctx.lifecycle);
        let (snapshot, result) = engine.reconcile(root, &mount).inspect_err(|err| {
            error!("Reconciler: cycle for context '{}' aborted: {}", context, err);
        })?;

        ctx.snapshot = snapshot;
        ctx.mount = mount;
        Ok(result)
    }

    /// Rebuild every context the scheduler marked dirty, once each, in the
    /// order they were requested. `build` produces the current root for a
    /// context.
    pub fn flush<F>(
        &mut self,
        scheduler: &Scheduler,
        mut build: F,
    ) -> Result<Vec<(String, ReconciliationResult)>, ReconcilerError>
    where
        F: FnMut(&str) -> Option<Node>,
    {
        let Some(batch) = scheduler.begin()? else {
            return Ok(Vec::new());
        };

        let mut results = Vec::with_capacity(batch.contexts.len());
        for (i, context) in batch.contexts.iter().enumerate() {
            let mount = self
                .contexts
                .get(context)
                .map(|ctx| ctx.mount.clone())
                .unwrap_or_else(|| SurfaceId::from(self.config.default_mount.as_str()));
            match self.reconcile(context, build(context), mount) {
                Ok(result) => results.push((context.clone(), result)),
                Err(err) => {
                    batch.requeue(&batch.contexts[i..]);
                    return Err(err);
                }
            }
        }
        Ok(results)
    }

    pub fn snapshot(&self, context: &str) -> Option<&Snapshot> {
        self.contexts.get(context).map(|ctx| &ctx.snapshot)
    }

    pub fn is_mounted(&self, context: &str, identity: &Identity) -> bool {
        self.contexts.get(context).is_some_and(|ctx| ctx.lifecycle.is_mounted(identity))
    }

    /// Number of live stateful states in `context`.
    pub fn mounted_states(&self, context: &str) -> usize {
        self.contexts.get(context).map_or(0, |ctx| ctx.lifecycle.len())
    }

    pub fn context_keys(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    /// Forget a context, disposing its live states. Returns the disposed identities.
    pub fn clear_context(&mut self, context: &str) -> Vec<Identity> {
        match self.contexts.remove(context) {
            Some(mut ctx) => {
                ctx.lifecycle.dispose_all();
                let disposed = ctx.lifecycle.take_disposed();
                info!("Reconciler: cleared context '{}' ({} states disposed)", context, disposed.len());
                disposed
            }
            None => Vec::new(),
        }
    }

    pub fn clear_all_contexts(&mut self) {
        for ctx in self.contexts.values_mut() {
            ctx.lifecycle.dispose_all();
        }
        self.contexts.clear();
        self.contexts.insert(
            MAIN_CONTEXT.to_string(),
            Context::new(SurfaceId::from(self.config.default_mount.as_str())),
        );
        info!("Reconciler: cleared all contexts");
    }
}
