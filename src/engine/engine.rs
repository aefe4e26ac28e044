//! The single-threaded engine event loop.
//!
//! Every mutation of service state flows through one mpsc queue and is
//! handled in arrival order by [`SettingsEngine::run`]. Request-shaped
//! events answer through their oneshot sender; fire-and-forget events
//! drive the dispatcher and reconciler directly.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::EngineEvent;
use super::Resolver;
use super::ServiceContext;
use super::WriteRequest;
use crate::dispatch::ChangeEvent;
use crate::dispatch::ExcludeList;
use crate::dispatch::NotificationDispatcher;
use crate::dispatch::PerAppSwitchReconciler;
use crate::model::Record;
use crate::Result;

pub struct SettingsEngine {
    ctx: Arc<ServiceContext>,
    resolver: Arc<Resolver>,
    dispatcher: NotificationDispatcher,
    reconciler: PerAppSwitchReconciler,
    event_rx: mpsc::Receiver<EngineEvent>,
    shutdown_signal: watch::Receiver<()>,
}

impl SettingsEngine {
    pub fn new(
        ctx: Arc<ServiceContext>,
        event_rx: mpsc::Receiver<EngineEvent>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        let resolver = Arc::new(Resolver::new(ctx.clone()));
        let dispatcher = NotificationDispatcher::new(ctx.clone(), resolver.clone());
        let exclude = ExcludeList::new(&ctx.settings().service.exclude_list_path);
        let reconciler = PerAppSwitchReconciler::new(ctx.clone(), resolver.clone(), exclude);
        SettingsEngine {
            ctx,
            resolver,
            dispatcher,
            reconciler,
            event_rx,
            shutdown_signal,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("settings engine event loop started");
        let mut shutdown_signal = self.shutdown_signal.clone();

        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    warn!("[SettingsEngine] shutdown signal received.");
                    return Ok(());
                }

                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            warn!("[SettingsEngine] event channel closed, stopping.");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn handle_event(
        &self,
        event: EngineEvent,
    ) {
        match event {
            EngineEvent::Resolve(request, reply) => {
                let result = self.resolver.resolve(request).await;
                if reply.send(result).is_err() {
                    warn!("resolve caller dropped before reply");
                }
            }

            EngineEvent::Write(request, reply) => {
                let result = self.handle_write(request).await;
                if reply.send(result).is_err() {
                    warn!("write caller dropped before reply");
                }
            }

            EngineEvent::AppSwitch { previous, current } => {
                if let Err(e) = self.reconciler.reconcile_switch(&previous, &current).await {
                    error!(previous, current, "app-switch reconciliation failed: {:?}", e);
                }
            }

            EngineEvent::AppRemoved { app_id } => {
                if let Err(e) = self.reconciler.reconcile_removal(&app_id).await {
                    error!(app_id, "app-removal reconciliation failed: {:?}", e);
                }
            }

            EngineEvent::DimensionChanged { axes, updates } => {
                for (axis, values) in updates {
                    self.ctx.schema().update_dimension_values(&axis, values);
                }
                if let Err(e) = self.dispatcher.dispatch_change(&ChangeEvent::DimensionChanged { axes }).await {
                    error!("dimension-change dispatch failed: {:?}", e);
                }
            }

            EngineEvent::CountryChanged { country } => {
                self.ctx.set_active_country(country);
                // Country scoping can flip any record in any category.
                if let Err(e) = self.ctx.cache().invalidate_all() {
                    warn!("cache invalidation after country change failed: {:?}", e);
                }
                if let Err(e) = self.dispatcher.dispatch_change(&ChangeEvent::CountryChanged).await {
                    error!("country-change dispatch failed: {:?}", e);
                }
            }

            // Synchronous with respect to the event loop: once handled, no
            // later dispatch pass can deliver to this waiter.
            EngineEvent::Disconnect { waiter, done } => {
                self.ctx.subscriptions().remove_all(waiter);
                let _ = done.send(());
            }
        }
    }

    /// Commit one write and fan out the resulting change.
    async fn handle_write(
        &self,
        request: WriteRequest,
    ) -> Result<u64> {
        let keys = request.values.keys().cloned().collect();
        let record = Record {
            kind: request.kind,
            app_id: request.app_id,
            category: request.category.clone(),
            country: request.country,
            condition: request.condition,
            value: request.values,
        };
        let sequence = self.ctx.query().store(record).await?;
        debug!(category = request.category, sequence, "record stored");

        // Cached rendered views of this category are stale now.
        if let Err(e) = self.ctx.cache().invalidate(&request.category) {
            warn!(category = request.category, "cache invalidation failed: {:?}", e);
        }

        let sent = self
            .dispatcher
            .dispatch_change(&ChangeEvent::Write {
                category: request.category,
                keys,
            })
            .await?;
        debug!(sent, "write change dispatched");
        Ok(sequence)
    }
}
