//! The running service handle.
//!
//! [`Service`] owns the event sender into the engine loop and exposes the
//! request-shaped operations as plain async methods. Every call funnels
//! through the loop, so callers see the same serialization guarantees as
//! the loop itself.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::engine::EngineEvent;
use crate::engine::ResolveRequest;
use crate::engine::ResolveResponse;
use crate::engine::ServiceContext;
use crate::engine::WriteRequest;
use crate::model::DimensionMap;
use crate::subscription::WaiterId;
use crate::DispatchError;
use crate::Result;

#[derive(Debug)]
pub struct Service {
    pub(crate) ctx: Arc<ServiceContext>,

    /// Engine loop intake; cloneable for transport frontends
    pub event_tx: mpsc::Sender<EngineEvent>,

    pub(crate) ready: AtomicBool,
}

impl Service {
    pub fn context(&self) -> &Arc<ServiceContext> {
        &self.ctx
    }

    pub fn set_ready(
        &self,
        is_ready: bool,
    ) {
        self.ready.store(is_ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Resolve a set of keys through the engine loop.
    pub async fn resolve(
        &self,
        request: ResolveRequest,
    ) -> Result<ResolveResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineEvent::Resolve(request, reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| DispatchError::ChannelClosed("resolve reply dropped".to_string()))?
    }

    /// Commit one write; returns the assigned commit sequence.
    pub async fn write(
        &self,
        request: WriteRequest,
    ) -> Result<u64> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineEvent::Write(request, reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| DispatchError::ChannelClosed("write reply dropped".to_string()))?
    }

    pub async fn notify_app_switch(
        &self,
        previous: impl Into<String>,
        current: impl Into<String>,
    ) -> Result<()> {
        self.send(EngineEvent::AppSwitch {
            previous: previous.into(),
            current: current.into(),
        })
        .await
    }

    pub async fn notify_app_removed(
        &self,
        app_id: impl Into<String>,
    ) -> Result<()> {
        self.send(EngineEvent::AppRemoved {
            app_id: app_id.into(),
        })
        .await
    }

    pub async fn notify_dimension_changed(
        &self,
        updates: Vec<(String, DimensionMap)>,
    ) -> Result<()> {
        let axes = updates.iter().map(|(axis, _)| axis.clone()).collect();
        self.send(EngineEvent::DimensionChanged { axes, updates }).await
    }

    pub async fn notify_country_changed(
        &self,
        country: impl Into<String>,
    ) -> Result<()> {
        self.send(EngineEvent::CountryChanged {
            country: country.into(),
        })
        .await
    }

    /// Drop every subscription owned by `waiter`. Resolves once the loop
    /// has processed the removal, after which no notification can reach
    /// the waiter.
    pub async fn disconnect(
        &self,
        waiter: WaiterId,
    ) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(EngineEvent::Disconnect {
            waiter,
            done: done_tx,
        })
        .await?;
        done_rx
            .await
            .map_err(|_| DispatchError::ChannelClosed("disconnect ack dropped".to_string()))?;
        Ok(())
    }

    async fn send(
        &self,
        event: EngineEvent,
    ) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| DispatchError::ChannelClosed("engine event queue closed".to_string()))?;
        Ok(())
    }
}
