//! Builder for assembling a running [`Service`].
//!
//! Initializes production defaults for every collaborator (sled record
//! store, directory-backed rendered cache, JSON key schema, in-memory
//! volatile store) and lets callers override any of them before `build()`.
//! `build()` spawns the engine loop; `ready()` hands out the finished
//! service handle.
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let service = ServiceBuilder::new(None, shutdown_rx)?
//!     .volatile_store(custom_store) // optional override
//!     .build()?
//!     .ready()?;
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::error;
use tracing::info;

use super::Service;
use crate::config::Settings;
use crate::engine::ServiceContext;
use crate::engine::SettingsEngine;
use crate::merge::InMemoryVolatileStore;
use crate::merge::VolatileStore;
use crate::model::Condition;
use crate::query::DirCache;
use crate::query::QueryEngine;
use crate::query::RenderedCache;
use crate::query::SledQueryEngine;
use crate::schema::KeySchema;
use crate::schema::StaticKeySchema;
use crate::subscription::SubscriptionIndex;
use crate::Error;
use crate::Result;

pub struct ServiceBuilder {
    settings: Settings,
    schema: Option<Arc<dyn KeySchema>>,
    query: Option<Arc<dyn QueryEngine>>,
    volatile: Option<Arc<dyn VolatileStore>>,
    cache: Option<Arc<dyn RenderedCache>>,
    condition: Option<Condition>,
    shutdown_signal: watch::Receiver<()>,

    service: Option<Arc<Service>>,
}

impl ServiceBuilder {
    /// Creates a builder with settings loaded from the default config
    /// location, optionally overridden by an explicit file.
    pub fn new(
        config_path: Option<&str>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Result<Self> {
        let settings = Settings::load(config_path)?;
        Ok(Self::from_settings(settings, shutdown_signal))
    }

    pub fn from_settings(
        settings: Settings,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        ServiceBuilder {
            settings,
            schema: None,
            query: None,
            volatile: None,
            cache: None,
            condition: None,
            shutdown_signal,
            service: None,
        }
    }

    pub fn key_schema(
        mut self,
        schema: Arc<dyn KeySchema>,
    ) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn query_engine(
        mut self,
        query: Arc<dyn QueryEngine>,
    ) -> Self {
        self.query = Some(query);
        self
    }

    pub fn volatile_store(
        mut self,
        volatile: Arc<dyn VolatileStore>,
    ) -> Self {
        self.volatile = Some(volatile);
        self
    }

    pub fn rendered_cache(
        mut self,
        cache: Arc<dyn RenderedCache>,
    ) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn condition(
        mut self,
        condition: Condition,
    ) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Assembles the context, wiring defaults for any unconfigured
    /// collaborator, and spawns the engine loop. Initialization failures
    /// here are unrecoverable for the process.
    pub fn build(mut self) -> Result<Self> {
        let settings = Arc::new(self.settings.clone());

        let schema = match self.schema.take() {
            Some(schema) => schema,
            None => Arc::new(StaticKeySchema::load(&settings.service.schema_path).map_err(fatal_init)?),
        };
        let query = match self.query.take() {
            Some(query) => query,
            None => Arc::new(SledQueryEngine::open(&settings.storage.db_path).map_err(fatal_init)?),
        };
        let volatile = self
            .volatile
            .take()
            .unwrap_or_else(|| Arc::new(InMemoryVolatileStore::new()));
        let cache = self
            .cache
            .take()
            .unwrap_or_else(|| Arc::new(DirCache::new(settings.storage.cache_dir.clone())));
        let condition = match self.condition.take() {
            Some(condition) => condition,
            None => Condition::load(&settings.service.condition_path).map_err(fatal_init)?,
        };

        let ctx = Arc::new(ServiceContext::new(
            settings.clone(),
            Arc::new(condition),
            schema,
            query,
            volatile,
            cache,
            Arc::new(SubscriptionIndex::new()),
        ));

        let (event_tx, event_rx) = mpsc::channel(settings.service.event_queue_capacity);
        let mut engine = SettingsEngine::new(ctx.clone(), event_rx, self.shutdown_signal.clone());
        tokio::spawn(async move {
            if let Err(e) = engine.run().await {
                error!("settings engine stopped with error: {:?}", e);
            }
        });

        self.service = Some(Arc::new(Service {
            ctx,
            event_tx,
            ready: AtomicBool::new(false),
        }));
        Ok(self)
    }

    /// Finalizes construction and returns the service handle.
    pub fn ready(mut self) -> Result<Arc<Service>> {
        match self.service.take() {
            Some(service) => {
                service.set_ready(true);
                info!("settings service ready");
                Ok(service)
            }
            None => Err(Error::Fatal("ready() called before build()".to_string())),
        }
    }
}

fn fatal_init(e: Error) -> Error {
    error!("service initialization failed: {:?}", e);
    Error::Fatal(format!("service initialization failed: {e}"))
}
