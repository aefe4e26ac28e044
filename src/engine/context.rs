//! Top-level service context: every process-wide collaborator as an
//! explicit injected dependency, single instance per process, passed by
//! reference to each component.

use std::fmt::Debug;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::Settings;
use crate::merge::VolatileStore;
use crate::model::Condition;
use crate::query::QueryEngine;
use crate::query::RenderedCache;
use crate::schema::KeySchema;
use crate::subscription::SubscriptionIndex;

pub struct ServiceContext {
    pub(crate) settings: Arc<Settings>,

    /// Read-only after startup; no lock needed
    pub(crate) condition: Arc<Condition>,

    /// Active country code, swapped atomically on country-change events
    pub(crate) active_country: ArcSwap<String>,

    pub(crate) schema: Arc<dyn KeySchema>,
    pub(crate) query: Arc<dyn QueryEngine>,
    pub(crate) volatile: Arc<dyn VolatileStore>,
    pub(crate) cache: Arc<dyn RenderedCache>,
    pub(crate) subscriptions: Arc<SubscriptionIndex>,
}

impl ServiceContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Arc<Settings>,
        condition: Arc<Condition>,
        schema: Arc<dyn KeySchema>,
        query: Arc<dyn QueryEngine>,
        volatile: Arc<dyn VolatileStore>,
        cache: Arc<dyn RenderedCache>,
        subscriptions: Arc<SubscriptionIndex>,
    ) -> Self {
        let active_country = ArcSwap::from_pointee(settings.service.country_code.clone());
        ServiceContext {
            settings,
            condition,
            active_country,
            schema,
            query,
            volatile,
            cache,
            subscriptions,
        }
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn active_country(&self) -> String {
        self.active_country.load().as_ref().clone()
    }

    pub fn set_active_country(
        &self,
        country: String,
    ) {
        self.active_country.store(Arc::new(country));
    }

    pub fn schema(&self) -> &Arc<dyn KeySchema> {
        &self.schema
    }

    pub fn query(&self) -> &Arc<dyn QueryEngine> {
        &self.query
    }

    pub fn volatile(&self) -> &Arc<dyn VolatileStore> {
        &self.volatile
    }

    pub fn cache(&self) -> &Arc<dyn RenderedCache> {
        &self.cache
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionIndex> {
        &self.subscriptions
    }
}

impl Debug for ServiceContext {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("active_country", &self.active_country())
            .finish()
    }
}
