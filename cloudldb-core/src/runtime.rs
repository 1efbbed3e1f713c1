use std::{future::Future, sync::Arc};

use cloudldb_config::{ConfigError, InvocationConfig};
use cloudldb_object_storage::{open_object_store, ObjectTableStore, StorageResult, TableStore};
use tracing::Instrument;

use crate::{
    compaction::{run_compaction, CompactionEvent},
    error::HandlerResult,
    lookup::{run_lookup, LookupEvent},
    response::{CompactionResponse, LookupResponse},
};

type StoreFactory = dyn Fn(&InvocationConfig) -> StorageResult<Arc<dyn TableStore>> + Send + Sync;
type ConfigLoader = dyn Fn() -> Result<InvocationConfig, ConfigError> + Send + Sync;

/// Entry point for handler invocations.
///
/// Each call reads a fresh [`InvocationConfig`], opens the table store and runs
/// the handler inside its own span, so concurrent invocations share no state.
pub struct Runtime {
    config_loader: Box<ConfigLoader>,
    store_factory: Box<StoreFactory>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_store_factory(|config| {
            let store = open_object_store(config)?;
            Ok(Arc::new(ObjectTableStore::new(store)) as Arc<dyn TableStore>)
        })
    }

    pub fn with_store_factory(
        factory: impl Fn(&InvocationConfig) -> StorageResult<Arc<dyn TableStore>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            config_loader: Box::new(InvocationConfig::load),
            store_factory: Box::new(factory),
        }
    }

    /// Replace the environment as the source of invocation settings.
    pub fn with_config_loader(
        mut self,
        loader: impl Fn() -> Result<InvocationConfig, ConfigError> + Send + Sync + 'static,
    ) -> Self {
        self.config_loader = Box::new(loader);
        self
    }

    pub async fn compact(&self, event: CompactionEvent) -> HandlerResult<CompactionResponse> {
        let config = (self.config_loader)()?;
        self.compact_with_config(&config, &event).await
    }

    pub async fn compact_with_config(
        &self,
        config: &InvocationConfig,
        event: &CompactionEvent,
    ) -> HandlerResult<CompactionResponse> {
        let store = (self.store_factory)(config)?;
        invoke("compact", run_compaction(config, store.as_ref(), event)).await
    }

    pub async fn get(&self, event: LookupEvent) -> HandlerResult<LookupResponse> {
        let config = (self.config_loader)()?;
        self.get_with_config(&config, &event).await
    }

    pub async fn get_with_config(
        &self,
        config: &InvocationConfig,
        event: &LookupEvent,
    ) -> HandlerResult<LookupResponse> {
        let store = (self.store_factory)(config)?;
        invoke("get", run_lookup(config, store.as_ref(), event)).await
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

async fn invoke<T, F>(handler: &'static str, fut: F) -> HandlerResult<T>
where
    F: Future<Output = HandlerResult<T>>,
{
    let span = tracing::info_span!(
        "invocation",
        handler,
        invocation_id = %uuid::Uuid::new_v4()
    );

    async move {
        let result = fut.await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "invocation failed");
        }
        result
    }
    .instrument(span)
    .await
}
