//! Wire catalog, factory, registry and cleaner from a [`TicketryConfig`]

use crate::cleaner::{CleanerHandle, CleanerOptions, RegistryCleaner};
use crate::registry::{DefaultTicketRegistry, RegistryOptions, TicketRegistry};
use crate::store::{
    DocumentStoreOptions, DocumentTicketStore, MemoryTicketStore, MokaTicketStore, SqlTicketStore,
    TicketStore,
};
use std::sync::Arc;
use ticketry_config::{BackendKind, TicketryConfig};
use ticketry_core::{DefaultTicketFactory, Error, Result, TicketCatalog};
use ticketry_security::{AesHmacCipherExecutor, CipherExecutor, NoOpCipherExecutor};
use ticketry_utils::{RetryConfig, XdgPaths};
use url::Url;

/// Everything a running deployment needs, built once at startup
pub struct TicketingRuntime {
    pub catalog: Arc<TicketCatalog>,
    pub factory: Arc<DefaultTicketFactory>,
    pub registry: Arc<dyn TicketRegistry>,
    pub cleaner: Arc<RegistryCleaner>,
    cleaner_enabled: bool,
}

impl TicketingRuntime {
    pub async fn from_config(config: &TicketryConfig) -> Result<Self> {
        config.validate()?;

        let catalog = Arc::new(config.catalog()?);
        let factory = Arc::new(DefaultTicketFactory::with_id_suffix(
            Arc::clone(&catalog),
            config.id_suffix.as_deref(),
        )?);
        let registry = build_registry(config, Arc::clone(&catalog)).await?;
        let cleaner = Arc::new(RegistryCleaner::new(
            Arc::clone(&registry),
            CleanerOptions {
                interval: config.cleaner.interval(),
                startup_delay: config.cleaner.startup_delay(),
                delegate_to_native_expiry: config.cleaner.delegate_to_native_expiry,
            },
        ));

        Ok(Self {
            catalog,
            factory,
            registry,
            cleaner,
            cleaner_enabled: config.cleaner.enabled,
        })
    }

    /// Schedule the cleaner unless the configuration turns it off
    pub fn start_cleaner(&self) -> CleanerHandle {
        if !self.cleaner_enabled {
            tracing::info!("registry cleaner disabled by configuration");
            return CleanerHandle::disabled();
        }
        Arc::clone(&self.cleaner).start()
    }
}

/// Build and initialize the configured registry backend
pub async fn build_registry(
    config: &TicketryConfig,
    catalog: Arc<TicketCatalog>,
) -> Result<Arc<dyn TicketRegistry>> {
    let settings = &config.registry;
    let cipher: Arc<dyn CipherExecutor<Vec<u8>, Vec<u8>>> = if config.cipher.enabled {
        Arc::new(AesHmacCipherExecutor::from_config(
            config.cipher.encryption_key.as_deref(),
            config.cipher.signing_key.as_deref(),
        )?)
    } else {
        Arc::new(NoOpCipherExecutor::new())
    };
    let options = RegistryOptions {
        retry: RetryConfig::for_conflicts(settings.conflict_retries)
            .with_fixed_delay(settings.conflict_retry_delay()),
        operation_timeout: settings.operation_timeout(),
        encode_ids: config.cipher.encode_ids,
    };

    match settings.backend {
        BackendKind::Memory => open(MemoryTicketStore::new(), catalog, cipher, options).await,
        BackendKind::Moka => open(MokaTicketStore::default(), catalog, cipher, options).await,
        BackendKind::Document => {
            let url = settings
                .url
                .as_deref()
                .ok_or_else(|| Error::configuration("document backend requires registry.url"))?;
            let base_url = Url::parse(url)
                .map_err(|e| Error::configuration(format!("invalid registry url '{url}': {e}")))?;
            let mut store_options =
                DocumentStoreOptions::new(base_url).with_database_prefix(&settings.database_prefix);
            if let Some(timeout) = settings.operation_timeout() {
                store_options = store_options.with_request_timeout(timeout);
            }
            if let Some(username) = &settings.username {
                store_options = store_options
                    .with_credentials(username, settings.password.clone().unwrap_or_default());
            }
            open(DocumentTicketStore::new(store_options)?, catalog, cipher, options).await
        }
        BackendKind::Sql => {
            let url = match &settings.url {
                Some(url) => url.clone(),
                None => default_database_url().await?,
            };
            open(SqlTicketStore::connect(&url).await?, catalog, cipher, options).await
        }
    }
}

async fn open<S: TicketStore>(
    store: S,
    catalog: Arc<TicketCatalog>,
    cipher: Arc<dyn CipherExecutor<Vec<u8>, Vec<u8>>>,
    options: RegistryOptions,
) -> Result<Arc<dyn TicketRegistry>> {
    let registry = DefaultTicketRegistry::new(store, catalog)
        .with_cipher(cipher)
        .with_options(options);
    registry.initialize().await?;
    Ok(Arc::new(registry))
}

async fn default_database_url() -> Result<String> {
    let path = XdgPaths::database_file();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::configuration(format!("cannot create '{}': {e}", parent.display()))
        })?;
    }
    Ok(format!("sqlite://{}", path.display()))
}
