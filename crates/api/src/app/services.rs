//! Service wiring: one store shared by every use case.

use std::sync::Arc;

use bazaar_infra::{
    AppConfig, BankAccounts, CatalogReader, CatalogStore, InMemoryCatalogStore, OrderSettlement,
    PostgresCatalogStore, ProductLifecycle, StoreError,
};

#[derive(Clone)]
pub struct AppServices {
    pub products: ProductLifecycle<dyn CatalogStore>,
    pub orders: OrderSettlement<dyn CatalogStore>,
    pub catalog: CatalogReader<dyn CatalogStore>,
    pub bank_accounts: BankAccounts<dyn CatalogStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            products: ProductLifecycle::new(store.clone()),
            orders: OrderSettlement::new(store.clone()),
            catalog: CatalogReader::new(store.clone()),
            bank_accounts: BankAccounts::new(store),
        }
    }

    /// Dev/test wiring over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()))
    }
}

/// Postgres when `DATABASE_URL` is configured, in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresCatalogStore::connect(url, config.db_max_connections).await?;
            tracing::info!(max_connections = config.db_max_connections, "using postgres catalog store");
            Ok(AppServices::new(Arc::new(store)))
        }
        None => {
            if config.is_production() {
                tracing::warn!("DATABASE_URL not set in production; data will not survive a restart");
            }
            tracing::info!("using in-memory catalog store");
            Ok(AppServices::in_memory())
        }
    }
}
