//! Read side of the catalog: paginated listing and product detail.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use bazaar_core::{DomainError, ProductId, ids_of};
use bazaar_products::{CatalogQuery, ProductDetailView, ProductView};

use crate::error::ServiceResult;
use crate::store::CatalogStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

pub struct CatalogReader<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for CatalogReader<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> CatalogReader<S>
where
    S: CatalogStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// One page of products, with tags and purchase counts fetched in bulk.
    #[instrument(skip(self, query), fields(limit = query.limit, offset = query.offset), err)]
    pub async fn list(&self, query: &CatalogQuery) -> ServiceResult<Page<ProductView>> {
        let (products, total) = self.store.list_products(query).await?;

        let ids = ids_of(&products);
        let mut tags = self.store.tags_for(&ids).await?;
        let counts = self.store.purchase_counts(&ids).await?;

        let items = products
            .iter()
            .map(|p| {
                let rows = tags.remove(&p.id).unwrap_or_default();
                ProductView::from_rows(p, &rows, counts.get(&p.id).copied().unwrap_or(0))
            })
            .collect();

        Ok(Page {
            items,
            meta: PageMeta {
                limit: query.limit,
                offset: query.offset,
                total,
            },
        })
    }

    /// Product with its seller summary: display name, units sold across all
    /// of the seller's products, and payout accounts.
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn detail(&self, product_id: ProductId) -> ServiceResult<ProductDetailView> {
        let product = self
            .store
            .product_by_id(product_id)
            .await?
            .ok_or(DomainError::not_found("product"))?;
        let seller = self
            .store
            .profile_by_id(product.owner_id)
            .await?
            .ok_or(DomainError::not_found("seller"))?;

        let ids = [product.id];
        let tags = self.store.tags_for(&ids).await?.remove(&product.id).unwrap_or_default();
        let purchase_count = self
            .store
            .purchase_counts(&ids)
            .await?
            .get(&product.id)
            .copied()
            .unwrap_or(0);
        let sold_total = self.store.units_sold_by(product.owner_id).await?;
        let accounts = self.store.bank_accounts_of(product.owner_id).await?;

        Ok(ProductDetailView::new(
            ProductView::from_rows(&product, &tags, purchase_count),
            &seller,
            sold_total,
            &accounts,
        ))
    }
}
