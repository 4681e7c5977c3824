//! Product lifecycle: create, update, delete and direct stock updates.
//!
//! Every multi-row write runs in one transaction that is rolled back
//! explicitly before an error is returned.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use bazaar_auth::Identity;
use bazaar_core::{DomainError, Entity, ProductId, UserId};
use bazaar_parties::UserProfile;
use bazaar_products::{Product, ProductDraft, ProductPatch, reconcile, tag_texts};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{CatalogStore, CatalogTx, StoreError};

/// A freshly created listing with the tags as they were submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProduct {
    pub product: Product,
    pub tags: Vec<String>,
}

/// A listing after an update, with its tag set as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedProduct {
    pub product: Product,
    pub tags: Vec<String>,
}

pub struct ProductLifecycle<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ProductLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> ProductLifecycle<S>
where
    S: CatalogStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// List a new product for `seller`.
    #[instrument(skip(self, seller, draft), fields(seller_id = %seller.user_id), err)]
    pub async fn create(&self, seller: &Identity, draft: ProductDraft) -> ServiceResult<CreatedProduct> {
        draft.validate()?;
        self.store.upsert_profile(&profile_of(seller)).await?;

        let (product, tags) = draft.into_parts(ProductId::new(), seller.user_id, Utc::now());
        // Duplicates in the submitted list are written once.
        let initial = reconcile(&[], &tags).insert;

        let mut tx = self.store.begin().await?;
        if let Err(e) = insert_listing(tx.as_mut(), &product, &initial).await {
            return Err(abort(tx, e).await);
        }
        tx.commit().await?;

        info!(product_id = %product.id, tag_count = initial.len(), "product created");
        Ok(CreatedProduct { product, tags })
    }

    /// Patch descriptive fields, purchasability and tags. Stock is never touched.
    #[instrument(skip(self, patch), fields(product_id = %product_id, caller = %caller), err)]
    pub async fn update(
        &self,
        product_id: ProductId,
        caller: UserId,
        patch: ProductPatch,
    ) -> ServiceResult<UpdatedProduct> {
        patch.validate()?;
        let mut product = self.owned_product(product_id, caller).await?;
        let desired = patch.apply(&mut product);

        let mut tx = self.store.begin().await?;
        let tags = match rewrite_listing(tx.as_mut(), &product, desired.as_deref()).await {
            Ok(tags) => tags,
            Err(e) => return Err(abort(tx, e).await),
        };
        tx.commit().await?;

        info!(product_id = %product.id, "product updated");
        Ok(UpdatedProduct { product, tags })
    }

    /// Soft-delete the product and hard-delete its tags.
    #[instrument(skip(self), fields(product_id = %product_id, caller = %caller), err)]
    pub async fn delete(&self, product_id: ProductId, caller: UserId) -> ServiceResult<()> {
        self.owned_product(product_id, caller).await?;

        let mut tx = self.store.begin().await?;
        if let Err(e) = remove_listing(tx.as_mut(), product_id).await {
            return Err(abort(tx, e).await);
        }
        tx.commit().await?;

        info!(product_id = %product_id, "product deleted");
        Ok(())
    }

    /// Overwrite the stock of an owned product with a single statement.
    #[instrument(skip(self), fields(product_id = %product_id, caller = %caller), err)]
    pub async fn update_stock(&self, product_id: ProductId, caller: UserId, new_stock: i64) -> ServiceResult<Product> {
        if new_stock < 0 {
            return Err(DomainError::validation("stock: must be greater than or equal to 0").into());
        }
        let mut product = self.owned_product(product_id, caller).await?;

        self.store
            .update_stock(product_id, new_stock)
            .await?;

        product.stock = new_stock;
        Ok(product)
    }

    async fn owned_product(&self, product_id: ProductId, caller: UserId) -> ServiceResult<Product> {
        let product = self
            .store
            .product_by_id(product_id)
            .await?
            .ok_or(DomainError::not_found("product"))?;
        if !product.is_owned_by(caller) {
            return Err(DomainError::forbidden("product belongs to another seller").into());
        }
        Ok(product)
    }
}

async fn insert_listing(tx: &mut dyn CatalogTx, product: &Product, tags: &[String]) -> Result<(), StoreError> {
    tx.insert_product(product).await?;
    if !tags.is_empty() {
        tx.insert_tags(product.id, tags).await?;
    }
    Ok(())
}

/// Reconcile tags (when a desired set is given), then write the row. Returns
/// the resulting tag texts.
async fn rewrite_listing(
    tx: &mut dyn CatalogTx,
    product: &Product,
    desired: Option<&[String]>,
) -> Result<Vec<String>, StoreError> {
    let current = tx.tags_of(product.id).await?;
    let tags = match desired {
        None => tag_texts(&current),
        Some(desired) => {
            let diff = reconcile(&current, desired);
            if !diff.insert.is_empty() {
                tx.insert_tags(product.id, &diff.insert).await?;
            }
            if !diff.delete.is_empty() {
                tx.delete_tags(&diff.delete_ids()).await?;
            }
            if diff.is_empty() {
                tag_texts(&current)
            } else {
                tag_texts(&tx.tags_of(product.id).await?)
            }
        }
    };
    tx.update_product(product).await?;
    Ok(tags)
}

async fn remove_listing(tx: &mut dyn CatalogTx, product_id: ProductId) -> Result<(), StoreError> {
    tx.soft_delete_product(product_id).await?;
    tx.delete_tags_of(product_id).await?;
    Ok(())
}

/// Roll back after a failed step and hand back the step's error.
pub(crate) async fn abort(tx: Box<dyn CatalogTx>, err: StoreError) -> ServiceError {
    if let Err(rollback_err) = tx.rollback().await {
        warn!(error = %rollback_err, "rollback failed");
    }
    err.into()
}

pub(crate) fn profile_of(identity: &Identity) -> UserProfile {
    UserProfile {
        user_id: identity.user_id,
        username: identity.username.clone(),
        display_name: identity.display_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::{FailPoint, InMemoryCatalogStore};
    use bazaar_products::{Condition, Patch};

    fn seller() -> Identity {
        Identity::new(UserId::new(), "seller", "Seller One")
    }

    fn draft(tags: &[&str]) -> ProductDraft {
        ProductDraft {
            name: "Leather wallet".to_string(),
            price: 120_000,
            image_url: "https://img.example.com/wallet.png".to_string(),
            stock: 4,
            condition: Condition::New,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_purchasable: true,
        }
    }

    fn tags_patch(tags: &[&str]) -> ProductPatch {
        ProductPatch {
            tags: Patch::Set(tags.iter().map(|t| t.to_string()).collect()),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<InMemoryCatalogStore>, ProductLifecycle<InMemoryCatalogStore>) {
        let store = Arc::new(InMemoryCatalogStore::new());
        let lifecycle = ProductLifecycle::new(store.clone());
        (store, lifecycle)
    }

    #[tokio::test]
    async fn create_persists_product_tags_and_profile() {
        let (store, lifecycle) = setup();
        let seller = seller();

        let created = lifecycle.create(&seller, draft(&["leather", "wallet"])).await.unwrap();

        assert_eq!(created.tags, vec!["leather", "wallet"]);
        let stored = store.product_by_id(created.product.id).await.unwrap().unwrap();
        assert_eq!(stored, created.product);
        assert_eq!(store.raw_tags_of(stored.id).await.len(), 2);
        let profile = store.profile_by_id(seller.user_id).await.unwrap().unwrap();
        assert_eq!(profile.display_name, "Seller One");
    }

    #[tokio::test]
    async fn create_with_no_tags_skips_tag_write() {
        let (store, lifecycle) = setup();
        // A tag write would fail; an empty tag list must not attempt one.
        store.fail_on(FailPoint::InsertTags);

        let created = lifecycle.create(&seller(), draft(&[])).await.unwrap();
        assert!(store.product_by_id(created.product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_is_atomic_when_tag_insert_fails() {
        let (store, lifecycle) = setup();
        store.fail_on(FailPoint::InsertTags);

        let err = lifecycle.create(&seller(), draft(&["x"])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Persistence(_)));

        let (page, total) = store
            .list_products(&bazaar_products::CatalogQuery {
                include_empty_stock: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn create_rejects_negative_stock() {
        let (_, lifecycle) = setup();
        let mut d = draft(&[]);
        d.stock = -1;

        let err = lifecycle.create(&seller(), d).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn update_reconciles_tags_and_is_idempotent() {
        let (store, lifecycle) = setup();
        let seller = seller();
        let created = lifecycle.create(&seller, draft(&["a", "b"])).await.unwrap();
        let id = created.product.id;
        let before = store.raw_tags_of(id).await;
        let kept_b = before.iter().find(|t| t.tag == "b").unwrap().id;

        let first = lifecycle.update(id, seller.user_id, tags_patch(&["b", "c"])).await.unwrap();
        assert_eq!(first.tags, vec!["b", "c"]);
        let after_first = store.raw_tags_of(id).await;
        assert!(after_first.iter().any(|t| t.id == kept_b), "unchanged tag keeps its row");

        let second = lifecycle.update(id, seller.user_id, tags_patch(&["b", "c"])).await.unwrap();
        assert_eq!(second.tags, vec!["b", "c"]);
        assert_eq!(store.raw_tags_of(id).await, after_first);
    }

    #[tokio::test]
    async fn update_never_touches_stock() {
        let (store, lifecycle) = setup();
        let seller = seller();
        let created = lifecycle.create(&seller, draft(&[])).await.unwrap();
        let id = created.product.id;

        lifecycle.update_stock(id, seller.user_id, 9).await.unwrap();
        let patch = ProductPatch {
            name: Patch::Set("Leather wallet, brown".to_string()),
            is_purchasable: Patch::Set(false),
            ..Default::default()
        };
        let updated = lifecycle.update(id, seller.user_id, patch).await.unwrap();

        let stored = store.product_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 9);
        assert_eq!(stored.name, "Leather wallet, brown");
        assert!(!stored.is_purchasable);
        assert_eq!(updated.product.name, stored.name);
    }

    #[tokio::test]
    async fn update_failure_rolls_back_tag_changes() {
        let (store, lifecycle) = setup();
        let seller = seller();
        let created = lifecycle.create(&seller, draft(&["a"])).await.unwrap();
        let id = created.product.id;
        store.fail_on(FailPoint::UpdateProduct);

        assert!(lifecycle.update(id, seller.user_id, tags_patch(&["z"])).await.is_err());

        let tags: Vec<String> = store.raw_tags_of(id).await.into_iter().map(|t| t.tag).collect();
        assert_eq!(tags, vec!["a"]);
    }

    #[tokio::test]
    async fn non_owner_cannot_mutate_and_state_is_unchanged() {
        let (store, lifecycle) = setup();
        let seller = seller();
        let intruder = UserId::new();
        let created = lifecycle.create(&seller, draft(&["a"])).await.unwrap();
        let id = created.product.id;

        let update = lifecycle.update(id, intruder, tags_patch(&["z"])).await.unwrap_err();
        let delete = lifecycle.delete(id, intruder).await.unwrap_err();
        let stock = lifecycle.update_stock(id, intruder, 0).await.unwrap_err();

        for err in [update, delete, stock] {
            assert_eq!(err.code(), "forbidden");
        }
        assert_eq!(store.product_by_id(id).await.unwrap(), Some(created.product));
        assert_eq!(store.raw_tags_of(id).await.len(), 1);
    }

    #[tokio::test]
    async fn delete_hides_product_and_drops_tags() {
        let (store, lifecycle) = setup();
        let seller = seller();
        let created = lifecycle.create(&seller, draft(&["a", "b"])).await.unwrap();
        let id = created.product.id;

        lifecycle.delete(id, seller.user_id).await.unwrap();

        assert!(store.product_by_id(id).await.unwrap().is_none());
        assert!(store.raw_tags_of(id).await.is_empty());

        let again = lifecycle.delete(id, seller.user_id).await.unwrap_err();
        assert_eq!(again.code(), "not_found");
    }

    #[tokio::test]
    async fn update_stock_validates_and_overwrites() {
        let (store, lifecycle) = setup();
        let seller = seller();
        let created = lifecycle.create(&seller, draft(&[])).await.unwrap();
        let id = created.product.id;

        let err = lifecycle.update_stock(id, seller.user_id, -3).await.unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let product = lifecycle.update_stock(id, seller.user_id, 0).await.unwrap();
        assert_eq!(product.stock, 0);
        assert_eq!(store.product_by_id(id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let (_, lifecycle) = setup();
        let err = lifecycle
            .update(ProductId::new(), UserId::new(), ProductPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
