//! In-memory catalog store.
//!
//! Intended for tests/dev. Transactions are serialized: a transaction holds the
//! state lock for its whole lifetime, writes to a private copy, and publishes
//! that copy on commit. Rollback or drop throws the copy away.
//!
//! Fault injection and the raw inspection accessors are only compiled for
//! tests, or with the `test-util` feature.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
#[cfg(any(test, feature = "test-util"))]
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use bazaar_core::{BankAccountId, ProductId, UserId};
use bazaar_parties::{BankAccount, UserProfile};
use bazaar_products::{CatalogQuery, Product, ProductTag};
use bazaar_sales::Order;

use crate::store::{CatalogStore, CatalogTx, StoreError};

/// Write paths that can be made to fail, for atomicity tests.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertTags,
    InsertOrder,
    UpdateProduct,
}

#[derive(Debug, Clone)]
struct Row<T> {
    value: T,
    deleted_at: Option<DateTime<Utc>>,
}

impl<T> Row<T> {
    fn live(value: T) -> Self {
        Self { value, deleted_at: None }
    }

    fn get(&self) -> Option<&T> {
        self.deleted_at.is_none().then_some(&self.value)
    }

    fn get_mut(&mut self) -> Option<&mut T> {
        if self.deleted_at.is_none() {
            Some(&mut self.value)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    products: HashMap<ProductId, Row<Product>>,
    tags: BTreeMap<i64, ProductTag>,
    next_tag_id: i64,
    orders: Vec<Order>,
    profiles: HashMap<UserId, UserProfile>,
    accounts: HashMap<BankAccountId, Row<BankAccount>>,
}

impl State {
    fn live_product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id).and_then(Row::get)
    }

    fn tags_of(&self, product_id: ProductId) -> Vec<ProductTag> {
        let mut tags: Vec<ProductTag> = self
            .tags
            .values()
            .filter(|t| t.product_id == product_id)
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.tag.cmp(&b.tag).then(a.id.cmp(&b.id)));
        tags
    }

    fn write_stock(&mut self, id: ProductId, stock: i64) -> Result<(), StoreError> {
        let affected = match self.products.get_mut(&id).and_then(Row::get_mut) {
            Some(product) if stock >= 0 => {
                product.stock = stock;
                1
            }
            Some(_) => return Err(StoreError::backend("update_stock", "stock must not be negative")),
            None => 0,
        };
        StoreError::expect_one("update_stock", affected)
    }

    fn decrement_stock(&mut self, id: ProductId, quantity: i64) -> Result<i64, StoreError> {
        match self.products.get_mut(&id).and_then(Row::get_mut) {
            Some(product) if product.stock >= quantity => {
                product.stock -= quantity;
                Ok(product.stock)
            }
            _ => Err(StoreError::RowCount {
                operation: "decrement_stock",
                affected: 0,
            }),
        }
    }
}

/// In-memory `CatalogStore`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<Mutex<State>>,
    #[cfg(any(test, feature = "test-util"))]
    faults: Arc<StdMutex<HashSet<FailPoint>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl InMemoryCatalogStore {
    /// Make every later transactional write of this kind fail until cleared.
    pub fn fail_on(&self, point: FailPoint) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(point);
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    /// Every order ever committed, in insertion order.
    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.clone()
    }

    /// Raw tag rows of a product, including those of a soft-deleted product.
    pub async fn raw_tags_of(&self, product_id: ProductId) -> Vec<ProductTag> {
        self.state.lock().await.tags_of(product_id)
    }

    fn fault_set(&self) -> HashSet<FailPoint> {
        self.faults.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = (*guard).clone();
        Ok(Box::new(InMemoryCatalogTx {
            guard,
            work,
            #[cfg(any(test, feature = "test-util"))]
            faults: self.fault_set(),
        }))
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.state.lock().await.live_product(id).cloned())
    }

    async fn tags_for(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Vec<ProductTag>>, StoreError> {
        let state = self.state.lock().await;
        let mut out = HashMap::new();
        for id in ids {
            let tags = state.tags_of(*id);
            if !tags.is_empty() {
                out.insert(*id, tags);
            }
        }
        Ok(out)
    }

    async fn list_products(&self, query: &CatalogQuery) -> Result<(Vec<Product>, i64), StoreError> {
        let state = self.state.lock().await;
        let mut matched: Vec<&Product> = state
            .products
            .values()
            .filter_map(Row::get)
            .filter(|p| query.matches(p, &state.tags_of(p.id)))
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn purchase_counts(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, i64>, StoreError> {
        let state = self.state.lock().await;
        let wanted: HashSet<&ProductId> = ids.iter().collect();
        let mut out = HashMap::new();
        for order in state.orders.iter().filter(|o| wanted.contains(&o.product_id)) {
            *out.entry(order.product_id).or_insert(0) += order.quantity;
        }
        Ok(out)
    }

    async fn units_sold_by(&self, seller: UserId) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| {
                state
                    .products
                    .get(&o.product_id)
                    .is_some_and(|row| row.value.owner_id == seller)
            })
            .map(|o| o.quantity)
            .sum())
    }

    async fn update_stock(&self, id: ProductId, stock: i64) -> Result<(), StoreError> {
        self.state.lock().await.write_stock(id, stock)
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn profile_by_id(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.state.lock().await.profiles.get(&id).cloned())
    }

    async fn bank_account_by_id(&self, id: BankAccountId) -> Result<Option<BankAccount>, StoreError> {
        Ok(self.state.lock().await.accounts.get(&id).and_then(Row::get).cloned())
    }

    async fn bank_accounts_of(&self, owner: UserId) -> Result<Vec<BankAccount>, StoreError> {
        let state = self.state.lock().await;
        let mut accounts: Vec<BankAccount> = state
            .accounts
            .values()
            .filter_map(Row::get)
            .filter(|a| a.owner_id == owner)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(accounts)
    }

    async fn insert_bank_account(&self, account: &BankAccount) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::backend("insert_bank_account", "duplicate id"));
        }
        state.accounts.insert(account.id, Row::live(account.clone()));
        Ok(())
    }

    async fn update_bank_account(&self, account: &BankAccount) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let affected = match state.accounts.get_mut(&account.id).and_then(Row::get_mut) {
            Some(stored) => {
                stored.bank_name = account.bank_name.clone();
                stored.account_name = account.account_name.clone();
                stored.account_number = account.account_number.clone();
                1
            }
            None => 0,
        };
        StoreError::expect_one("update_bank_account", affected)
    }

    async fn soft_delete_bank_account(&self, id: BankAccountId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let affected = match state.accounts.get_mut(&id) {
            Some(row) if row.deleted_at.is_none() => {
                row.deleted_at = Some(Utc::now());
                1
            }
            _ => 0,
        };
        StoreError::expect_one("soft_delete_bank_account", affected)
    }
}

/// Transaction over a private copy of the store state.
pub struct InMemoryCatalogTx {
    guard: OwnedMutexGuard<State>,
    work: State,
    #[cfg(any(test, feature = "test-util"))]
    faults: HashSet<FailPoint>,
}

impl InMemoryCatalogTx {
    #[cfg(any(test, feature = "test-util"))]
    fn check(&self, point: FailPoint, operation: &'static str) -> Result<(), StoreError> {
        if self.faults.contains(&point) {
            return Err(StoreError::backend(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogTx for InMemoryCatalogTx {
    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        if self.work.products.contains_key(&product.id) {
            return Err(StoreError::backend("insert_product", "duplicate id"));
        }
        self.work.products.insert(product.id, Row::live(product.clone()));
        Ok(())
    }

    async fn insert_tags(&mut self, product_id: ProductId, tags: &[String]) -> Result<(), StoreError> {
        #[cfg(any(test, feature = "test-util"))]
        self.check(FailPoint::InsertTags, "insert_tags")?;
        for tag in tags {
            self.work.next_tag_id += 1;
            let id = self.work.next_tag_id;
            self.work.tags.insert(
                id,
                ProductTag {
                    id,
                    product_id,
                    tag: tag.clone(),
                },
            );
        }
        Ok(())
    }

    async fn tags_of(&mut self, product_id: ProductId) -> Result<Vec<ProductTag>, StoreError> {
        Ok(self.work.tags_of(product_id))
    }

    async fn delete_tags(&mut self, ids: &[i64]) -> Result<(), StoreError> {
        for id in ids {
            self.work.tags.remove(id);
        }
        Ok(())
    }

    async fn delete_tags_of(&mut self, product_id: ProductId) -> Result<(), StoreError> {
        self.work.tags.retain(|_, t| t.product_id != product_id);
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> Result<(), StoreError> {
        #[cfg(any(test, feature = "test-util"))]
        self.check(FailPoint::UpdateProduct, "update_product")?;
        let affected = match self.work.products.get_mut(&product.id).and_then(Row::get_mut) {
            Some(stored) => {
                stored.name = product.name.clone();
                stored.price = product.price;
                stored.image_url = product.image_url.clone();
                stored.condition = product.condition;
                stored.is_purchasable = product.is_purchasable;
                1
            }
            None => 0,
        };
        StoreError::expect_one("update_product", affected)
    }

    async fn soft_delete_product(&mut self, id: ProductId) -> Result<(), StoreError> {
        let affected = match self.work.products.get_mut(&id) {
            Some(row) if row.deleted_at.is_none() => {
                row.deleted_at = Some(Utc::now());
                1
            }
            _ => 0,
        };
        StoreError::expect_one("soft_delete_product", affected)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        #[cfg(any(test, feature = "test-util"))]
        self.check(FailPoint::InsertOrder, "insert_order")?;
        self.work.orders.push(order.clone());
        Ok(())
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: i64) -> Result<i64, StoreError> {
        self.work.decrement_stock(id, quantity)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryCatalogTx { mut guard, work, .. } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
