//! Order settlement.
//!
//! The purchase checks read outside any transaction. The decrement does not
//! trust those reads: it subtracts the quantity from whatever stock the row
//! holds at write time and only matches while that stock still covers it. An
//! order that still fits after a concurrent sale goes through; one that no
//! longer fits misses the row and the whole order rolls back with a
//! concurrency error.

use std::sync::Arc;

use tracing::{info, instrument};

use bazaar_core::{DomainError, OrderId, ProductId, UserId};
use bazaar_sales::{Order, PlaceOrder};

use crate::error::ServiceResult;
use crate::product_service::abort;
use crate::store::{CatalogStore, CatalogTx, StoreError};

pub struct OrderSettlement<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for OrderSettlement<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> OrderSettlement<S>
where
    S: CatalogStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(
        skip(self, request),
        fields(
            product_id = %product_id,
            buyer = %buyer,
            bank_account_id = %request.bank_account_id,
            quantity = request.quantity
        ),
        err
    )]
    pub async fn place_order(&self, product_id: ProductId, buyer: UserId, request: PlaceOrder) -> ServiceResult<Order> {
        request.validate()?;

        let account = self
            .store
            .bank_account_by_id(request.bank_account_id)
            .await?
            .ok_or(DomainError::not_found("bank account"))?;
        let product = self
            .store
            .product_by_id(product_id)
            .await?
            .ok_or(DomainError::not_found("product"))?;

        let order = request.settle(OrderId::new(), buyer, &product, &account)?;

        let mut tx = self.store.begin().await?;
        let remaining_stock = match record(tx.as_mut(), &order).await {
            Ok(remaining) => remaining,
            Err(e) => return Err(abort(tx, e).await),
        };
        tx.commit().await?;

        info!(order_id = %order.id, remaining_stock, "order placed");
        Ok(order)
    }
}

async fn record(tx: &mut dyn CatalogTx, order: &Order) -> Result<i64, StoreError> {
    tx.insert_order(order).await?;
    tx.decrement_stock(order.product_id, order.quantity).await
}
