use serde::{Deserialize, Serialize};

use bazaar_core::{BankAccountId, DomainError, DomainResult, Entity, OrderId, ProductId, UserId};
use bazaar_parties::BankAccount;
use bazaar_products::Product;

/// A placed order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub product_id: ProductId,
    pub bank_account_id: BankAccountId,
    pub payment_proof_image_url: String,
    pub quantity: i64,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn owner_id(&self) -> UserId {
        self.buyer_id
    }
}

/// Buyer's request to purchase a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub bank_account_id: BankAccountId,
    pub payment_proof_image_url: String,
    pub quantity: i64,
}

impl PlaceOrder {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity < 1 {
            return Err(DomainError::validation("quantity: must be greater than or equal to 1"));
        }
        if self.payment_proof_image_url.trim().is_empty() {
            return Err(DomainError::validation("paymentProofImageUrl: must not be blank"));
        }
        Ok(())
    }

    /// Run the purchase rules against freshly loaded records.
    ///
    /// Checks, in order: the account belongs to the seller, the buyer is not
    /// the seller, and stock covers the quantity. Passing the stock check here
    /// does not reserve anything; the decrement re-checks it when written.
    pub fn settle(
        self,
        order_id: OrderId,
        buyer_id: UserId,
        product: &Product,
        account: &BankAccount,
    ) -> DomainResult<Order> {
        self.validate()?;

        if account.owner_id != product.owner_id {
            return Err(DomainError::IncompatibleBankAccount);
        }
        if product.is_owned_by(buyer_id) {
            return Err(DomainError::SelfPurchaseForbidden);
        }
        if product.stock < self.quantity {
            return Err(DomainError::InsufficientStock {
                requested: self.quantity,
                available: product.stock,
            });
        }

        Ok(Order {
            id: order_id,
            buyer_id,
            product_id: product.id,
            bank_account_id: account.id,
            payment_proof_image_url: self.payment_proof_image_url,
            quantity: self.quantity,
        })
    }
}
