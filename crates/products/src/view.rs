//! Read-facing product and detail views.
//!
//! Pure assembly: callers fetch the pieces (product, tag rows, seller profile,
//! purchase counts, bank accounts) and these constructors only shape them.

use serde::Serialize;

use bazaar_core::{BankAccountId, ProductId};
use bazaar_parties::{BankAccount, UserProfile};

use crate::{Condition, Product, ProductTag};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub product_id: ProductId,
    pub name: String,
    pub price: i64,
    pub image_url: String,
    pub stock: i64,
    pub condition: Condition,
    pub tags: Vec<String>,
    pub is_purchasable: bool,
    pub purchase_count: i64,
}

impl ProductView {
    pub fn new(product: &Product, tags: Vec<String>, purchase_count: i64) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            stock: product.stock,
            condition: product.condition,
            tags,
            is_purchasable: product.is_purchasable,
            purchase_count,
        }
    }

    /// Build from stored tag rows.
    pub fn from_rows(product: &Product, tags: &[ProductTag], purchase_count: i64) -> Self {
        Self::new(product, tag_texts(tags), purchase_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountView {
    pub bank_account_id: BankAccountId,
    pub bank_name: String,
    pub bank_account_name: String,
    pub bank_account_number: String,
}

impl From<&BankAccount> for BankAccountView {
    fn from(account: &BankAccount) -> Self {
        Self {
            bank_account_id: account.id,
            bank_name: account.bank_name.clone(),
            bank_account_name: account.account_name.clone(),
            bank_account_number: account.account_number.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerView {
    pub name: String,
    /// Units sold across all of the seller's products.
    pub product_sold_total: i64,
    pub bank_accounts: Vec<BankAccountView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailView {
    pub product: ProductView,
    pub seller: SellerView,
}

impl ProductDetailView {
    pub fn new(
        product: ProductView,
        seller: &UserProfile,
        product_sold_total: i64,
        bank_accounts: &[BankAccount],
    ) -> Self {
        Self {
            product,
            seller: SellerView {
                name: seller.display_name.clone(),
                product_sold_total,
                bank_accounts: bank_accounts.iter().map(BankAccountView::from).collect(),
            },
        }
    }
}

/// Tag texts in row order.
pub fn tag_texts(tags: &[ProductTag]) -> Vec<String> {
    tags.iter().map(|t| t.tag.clone()).collect()
}
