use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateLength, ValidateUrl, ValidationError, ValidationErrors};

use bazaar_core::BankAccountId;
use bazaar_infra::PageMeta;
use bazaar_parties::BankAccountDraft;
use bazaar_products::{Condition, Patch, ProductDraft, ProductPatch};
use bazaar_sales::PlaceOrder;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 5, max = 60, message = "must be 5 to 60 characters"))]
    pub name: String,
    #[validate(range(min = 0, message = "must be greater than or equal to 0"))]
    pub price: i64,
    #[validate(url(message = "must be a valid url"))]
    pub image_url: String,
    #[validate(range(min = 0, message = "must be greater than or equal to 0"))]
    pub stock: i64,
    pub condition: Condition,
    pub tags: Vec<String>,
    pub is_purchasable: bool,
}

impl CreateProductRequest {
    pub fn into_draft(self) -> ProductDraft {
        ProductDraft {
            name: self.name,
            price: self.price,
            image_url: self.image_url,
            stock: self.stock,
            condition: self.condition,
            tags: self.tags,
            is_purchasable: self.is_purchasable,
        }
    }
}

/// Partial update. Omitted fields are left as they are; `tags`, when sent,
/// replaces the whole tag set.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProductRequest {
    pub name: Patch<String>,
    pub price: Patch<i64>,
    pub image_url: Patch<String>,
    pub condition: Patch<Condition>,
    pub is_purchasable: Patch<bool>,
    pub tags: Patch<Vec<String>>,
}

impl Validate for UpdateProductRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Patch::Set(name) = &self.name {
            if !name.validate_length(Some(5), Some(60), None) {
                errors.add("name", invalid("length", "must be 5 to 60 characters"));
            }
        }
        if let Patch::Set(price) = self.price {
            if price < 0 {
                errors.add("price", invalid("range", "must be greater than or equal to 0"));
            }
        }
        if let Patch::Set(url) = &self.image_url {
            if !url.validate_url() {
                errors.add("image_url", invalid("url", "must be a valid url"));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> ProductPatch {
        ProductPatch {
            name: self.name,
            price: self.price,
            image_url: self.image_url,
            condition: self.condition,
            is_purchasable: self.is_purchasable,
            tags: self.tags,
        }
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStockRequest {
    #[validate(range(min = 0, message = "must be greater than or equal to 0"))]
    pub stock: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BuyProductRequest {
    pub bank_account_id: BankAccountId,
    #[validate(url(message = "must be a valid url"))]
    pub payment_proof_image_url: String,
    #[validate(range(min = 1, message = "must be greater than or equal to 1"))]
    pub quantity: i64,
}

impl From<BuyProductRequest> for PlaceOrder {
    fn from(body: BuyProductRequest) -> Self {
        PlaceOrder {
            bank_account_id: body.bank_account_id,
            payment_proof_image_url: body.payment_proof_image_url,
            quantity: body.quantity,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountRequest {
    #[validate(length(min = 5, max = 15, message = "must be 5 to 15 characters"))]
    pub bank_name: String,
    #[validate(length(min = 5, max = 15, message = "must be 5 to 15 characters"))]
    pub bank_account_name: String,
    #[validate(length(min = 5, max = 15, message = "must be 5 to 15 characters"))]
    pub bank_account_number: String,
}

impl From<BankAccountRequest> for BankAccountDraft {
    fn from(body: BankAccountRequest) -> Self {
        BankAccountDraft {
            bank_name: body.bank_name,
            account_name: body.bank_account_name,
            account_number: body.bank_account_number,
        }
    }
}

// -------------------------
// Response envelope
// -------------------------

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(message: &'static str, data: T) -> Self {
        Self {
            message,
            data: Some(data),
            meta: None,
        }
    }

    pub fn page(message: &'static str, data: T, meta: PageMeta) -> Self {
        Self {
            message,
            data: Some(data),
            meta: Some(meta),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: &'static str) -> Self {
        Self {
            message,
            data: None,
            meta: None,
        }
    }
}
