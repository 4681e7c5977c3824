use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use bazaar_core::{DomainError, DomainResult, Entity, ProductId, UserId};

/// Physical condition of the listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    New,
    Second,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Second => "second",
        }
    }
}

impl core::fmt::Display for Condition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Condition::New),
            "second" => Ok(Condition::Second),
            other => Err(DomainError::validation(format!(
                "condition: must be one of new, second (got '{other}')"
            ))),
        }
    }
}

/// A product listing as stored (soft-deleted rows are never materialized).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub owner_id: UserId,
    pub name: String,
    /// Price in smallest currency unit.
    pub price: i64,
    pub image_url: String,
    pub stock: i64,
    pub condition: Condition,
    pub is_purchasable: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

/// A tag row attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductTag {
    /// Storage sequence id.
    pub id: i64,
    pub product_id: ProductId,
    pub tag: String,
}

/// Everything needed to list a new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub price: i64,
    pub image_url: String,
    pub stock: i64,
    pub condition: Condition,
    pub tags: Vec<String>,
    pub is_purchasable: bool,
}

impl ProductDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name: must not be blank"));
        }
        ensure_non_negative("price", self.price)?;
        ensure_non_negative("stock", self.stock)?;
        Ok(())
    }

    /// Split the draft into the product row and its initial tag texts.
    pub fn into_parts(self, id: ProductId, owner_id: UserId, now: DateTime<Utc>) -> (Product, Vec<String>) {
        let product = Product {
            id,
            owner_id,
            name: self.name,
            price: self.price,
            image_url: self.image_url,
            stock: self.stock,
            condition: self.condition,
            is_purchasable: self.is_purchasable,
            created_at: now,
        };
        (product, self.tags)
    }
}

/// Optional patch field: distinguishes "omitted" from "set to a value".
///
/// Use with `#[serde(default)]` so an omitted JSON field becomes `Absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Patch::Absent => None,
            Patch::Set(v) => Some(v),
        }
    }

    /// Overwrite `target` when a value is present.
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Set(v) = self {
            *target = v;
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

/// Changes to a listing's descriptive fields, purchasability and tags.
///
/// Stock is deliberately absent: it only moves through the stock endpoint
/// and order settlement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductPatch {
    pub name: Patch<String>,
    pub price: Patch<i64>,
    pub image_url: Patch<String>,
    pub condition: Patch<Condition>,
    pub is_purchasable: Patch<bool>,
    pub tags: Patch<Vec<String>>,
}

impl ProductPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Patch::Set(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name: must not be blank"));
            }
        }
        if let Patch::Set(price) = self.price {
            ensure_non_negative("price", price)?;
        }
        Ok(())
    }

    /// Apply field changes to `product` and hand back the desired tag set, if any.
    pub fn apply(self, product: &mut Product) -> Option<Vec<String>> {
        self.name.apply_to(&mut product.name);
        self.price.apply_to(&mut product.price);
        self.image_url.apply_to(&mut product.image_url);
        self.condition.apply_to(&mut product.condition);
        self.is_purchasable.apply_to(&mut product.is_purchasable);
        self.tags.into_option()
    }
}

fn ensure_non_negative(field: &str, value: i64) -> DomainResult<()> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field}: must be greater than or equal to 0")));
    }
    Ok(())
}
