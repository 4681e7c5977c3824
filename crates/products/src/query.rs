//! Catalog filters, sort and pagination.
//!
//! `ListProductsRequest` is the raw, string-typed query string. It is turned
//! into a normalized `CatalogQuery` once, at the edge; stores render or
//! evaluate the normalized form and never see raw parameters.

use core::cmp::Ordering;

use bazaar_core::{DomainError, DomainResult, UserId};

use crate::{Condition, Product, ProductTag};

pub const DEFAULT_LIMIT: i64 = 10;

/// Raw listing parameters as they arrive on the query string.
///
/// Every scalar is kept as text so that malformed values can be reported as
/// query construction failures instead of being silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListProductsRequest {
    pub user_only: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub tags: Vec<String>,
    pub condition: Option<String>,
    pub show_empty_stock: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort_by: Option<String>,
    pub order_by: Option<String>,
    pub search: Option<String>,
}

impl ListProductsRequest {
    /// Collect decoded query pairs. `tags` (or `tags[]`) may repeat; for the
    /// other keys the last occurrence wins. Unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut req = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "tags" | "tags[]" => req.tags.push(value),
                "userOnly" => req.user_only = Some(value),
                "limit" => req.limit = Some(value),
                "offset" => req.offset = Some(value),
                "condition" => req.condition = Some(value),
                "showEmptyStock" => req.show_empty_stock = Some(value),
                "minPrice" => req.min_price = Some(value),
                "maxPrice" => req.max_price = Some(value),
                "sortBy" => req.sort_by = Some(value),
                "orderBy" => req.order_by = Some(value),
                "search" => req.search = Some(value),
                _ => {}
            }
        }
        req
    }

    /// Whether the caller asked for their own listings only.
    pub fn wants_user_only(&self) -> DomainResult<bool> {
        parse_flag("userOnly", self.user_only.as_deref())
    }
}

/// Sortable product column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Price,
    #[default]
    CreatedAt,
}

impl SortField {
    /// Unrecognized input falls back to `CreatedAt`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("price") => SortField::Price,
            _ => SortField::CreatedAt,
        }
    }

    /// Column name in the `products` table.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Price => "price",
            SortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Unrecognized input falls back to `Desc`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Normalized catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Restrict to one seller's listings.
    pub owner: Option<UserId>,
    /// Product must carry at least one of these tags.
    pub tags: Vec<String>,
    pub condition: Option<Condition>,
    pub include_empty_stock: bool,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort: SortField,
    pub direction: SortDirection,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            owner: None,
            tags: Vec::new(),
            condition: None,
            include_empty_stock: false,
            min_price: None,
            max_price: None,
            sort: SortField::default(),
            direction: SortDirection::default(),
            search: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl CatalogQuery {
    /// Normalize raw parameters.
    ///
    /// `caller` is the authenticated user, if any; it is only consulted when
    /// `userOnly` is set.
    pub fn from_request(req: &ListProductsRequest, caller: Option<UserId>) -> DomainResult<Self> {
        let owner = if req.wants_user_only()? {
            Some(caller.ok_or_else(|| DomainError::query("userOnly: requires an authenticated caller"))?)
        } else {
            None
        };

        let condition = match non_empty(req.condition.as_deref()) {
            None => None,
            Some(raw) => Some(
                raw.parse::<Condition>()
                    .map_err(|_| DomainError::query(format!("condition: must be one of new, second (got '{raw}')")))?,
            ),
        };

        let min_price = parse_price("minPrice", req.min_price.as_deref())?;
        let max_price = parse_price("maxPrice", req.max_price.as_deref())?;
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(DomainError::query(format!(
                    "minPrice: must not exceed maxPrice ({min} > {max})"
                )));
            }
        }

        let limit = parse_int("limit", req.limit.as_deref())?.unwrap_or(0);
        let offset = parse_int("offset", req.offset.as_deref())?.unwrap_or(0);

        let mut tags: Vec<String> = Vec::with_capacity(req.tags.len());
        for tag in &req.tags {
            if !tag.is_empty() && !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        Ok(Self {
            owner,
            tags,
            condition,
            include_empty_stock: parse_flag("showEmptyStock", req.show_empty_stock.as_deref())?,
            min_price,
            max_price,
            sort: SortField::parse_lenient(req.sort_by.as_deref()),
            direction: SortDirection::parse_lenient(req.order_by.as_deref()),
            search: non_empty(req.search.as_deref()).map(str::to_string),
            limit: if limit <= 0 { DEFAULT_LIMIT } else { limit },
            offset: offset.max(0),
        })
    }

    /// Evaluate the filter against one product and its tag rows.
    ///
    /// Soft-deleted products are never handed in, so there is no check here.
    pub fn matches(&self, product: &Product, tags: &[ProductTag]) -> bool {
        if let Some(owner) = self.owner {
            if product.owner_id != owner {
                return false;
            }
        }
        if !self.tags.is_empty() && !tags.iter().any(|t| self.tags.contains(&t.tag)) {
            return false;
        }
        if let Some(condition) = self.condition {
            if product.condition != condition {
                return false;
            }
        }
        if !self.include_empty_stock && product.stock <= 0 {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if let Some(search) = &self.search {
            if !product.name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Page ordering: the sort column, then id as a tiebreaker, both in the
    /// requested direction.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self.sort {
            SortField::Price => a.price.cmp(&b.price),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let ordering = primary.then_with(|| a.id.cmp(&b.id));
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.is_empty())
}

fn parse_flag(field: &str, raw: Option<&str>) -> DomainResult<bool> {
    match non_empty(raw).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(DomainError::query(format!("{field}: expected a boolean (got '{other}')"))),
    }
}

fn parse_int(field: &str, raw: Option<&str>) -> DomainResult<Option<i64>> {
    match non_empty(raw) {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| DomainError::query(format!("{field}: expected an integer (got '{s}')"))),
    }
}

fn parse_price(field: &str, raw: Option<&str>) -> DomainResult<Option<i64>> {
    let value = parse_int(field, raw)?;
    if let Some(v) = value {
        if v < 0 {
            return Err(DomainError::query(format!("{field}: must be greater than or equal to 0")));
        }
    }
    Ok(value)
}
