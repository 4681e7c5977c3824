//! SQL rendering of a normalized `CatalogQuery`.
//!
//! Every user-supplied value is bound. Only the whitelisted sort column and
//! direction keyword are spliced into the text.

use sqlx::{Postgres, QueryBuilder};

use bazaar_products::CatalogQuery;

const PRODUCT_COLUMNS: &str = "p.id, p.user_id, p.name, p.price, p.image_url, p.stock, p.condition, p.is_purchasable, p.created_at";

/// Append the filtered base query (no ordering, no pagination).
fn push_base<'q>(qb: &mut QueryBuilder<'q, Postgres>, query: &'q CatalogQuery) {
    qb.push("SELECT DISTINCT ");
    qb.push(PRODUCT_COLUMNS);
    qb.push(" FROM products p");
    if !query.tags.is_empty() {
        qb.push(" INNER JOIN product_tags pt ON pt.product_id = p.id");
    }
    qb.push(" WHERE p.deleted_at IS NULL");

    if let Some(owner) = query.owner {
        qb.push(" AND p.user_id = ").push_bind(*owner.as_uuid());
    }
    if !query.tags.is_empty() {
        qb.push(" AND pt.tag = ANY(").push_bind(&query.tags).push(")");
    }
    if let Some(condition) = query.condition {
        qb.push(" AND p.condition = ").push_bind(condition.as_str());
    }
    if !query.include_empty_stock {
        qb.push(" AND p.stock > 0");
    }
    if let Some(min) = query.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(search) = &query.search {
        qb.push(" AND p.name ILIKE '%' || ")
            .push_bind(escape_like(search))
            .push(" || '%'");
    }
}

/// `SELECT COUNT(*)` over the filtered base query.
pub fn count_query(query: &CatalogQuery) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM (");
    push_base(&mut qb, query);
    qb.push(") AS filtered");
    qb
}

/// The filtered base query, ordered and paginated.
pub fn page_query(query: &CatalogQuery) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new("");
    push_base(&mut qb, query);

    let dir = query.direction.keyword();
    qb.push(format!(" ORDER BY p.{} {dir}, p.id {dir}", query.sort.column()));
    qb.push(" LIMIT ").push_bind(query.limit);
    qb.push(" OFFSET ").push_bind(query.offset);
    qb
}

/// Make `%`, `_` and `\` match literally inside an ILIKE pattern.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
