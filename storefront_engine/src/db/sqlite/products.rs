use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use super::SqliteDatabaseError;
use crate::db_types::{NewProduct, Product};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, SqliteDatabaseError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (title, price, stock, is_active, download_limit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        "#,
    )
    .bind(product.title)
    .bind(product.price.value())
    .bind(product.stock)
    .bind(product.is_active)
    .bind(product.download_limit)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, SqliteDatabaseError> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_products(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Product>, SqliteDatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM products WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    builder.push(") ORDER BY id ASC");
    let products = builder.build_query_as().fetch_all(conn).await?;
    Ok(products)
}

/// Records the sale of `quantity` units: the download total goes up and stock goes down, but never below zero.
pub async fn record_sale(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE products SET
                downloads = downloads + $1,
                stock = MAX(stock - $1, 0),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    trace!("🗃️ Sale of {quantity} x product #{product_id} recorded ({} rows)", result.rows_affected());
    Ok(())
}
