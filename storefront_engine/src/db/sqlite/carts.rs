use sqlx::SqliteConnection;

use super::SqliteDatabaseError;
use crate::db_types::CartItem;

pub async fn fetch_cart(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, SqliteDatabaseError> {
    let items = sqlx::query_as("SELECT * FROM carts WHERE buyer_id = $1 ORDER BY product_id ASC")
        .bind(buyer_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn add_to_cart(
    buyer_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<CartItem, SqliteDatabaseError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO carts (buyer_id, product_id, quantity) VALUES ($1, $2, $3)
            ON CONFLICT (buyer_id, product_id) DO UPDATE SET quantity = quantity + excluded.quantity
            RETURNING *
        "#,
    )
    .bind(buyer_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn clear_cart(buyer_id: i64, conn: &mut SqliteConnection) -> Result<u64, SqliteDatabaseError> {
    let result = sqlx::query("DELETE FROM carts WHERE buyer_id = $1").bind(buyer_id).execute(conn).await?;
    Ok(result.rows_affected())
}
