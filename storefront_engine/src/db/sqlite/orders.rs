//! Sqlite operations on the `orders` and `order_items` tables.
//!
//! The lifecycle updates (`mark_*`) are conditional on the current `payment_status` and report whether they changed a
//! row. Callers are expected to run them inside a transaction together with the side effects that belong to them.
use chrono::{DateTime, Utc};
use log::{debug, trace};
use sf_common::Paise;
use sqlx::{FromRow, QueryBuilder, SqliteConnection};

use super::SqliteDatabaseError;
use crate::db_types::{
    BillingAddress,
    LineItem,
    NewLineItem,
    NewOrder,
    Order,
    OrderNumber,
    RefundRecord,
    StatusHistoryEntry,
};

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    buyer_id: i64,
    total_amount: i64,
    currency: String,
    status: String,
    payment_status: String,
    billing_name: String,
    billing_email: String,
    billing_phone: Option<String>,
    billing_address: Option<String>,
    billing_city: Option<String>,
    billing_state: Option<String>,
    billing_zip_code: Option<String>,
    billing_country: String,
    remote_order_id: Option<String>,
    remote_payment_id: Option<String>,
    remote_refund_id: Option<String>,
    refund_amount: Option<i64>,
    refund_reason: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, items: Vec<LineItem>) -> Result<Order, SqliteDatabaseError> {
        let billing_address = BillingAddress {
            name: self.billing_name,
            email: self.billing_email,
            phone: self.billing_phone,
            address: self.billing_address,
            city: self.billing_city,
            state: self.billing_state,
            zip_code: self.billing_zip_code,
            country: self.billing_country,
        };
        Ok(Order {
            id: self.id,
            order_number: OrderNumber(self.order_number),
            buyer_id: self.buyer_id,
            items,
            total_amount: Paise::from(self.total_amount),
            currency: self.currency,
            status: self.status.parse()?,
            payment_status: self.payment_status.parse()?,
            billing_address,
            remote_order_id: self.remote_order_id,
            remote_payment_id: self.remote_payment_id,
            remote_refund_id: self.remote_refund_id,
            refund_amount: self.refund_amount.map(Paise::from),
            refund_reason: self.refund_reason,
            note: self.note,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct StatusHistoryRow {
    id: i64,
    order_id: i64,
    status: String,
    payment_status: String,
    recorded_at: DateTime<Utc>,
}

/// The unique keys an order can be looked up by.
#[derive(Debug, Clone, Copy)]
pub enum OrderKey<'a> {
    Id(i64),
    OrderNumber(&'a OrderNumber),
    RemoteOrderId(&'a str),
    RemotePaymentId(&'a str),
    RemoteRefundId(&'a str),
}

/// Inserts the order header and its line items. This is not atomic on its own; pass `&mut *tx` to embed the call in a
/// transaction.
///
/// A collision on the order number is reported as [`SqliteDatabaseError::DuplicateOrderNumber`] so that the caller
/// can retry with a fresh number.
pub async fn insert_order(
    order: &NewOrder,
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let addr = &order.billing_address;
    let result = sqlx::query(
        r#"
            INSERT INTO orders (
                order_number,
                buyer_id,
                total_amount,
                currency,
                billing_name,
                billing_email,
                billing_phone,
                billing_address,
                billing_city,
                billing_state,
                billing_zip_code,
                billing_country
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(order_number.as_str())
    .bind(order.buyer_id)
    .bind(order.total_amount.value())
    .bind(&order.currency)
    .bind(&addr.name)
    .bind(&addr.email)
    .bind(&addr.phone)
    .bind(&addr.address)
    .bind(&addr.city)
    .bind(&addr.state)
    .bind(&addr.zip_code)
    .bind(&addr.country)
    .execute(&mut *conn)
    .await;
    let id = match result {
        Ok(r) => r.last_insert_rowid(),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(SqliteDatabaseError::DuplicateOrderNumber(order_number.as_str().to_string()));
        },
        Err(e) => return Err(e.into()),
    };
    for item in &order.items {
        insert_line_item(id, item, conn).await?;
    }
    debug!("📝️ Order {order_number} inserted with id {id} and {} line items", order.items.len());
    Ok(id)
}

async fn insert_line_item(
    order_id: i64,
    item: &NewLineItem,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO order_items (order_id, product_id, title, unit_price, quantity, download_limit)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(&item.title)
    .bind(item.unit_price.value())
    .bind(item.quantity)
    .bind(item.download_limit)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_line_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, SqliteDatabaseError> {
    let items = sqlx::query_as(
        r#"
            SELECT id, product_id, title, unit_price, quantity, download_count, download_limit
            FROM order_items WHERE order_id = $1 ORDER BY id ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn fetch_order(key: OrderKey<'_>, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE ");
    match key {
        OrderKey::Id(id) => builder.push("id = ").push_bind(id),
        OrderKey::OrderNumber(n) => builder.push("order_number = ").push_bind(n.as_str()),
        OrderKey::RemoteOrderId(s) => builder.push("remote_order_id = ").push_bind(s),
        OrderKey::RemotePaymentId(s) => builder.push("remote_payment_id = ").push_bind(s),
        OrderKey::RemoteRefundId(s) => builder.push("remote_refund_id = ").push_bind(s),
    };
    builder.push(" ORDER BY id DESC LIMIT 1");
    let row: Option<OrderRow> = builder.build_query_as().fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => {
            let items = fetch_line_items(row.id, conn).await?;
            Ok(Some(row.into_order(items)?))
        },
        None => Ok(None),
    }
}

async fn hydrate(rows: Vec<OrderRow>, conn: &mut SqliteConnection) -> Result<Vec<Order>, SqliteDatabaseError> {
    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let items = fetch_line_items(row.id, conn).await?;
        orders.push(row.into_order(items)?);
    }
    Ok(orders)
}

/// Fetches all orders for the buyer, newest first.
pub async fn fetch_orders_for_buyer(
    buyer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let rows: Vec<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(buyer_id)
        .fetch_all(&mut *conn)
        .await?;
    hydrate(rows, conn).await
}

/// Fetches a window of all orders, newest first.
pub async fn fetch_orders(
    limit: i64,
    offset: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let rows: Vec<OrderRow> = sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2")
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;
    trace!("📝️ Fetched {} orders (limit {limit}, offset {offset})", rows.len());
    hydrate(rows, conn).await
}

pub async fn count_orders(conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(conn).await?;
    Ok(count)
}

/// Deletes the order. Line items and history rows go with it.
pub async fn delete_order(id: i64, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(id).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM order_status_history WHERE order_id = $1").bind(id).execute(&mut *conn).await?;
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_remote_order_id(
    id: i64,
    remote_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result =
        sqlx::query("UPDATE orders SET remote_order_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(remote_order_id)
            .bind(id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() == 1)
}

/// `pending` → `completed/paid`. Returns `false` if the order was not pending.
pub async fn mark_paid(
    id: i64,
    remote_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                status = 'completed',
                payment_status = 'paid',
                remote_payment_id = $1,
                completed_at = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND payment_status = 'pending'
        "#,
    )
    .bind(remote_payment_id)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// `pending` → `cancelled/failed`. Returns `false` if the order was not pending.
pub async fn mark_failed(id: i64, reason: &str, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                status = 'cancelled',
                payment_status = 'failed',
                note = $1,
                cancelled_at = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND payment_status = 'pending'
        "#,
    )
    .bind(reason)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// `paid` → `refunded/refunded`. Returns `false` if the order was not paid.
pub async fn mark_refunded(
    id: i64,
    refund: &RefundRecord,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                status = 'refunded',
                payment_status = 'refunded',
                remote_refund_id = $1,
                refund_amount = $2,
                refund_reason = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND payment_status = 'paid'
        "#,
    )
    .bind(&refund.remote_refund_id)
    .bind(refund.amount.value())
    .bind(&refund.reason)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Increments the download counter for a line item if it is below its limit. Returns `false` if the limit had
/// already been reached or the item does not exist.
pub async fn increment_download(
    order_id: i64,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE order_items SET download_count = download_count + 1
            WHERE order_id = $1 AND product_id = $2 AND download_count < download_limit
        "#,
    )
    .bind(order_id)
    .bind(product_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_status_history(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusHistoryEntry>, SqliteDatabaseError> {
    let rows: Vec<StatusHistoryRow> =
        sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
            .bind(order_id)
            .fetch_all(conn)
            .await?;
    rows.into_iter()
        .map(|r| -> Result<StatusHistoryEntry, SqliteDatabaseError> {
            Ok(StatusHistoryEntry {
                id: r.id,
                order_id: r.order_id,
                status: r.status.parse()?,
                payment_status: r.payment_status.parse()?,
                recorded_at: r.recorded_at,
            })
        })
        .collect()
}
