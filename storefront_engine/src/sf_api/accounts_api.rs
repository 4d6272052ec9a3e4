//! Read access to orders for buyers and admins, plus download entitlements.

use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::{debug, trace};

use crate::{
    db_types::{Order, PaymentStatus, Session, StatusHistoryEntry},
    sf_api::{errors::OrderFlowError, order_objects::DownloadGrant},
    traits::{DownloadClaim, OrderLedger, OrderPage, Pagination},
};

/// How long a download link handed out by [`AccountApi::claim_download`] stays valid.
pub const DOWNLOAD_LINK_VALIDITY_HOURS: i64 = 24;

pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: OrderLedger
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches an order on behalf of the session holder. Buyers may only see their own orders; admins may see any.
    pub async fn fetch_order(&self, session: &Session, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if !order.is_owned_by(session.buyer_id) && !session.is_admin() {
            return Err(OrderFlowError::NotOrderOwner);
        }
        Ok(order)
    }

    /// All of the buyer's orders, newest first.
    pub async fn fetch_my_orders(&self, buyer_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_orders_for_buyer(buyer_id).await?;
        trace!("Buyer #{buyer_id} has {} orders", orders.len());
        Ok(orders)
    }

    pub async fn fetch_all_orders(&self, pagination: Pagination) -> Result<OrderPage, OrderFlowError> {
        let page = self.db.fetch_orders(pagination).await?;
        Ok(page)
    }

    pub async fn fetch_status_history(&self, order_id: i64) -> Result<Vec<StatusHistoryEntry>, OrderFlowError> {
        let history = self.db.fetch_status_history(order_id).await?;
        Ok(history)
    }

    /// Uses up one download of a product the buyer has paid for.
    pub async fn claim_download(
        &self,
        buyer_id: i64,
        order_id: i64,
        product_id: i64,
    ) -> Result<DownloadGrant, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if !order.is_owned_by(buyer_id) {
            return Err(OrderFlowError::NotOrderOwner);
        }
        if order.payment_status != PaymentStatus::Paid {
            return Err(OrderFlowError::OrderNotPaid);
        }
        match self.db.record_download(order_id, product_id).await? {
            DownloadClaim::Granted(item) => {
                debug!("Download of product #{product_id} granted for {}", order.order_number);
                Ok(DownloadGrant {
                    product_id,
                    title: item.title.clone(),
                    downloads_remaining: item.downloads_remaining(),
                    expires_at: Utc::now() + Duration::hours(DOWNLOAD_LINK_VALIDITY_HOURS),
                })
            },
            DownloadClaim::LimitReached(_) => Err(OrderFlowError::DownloadLimitReached),
            DownloadClaim::NotInOrder => Err(OrderFlowError::ProductNotInOrder(product_id)),
        }
    }
}
