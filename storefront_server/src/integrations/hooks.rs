//! Lifecycle hooks for the running server.
//!
//! Fulfilment of digital goods happens inside the payment transition itself (download counters and stock), so the
//! server's hooks only need to leave an audit trail in the log.
use log::*;
use storefront_engine::events::{EventHandlers, EventHooks, OrderAnnulledEvent, OrderPaidEvent, OrderRefundedEvent};

pub const EVENT_BUFFER_SIZE: usize = 25;

pub fn create_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev| {
            let OrderPaidEvent { order } = ev;
            info!(
                "📬️ Order {} paid by buyer #{}. {} line(s), {} {}",
                order.order_number,
                order.buyer_id,
                order.items.len(),
                order.total_amount,
                order.currency
            );
            Box::pin(async {})
        })
        .on_order_annulled(|ev| {
            let OrderAnnulledEvent { order, reason } = ev;
            info!("📬️ Order {} was annulled. Reason: {reason}", order.order_number);
            Box::pin(async {})
        })
        .on_order_refunded(|ev| {
            let OrderRefundedEvent { order } = ev;
            let amount = order.refund_amount.unwrap_or(order.total_amount);
            info!(
                "📬️ Order {} refunded ({amount}). Refund id: {}",
                order.order_number,
                order.remote_refund_id.as_deref().unwrap_or("unknown")
            );
            Box::pin(async {})
        });
    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}
