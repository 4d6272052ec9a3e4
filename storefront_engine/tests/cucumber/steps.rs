use std::time::Duration;

use cucumber::{then, when};
use sf_common::{Paise, Secret};
use storefront_engine::{
    db_types::BillingAddress,
    helpers::sign_payment,
    order_objects::{NewOrderRequest, OrderLine, PaymentReceipt, RefundOrderRequest},
    test_utils::webhooks::{payment_captured, payment_failed, refund_processed, signed},
    traits::RemotePaymentStatus,
    CartManagement,
    CatalogManagement,
};

use crate::cucumber::{
    store_world::{PAYMENT_SECRET, WEBHOOK_SECRET},
    StoreWorld,
};

#[when(expr = "buyer {int} orders {int} of {string}")]
async fn place_order(world: &mut StoreWorld, buyer_id: i64, quantity: i64, title: String) {
    let product_id = world.product(&title).id;
    let request = NewOrderRequest {
        buyer_id,
        items: vec![OrderLine::new(product_id, quantity)],
        billing_address: BillingAddress::new("Vikram Sethi", "vikram@example.com"),
    };
    let result = world.api().create_order(request).await;
    if let Some(created) = world.record(result) {
        world.checkout = Some(created);
    }
}

#[when(expr = "the gateway reports the payment as {word}")]
async fn gateway_payment(world: &mut StoreWorld, status: String) {
    let status = match status.as_str() {
        "captured" => RemotePaymentStatus::Captured,
        "authorized" => RemotePaymentStatus::Authorized,
        "failed" => RemotePaymentStatus::Failed,
        other => panic!("Unsupported payment status {other}"),
    };
    let remote_order_id = world.created().remote_order.id.clone();
    let pay_id = world.system().gateway.pay(&remote_order_id, status);
    world.remote_payment_id = Some(pay_id);
}

#[when("the gateway goes offline")]
async fn gateway_offline(world: &mut StoreWorld) {
    world.system().gateway.set_unavailable(true);
}

fn receipt(world: &StoreWorld, tampered: bool) -> PaymentReceipt {
    let created = world.created();
    let pay_id = world.remote_payment_id.clone().expect("No payment has been made");
    let signature = if tampered {
        "00".repeat(32)
    } else {
        sign_payment(&Secret::new(PAYMENT_SECRET.to_string()), &created.remote_order.id, &pay_id)
            .expect("Could not sign receipt")
    };
    PaymentReceipt {
        order_id: created.order.id,
        remote_order_id: created.remote_order.id.clone(),
        remote_payment_id: pay_id,
        signature,
    }
}

#[when(expr = "buyer {int} verifies the payment")]
async fn verify_payment(world: &mut StoreWorld, buyer_id: i64) {
    let receipt = receipt(world, false);
    let result = world.api().verify_payment(buyer_id, receipt).await;
    world.record(result);
}

#[when(expr = "buyer {int} verifies the payment with a tampered signature")]
async fn verify_tampered(world: &mut StoreWorld, buyer_id: i64) {
    let receipt = receipt(world, true);
    let result = world.api().verify_payment(buyer_id, receipt).await;
    world.record(result);
}

#[when("the payment captured webhook is delivered")]
async fn captured_webhook(world: &mut StoreWorld) {
    let pay_id = world.remote_payment_id.clone().expect("No payment has been made");
    let body = payment_captured(&pay_id, &world.created().remote_order.id);
    deliver(world, &body).await;
}

#[when("the payment failed webhook is delivered")]
async fn failed_webhook(world: &mut StoreWorld) {
    let body = payment_failed("pay_declined", &world.created().remote_order.id);
    deliver(world, &body).await;
}

#[when(expr = "a refund of {int} rupees is processed at the gateway")]
async fn refund_webhook(world: &mut StoreWorld, rupees: i64) {
    let pay_id = world.remote_payment_id.clone().expect("No payment has been made");
    let body = refund_processed("rfnd_dashboard01", &pay_id, Paise::from_rupees(rupees));
    deliver(world, &body).await;
}

async fn deliver(world: &mut StoreWorld, body: &str) {
    let (body, signature) = signed(body, WEBHOOK_SECRET);
    let result = world.api().process_webhook(body.as_bytes(), &signature).await;
    world.record(result);
}

#[when("the callback and the webhook arrive together")]
async fn race(world: &mut StoreWorld) {
    let pay_id = world.remote_payment_id.clone().expect("No payment has been made");
    let buyer_id = world.created().order.buyer_id;
    let (body, signature) = signed(&payment_captured(&pay_id, &world.created().remote_order.id), WEBHOOK_SECRET);
    let receipt = receipt(world, false);
    let api = world.api();
    let (callback, webhook) =
        tokio::join!(api.verify_payment(buyer_id, receipt), api.process_webhook(body.as_bytes(), &signature));
    callback.expect("Callback failed");
    webhook.expect("Webhook failed");
}

#[when(expr = "an admin refunds the order")]
async fn full_refund(world: &mut StoreWorld) {
    refund(world, RefundOrderRequest::default()).await;
}

#[when(expr = "an admin refunds {int} rupees of the order because {string}")]
async fn partial_refund(world: &mut StoreWorld, rupees: i64, reason: String) {
    refund(world, RefundOrderRequest { amount: Some(Paise::from_rupees(rupees)), reason: Some(reason) }).await;
}

async fn refund(world: &mut StoreWorld, request: RefundOrderRequest) {
    let id = world.created().order.id;
    let result = world.api().refund_order(id, request).await;
    world.record(result);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut StoreWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "the order is {word}")]
async fn check_state(world: &mut StoreWorld, state: String) {
    let order = world.current_order().await;
    assert_eq!(order.state(), state, "Order is in the wrong state");
    assert!(order.has_consistent_state());
}

#[then(expr = "the order total is {int} rupees")]
async fn check_total(world: &mut StoreWorld, rupees: i64) {
    let order = world.current_order().await;
    assert_eq!(order.total_amount, Paise::from_rupees(rupees));
}

#[then(expr = "the order has a refund of {int} rupees with reason {string}")]
async fn check_refund(world: &mut StoreWorld, rupees: i64, reason: String) {
    let order = world.current_order().await;
    assert_eq!(order.refund_amount, Some(Paise::from_rupees(rupees)));
    assert_eq!(order.refund_reason, Some(reason));
}

#[then(expr = "{string} has {int} in stock and {int} downloads")]
async fn check_stock(world: &mut StoreWorld, title: String, stock: i64, downloads: i64) {
    let id = world.product(&title).id;
    let product = world.system().db.fetch_product(id).await.expect("Error fetching product").expect("No product");
    assert_eq!(product.stock, stock, "Stock is incorrect");
    assert_eq!(product.downloads, downloads, "Download count is incorrect");
}

#[then(expr = "the cart of buyer {int} is empty")]
async fn check_cart_empty(world: &mut StoreWorld, buyer_id: i64) {
    let cart = world.system().db.fetch_cart(buyer_id).await.expect("Error fetching cart");
    assert!(cart.is_empty(), "Cart still has {} lines", cart.len());
}

#[then(expr = "the cart of buyer {int} has {int} lines")]
async fn check_cart(world: &mut StoreWorld, buyer_id: i64, lines: usize) {
    let cart = world.system().db.fetch_cart(buyer_id).await.expect("Error fetching cart");
    assert_eq!(cart.len(), lines);
}

#[then(expr = "the call fails with {string}")]
async fn check_error(world: &mut StoreWorld, message: String) {
    let err = world.last_error.as_ref().expect("The last call succeeded");
    assert!(err.to_string().contains(&message), "Unexpected error: {err}");
}

#[then("the call succeeds")]
async fn check_success(world: &mut StoreWorld) {
    assert!(world.last_error.is_none(), "The last call failed: {:?}", world.last_error);
}

#[then(expr = "buyer {int} has {int} orders")]
async fn check_order_count(world: &mut StoreWorld, buyer_id: i64, count: usize) {
    let orders = world.system().accounts.fetch_my_orders(buyer_id).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}

#[then(expr = "the order history has {int} entries")]
async fn check_history(world: &mut StoreWorld, count: usize) {
    let id = world.created().order.id;
    let history = world.system().accounts.fetch_status_history(id).await.expect("Error fetching history");
    assert_eq!(history.len(), count);
}
