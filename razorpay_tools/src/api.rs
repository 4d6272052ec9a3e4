use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::RazorpayConfig,
    data_objects::ErrorResponse,
    NewRazorpayOrder,
    NewRazorpayRefund,
    RazorpayApiError,
    RazorpayOrder,
    RazorpayPayment,
    RazorpayRefund,
};

#[derive(Clone)]
pub struct RazorpayApi {
    config: RazorpayConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for RazorpayApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RazorpayApi ({}, key {})", self.config.base_url, self.config.key_id)
    }
}

impl RazorpayApi {
    pub fn new(config: RazorpayConfig) -> Result<Self, RazorpayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| RazorpayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, RazorpayApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req =
            self.client.request(method, url).basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            trace!("💳️ REST query successful. {status}");
            return response.json::<T>().await.map_err(|e| RazorpayApiError::JsonError(e.to_string()));
        }
        let text = response.text().await?;
        let message = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(e) => format!("{}: {}", e.error.code, e.error.description),
            Err(_) => text,
        };
        Err(RazorpayApiError::QueryError { status: status.as_u16(), message })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    pub async fn create_order(&self, order: &NewRazorpayOrder) -> Result<RazorpayOrder, RazorpayApiError> {
        debug!("💳️ Creating gateway order for receipt {} ({})", order.receipt, order.amount);
        let result = self.rest_query::<RazorpayOrder, _>(Method::POST, "/orders", Some(order)).await?;
        info!("💳️ Created gateway order {} for receipt {}", result.id, order.receipt);
        Ok(result)
    }

    pub async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment, RazorpayApiError> {
        let path = format!("/payments/{payment_id}");
        debug!("💳️ Fetching payment {payment_id}");
        let result = self.rest_query::<RazorpayPayment, ()>(Method::GET, &path, None).await?;
        debug!("💳️ Payment {payment_id} is {}", result.status);
        Ok(result)
    }

    pub async fn refund_payment(
        &self,
        payment_id: &str,
        refund: &NewRazorpayRefund,
    ) -> Result<RazorpayRefund, RazorpayApiError> {
        let path = format!("/payments/{payment_id}/refund");
        debug!("💳️ Refunding {} of payment {payment_id}", refund.amount);
        let result = self.rest_query::<RazorpayRefund, _>(Method::POST, &path, Some(refund)).await?;
        info!("💳️ Refund {} of {} issued for payment {payment_id}", result.id, result.amount);
        Ok(result)
    }
}
