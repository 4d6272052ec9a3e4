use mockall::mock;
use storefront_engine::{
    traits::{MintOrderRequest, RefundRequest, RemoteOrder, RemotePayment, RemoteRefund},
    GatewayError,
    PaymentGateway,
};

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn mint_order(&self, request: MintOrderRequest) -> Result<RemoteOrder, GatewayError>;
        async fn fetch_payment(&self, remote_payment_id: &str) -> Result<RemotePayment, GatewayError>;
        async fn refund(&self, request: RefundRequest) -> Result<RemoteRefund, GatewayError>;
    }
}
