use crate::{
    db_types::{NewProduct, Product},
    traits::LedgerError,
};

/// Read access to the product catalog, plus enough write access to seed it.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, LedgerError>;

    async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<Product>, LedgerError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, LedgerError>;
}
