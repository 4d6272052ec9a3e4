use crate::{db_types::CartItem, traits::LedgerError};

#[allow(async_fn_in_trait)]
pub trait CartManagement {
    async fn fetch_cart(&self, buyer_id: i64) -> Result<Vec<CartItem>, LedgerError>;

    /// Adds `quantity` of the product to the buyer's cart, creating the line if needed.
    async fn add_to_cart(&self, buyer_id: i64, product_id: i64, quantity: i64) -> Result<CartItem, LedgerError>;

    /// Empties the cart, returning the number of lines removed.
    async fn clear_cart(&self, buyer_id: i64) -> Result<u64, LedgerError>;
}
