mod steps;
mod store_world;

pub use store_world::StoreWorld;
