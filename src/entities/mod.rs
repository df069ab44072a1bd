pub mod inventory_batch;
pub mod location;
pub mod product;
pub mod stock_movement;
pub mod warehouse;
