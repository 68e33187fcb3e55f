pub mod driver;
pub mod event;
pub mod seed;
pub mod store;
