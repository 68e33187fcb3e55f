pub mod classify;
pub mod currency;
pub mod custodian;
pub mod holdings;
pub mod user;
