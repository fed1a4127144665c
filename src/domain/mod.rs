pub mod account;
pub mod audit;
pub mod error;
pub mod filter;
pub mod id;
pub mod location;
pub mod marketplace;
pub mod store;
pub mod suspension;
