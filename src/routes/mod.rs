pub mod account_share;
pub mod auth;
pub mod health;
pub mod items;
