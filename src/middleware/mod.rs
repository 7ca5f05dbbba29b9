pub mod security_headers;
pub mod stock_user;

pub use stock_user::StockContext;
