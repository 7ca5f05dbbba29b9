pub mod account_share;
pub mod item;
pub mod stock_user;

pub use item::ItemRepository;
pub use stock_user::StockUserRepository;
