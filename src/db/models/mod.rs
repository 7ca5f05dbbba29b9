//! Database models split into separate files.
//! Types are re-exported so callers can `use crate::db::models::*;`.

pub mod account_share;
pub mod item;
pub mod stock_user;

pub use self::account_share::*;
pub use self::item::*;
pub use self::stock_user::*;
