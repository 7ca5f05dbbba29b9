pub mod account_share;
pub mod account_share_domain;
pub mod init;
pub mod items;

pub use account_share::AccountShareService;
pub use items::ItemService;
