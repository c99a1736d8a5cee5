//! 领域服务层

pub mod account_service;
pub mod user_service;

pub use account_service::AccountService;
pub use user_service::UserService;
