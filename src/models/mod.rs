//! 数据模型模块

pub mod auth;
pub mod page;
pub mod user;

pub use auth::{AuthResponse, LoginParams};
pub use page::{Page, PageQuery, Pageable, SortInfo};
pub use user::{ChangePasswordRequest, ChangeUsernameRequest, NewUser, SetPasswordRequest, User};
