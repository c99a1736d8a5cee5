//! 账户管理客户端库
//! 会话管理、认证请求与账户/用户服务

pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod services;
pub mod session;
pub mod shell;
pub mod storage;
pub mod telemetry;

pub use error::{ClientError, Result};
pub use session::SessionManager;
pub use shell::AppShell;
