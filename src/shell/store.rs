//! 内存中的应用状态

use crate::models::User;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct AppStore {
    user: RwLock<Option<User>>,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换当前用户
    pub fn set_user(&self, user: User) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
    }

    pub fn clear_user(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn has_user(&self) -> bool {
        self.user.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}
