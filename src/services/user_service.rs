//! 当前用户服务

use crate::error::{ClientError, Result};
use crate::http::ApiRequest;
use crate::models::{ChangePasswordRequest, ChangeUsernameRequest, NewUser, User};
use crate::services::AccountService;
use crate::session::SessionManager;
use std::sync::Arc;
use validator::Validate;

pub struct UserService {
    session: Arc<SessionManager>,
    accounts: Arc<AccountService>,
}

impl UserService {
    pub fn new(session: Arc<SessionManager>, accounts: Arc<AccountService>) -> Self {
        Self { session, accounts }
    }

    /// 当前登录用户
    pub async fn get_user(&self) -> Result<User> {
        self.session.check_authentication()?;
        self.session.requests().get("/user").await
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        self.session.check_authentication()?;
        let body = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.session
            .requests()
            .post("/user/update/password", &body)
            .await
    }

    pub async fn change_username(&self, username: &str) -> Result<()> {
        self.session.check_authentication()?;
        let body = ChangeUsernameRequest {
            username: username.to_string(),
        };
        self.session
            .requests()
            .post("/user/update/username", &body)
            .await
    }

    /// 用户名是否已被占用
    pub async fn check_username_exists(&self, username: &str) -> Result<bool> {
        self.session.check_authentication()?;
        let request = ApiRequest::get("/user/check").param("username", username);
        self.session.requests().send(request).await
    }

    /// 更新个人资料，走账户更新接口
    pub async fn update(&self, user: &User) -> Result<User> {
        self.session.check_authentication()?;
        self.accounts.update(user).await
    }

    /// 注册新账户，无需登录
    pub async fn register(&self, user: &NewUser) -> Result<User> {
        user.validate().map_err(|e| ClientError::validation(&e))?;
        self.session.requests().put("/registration", user).await
    }
}
