//! 账户服务：账户列表、详情、修改与删除
//!
//! 每个操作先做本地认证检查，再发出恰好一个请求。

use crate::error::Result;
use crate::models::{Page, PageQuery, SetPasswordRequest, User};
use crate::session::SessionManager;
use std::fmt::Display;
use std::sync::Arc;

pub struct AccountService {
    session: Arc<SessionManager>,
}

impl AccountService {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// 全部账户
    pub async fn list(&self) -> Result<Vec<User>> {
        self.session.check_authentication()?;
        self.session.requests().get("/accounts").await
    }

    pub async fn get_by_id(&self, id: impl Display) -> Result<User> {
        self.session.check_authentication()?;
        self.session.requests().get(&format!("/accounts/{id}")).await
    }

    pub async fn update(&self, user: &User) -> Result<User> {
        self.session.check_authentication()?;
        self.session
            .requests()
            .post(&format!("/accounts/{}/update", user.id), user)
            .await
    }

    /// 管理员为指定账户设置新密码
    pub async fn change_password(&self, id: impl Display, new_password: &str) -> Result<User> {
        self.session.check_authentication()?;
        let body = SetPasswordRequest {
            new_password: new_password.to_string(),
        };
        self.session
            .requests()
            .post(&format!("/accounts/{id}/password"), &body)
            .await
    }

    pub async fn delete(&self, id: impl Display) -> Result<()> {
        self.session.check_authentication()?;
        self.session
            .requests()
            .delete(&format!("/accounts/{id}"))
            .await
    }

    /// 分页查询账户
    pub async fn get_page(&self, query: &PageQuery) -> Result<Page<User>> {
        self.session.check_authentication()?;
        self.session
            .requests()
            .get_with("/accounts/page", query)
            .await
    }

    /// 生成测试账户（仅调试用）
    pub async fn add_test_accounts(&self) -> Result<()> {
        self.session.check_authentication()?;
        self.session.requests().get("/accounts/create_test").await
    }
}
