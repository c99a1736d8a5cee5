//! 应用外壳：状态、路由与启动预加载

pub mod notify;
pub mod router;
pub mod store;

pub use notify::{LogNotifier, NoticeLevel, Notifier};
pub use router::{Navigation, Route, RouteDef, Router, ROUTES};
pub use store::AppStore;

use crate::config::AppConfig;
use crate::error::Result;
use crate::http::RequestService;
use crate::models::User;
use crate::services::{AccountService, UserService};
use crate::session::SessionManager;
use crate::storage::StorageService;
use std::sync::Arc;

/// 启动时构建一次，之后以引用共享
pub struct AppShell {
    pub session: Arc<SessionManager>,
    pub accounts: Arc<AccountService>,
    pub users: Arc<UserService>,
    pub store: Arc<AppStore>,
    pub router: Router,
    notifier: Arc<dyn Notifier>,
}

impl AppShell {
    pub fn new(session: Arc<SessionManager>, notifier: Arc<dyn Notifier>, public_path: &str) -> Self {
        let accounts = Arc::new(AccountService::new(session.clone()));
        let users = Arc::new(UserService::new(session.clone(), accounts.clone()));
        let store = Arc::new(AppStore::new());
        let router = Router::new(session.clone(), notifier.clone(), public_path);

        {
            let notifier = notifier.clone();
            session.set_unauthorized_handler(move |message| notifier.warning(message));
        }

        Self {
            session,
            accounts,
            users,
            store,
            router,
            notifier,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        storage: StorageService,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let requests = RequestService::from_config(config)?;
        let session = Arc::new(SessionManager::new(requests, storage));
        Ok(Self::new(session, notifier, &config.api.public_path))
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// 校验令牌并加载用户；任何失败都只记录日志，应用以未登录状态继续
    pub async fn preload_user(&self) -> Option<User> {
        if let Err(e) = self.session.refresh_token().await {
            tracing::debug!(reason = %e, "No user pre logged in");
            return None;
        }

        match self.load_user().await {
            Some(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "Preload user");
                Some(user)
            }
            None => {
                tracing::debug!("No user pre logged in");
                None
            }
        }
    }

    /// 从服务器加载当前用户并写入状态
    pub async fn load_user(&self) -> Option<User> {
        match self.users.get_user().await {
            Ok(user) => {
                self.store.set_user(user.clone());
                Some(user)
            }
            Err(e) => {
                self.notifier.error(&e.to_string());
                None
            }
        }
    }

    /// 登出并清空内存中的用户
    pub fn logout(&self) {
        self.session.logout();
        self.store.clear_user();
        self.router.go_to_home();
    }

    /// 状态中是否已有用户
    pub fn has_user(&self) -> bool {
        self.store.has_user()
    }
}
