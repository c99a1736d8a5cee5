//! 路由与认证守卫
//!
//! 需要认证的路由只检查本地是否存在令牌；未登录时记录目标路由，
//! 重定向到首页，登录后可通过 `go_to_last_route` 回放。

use crate::session::SessionManager;
use crate::shell::notify::Notifier;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub const HOME_ROUTE: &str = "Home";
pub const NOT_FOUND_ROUTE: &str = "404";
pub const AUTH_REQUIRED_MESSAGE: &str = "Authentication is required, redirected to Home";

/// 路由定义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    pub name: &'static str,
    /// 路径模板，`:name` 为参数，`*` 匹配任意路径
    pub pattern: &'static str,
    pub requires_auth: bool,
}

/// 默认路由表，按顺序匹配
pub const ROUTES: &[RouteDef] = &[
    RouteDef {
        name: HOME_ROUTE,
        pattern: "/",
        requires_auth: false,
    },
    RouteDef {
        name: "Register",
        pattern: "/register",
        requires_auth: false,
    },
    RouteDef {
        name: "Profile",
        pattern: "/profile",
        requires_auth: true,
    },
    RouteDef {
        name: "Accounts",
        pattern: "/accounts",
        requires_auth: true,
    },
    RouteDef {
        name: "Account",
        pattern: "/account/:id",
        requires_auth: true,
    },
    RouteDef {
        name: NOT_FOUND_ROUTE,
        pattern: "*",
        requires_auth: false,
    },
];

/// 解析后的路由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub requires_auth: bool,
}

impl Route {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// 导航结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allowed(Route),
    Redirected { attempted: Route, to: Route },
}

impl Navigation {
    /// 最终到达的路由
    pub fn route(&self) -> &Route {
        match self {
            Navigation::Allowed(route) => route,
            Navigation::Redirected { to, .. } => to,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Navigation::Redirected { .. })
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_pattern(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    if pattern == "*" {
        return Some(BTreeMap::new());
    }

    let expected = segments(pattern);
    let actual = segments(path);
    if expected.len() != actual.len() {
        return None;
    }

    let mut params = BTreeMap::new();
    for (p, a) in expected.iter().zip(actual.iter()) {
        if let Some(name) = p.strip_prefix(':') {
            params.insert(name.to_string(), a.to_string());
        } else if p != a {
            return None;
        }
    }
    Some(params)
}

pub struct Router {
    routes: Vec<RouteDef>,
    base: String,
    session: Arc<SessionManager>,
    notifier: Arc<dyn Notifier>,
    current: RwLock<Route>,
    last_route: RwLock<Option<Route>>,
}

impl Router {
    /// `base` 为公开部署路径，例如 "/" 或 "/console/"
    pub fn new(session: Arc<SessionManager>, notifier: Arc<dyn Notifier>, base: &str) -> Self {
        Self::with_routes(session, notifier, base, ROUTES.to_vec())
    }

    pub fn with_routes(
        session: Arc<SessionManager>,
        notifier: Arc<dyn Notifier>,
        base: &str,
        routes: Vec<RouteDef>,
    ) -> Self {
        let base = base.trim_end_matches('/').to_string();
        let mut router = Self {
            routes,
            base,
            session,
            notifier,
            current: RwLock::new(Route {
                name: String::new(),
                path: String::new(),
                params: BTreeMap::new(),
                requires_auth: false,
            }),
            last_route: RwLock::new(None),
        };
        let home = router.home();
        router.current = RwLock::new(home);
        router
    }

    fn home(&self) -> Route {
        self.routes
            .iter()
            .find(|r| r.name == HOME_ROUTE)
            .map(|r| Route {
                name: r.name.to_string(),
                path: r.pattern.to_string(),
                params: BTreeMap::new(),
                requires_auth: r.requires_auth,
            })
            .unwrap_or(Route {
                name: HOME_ROUTE.to_string(),
                path: "/".to_string(),
                params: BTreeMap::new(),
                requires_auth: false,
            })
    }

    /// 去掉部署路径前缀、查询串和锚点
    fn strip(&self, path: &str) -> String {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = if self.base.is_empty() {
            path
        } else {
            // 只在路径段边界上去掉前缀，"/consoles" 不属于 "/console"
            path.strip_prefix(self.base.as_str())
                .filter(|rest| rest.is_empty() || rest.starts_with('/'))
                .unwrap_or(path)
        };
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }

    /// 把路径解析为路由，未匹配时返回 404 路由
    pub fn resolve(&self, path: &str) -> Route {
        let path = self.strip(path);
        for def in &self.routes {
            if let Some(params) = match_pattern(def.pattern, &path) {
                return Route {
                    name: def.name.to_string(),
                    path,
                    params,
                    requires_auth: def.requires_auth,
                };
            }
        }
        Route {
            name: NOT_FOUND_ROUTE.to_string(),
            path,
            params: BTreeMap::new(),
            requires_auth: false,
        }
    }

    /// 完整链接（含部署路径）
    pub fn href(&self, route: &Route) -> String {
        format!("{}{}", self.base, route.path)
    }

    pub fn current(&self) -> Route {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_current(&self, route: Route) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = route;
    }

    /// 导航到指定路径，需要认证且未登录时重定向到首页
    pub fn navigate(&self, path: &str) -> Navigation {
        let target = self.resolve(path);

        if target.requires_auth && !self.session.is_logged_in() {
            tracing::debug!(route = %target.name, path = %target.path, "Navigation requires authentication");
            self.set_last_route(Some(target.clone()));
            self.notifier.info(AUTH_REQUIRED_MESSAGE);
            let home = self.go_to_home();
            return Navigation::Redirected {
                attempted: target,
                to: home,
            };
        }

        self.set_current(target.clone());
        Navigation::Allowed(target)
    }

    /// 跳转到首页
    pub fn go_to_home(&self) -> Route {
        let current = self.current();
        if current.name == HOME_ROUTE {
            return current;
        }
        tracing::debug!("Redirect to Home");
        let home = self.home();
        self.set_current(home.clone());
        home
    }

    /// 回到登录前尝试访问的路由；没有记录时回到首页
    pub fn go_to_last_route(&self) -> Navigation {
        let last = self
            .last_route
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        match last {
            Some(route) => {
                tracing::debug!(route = %route.name, "Redirect to last route");
                self.navigate(&route.path)
            }
            None => Navigation::Allowed(self.go_to_home()),
        }
    }

    pub fn set_last_route(&self, route: Option<Route>) {
        *self.last_route.write().unwrap_or_else(|e| e.into_inner()) = route;
    }

    pub fn last_route(&self) -> Option<Route> {
        self.last_route
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
