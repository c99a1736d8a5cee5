//! 账户管理命令行入口

use account_console::{
    config::AppConfig,
    models::{NewUser, PageQuery, User},
    shell::{AppShell, LogNotifier, Navigation},
    storage::{FileBackend, StorageService},
    telemetry,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::sync::Arc;

/// 账户管理控制台
#[derive(Parser, Debug)]
#[command(name = "account-console")]
#[command(version, about = "Terminal client for the account management API", long_about = None)]
struct Cli {
    /// 覆盖 API 地址（ACCOUNT_API__BASE_URL）
    #[arg(long = "url")]
    url: Option<String>,

    /// 覆盖会话存储文件（ACCOUNT_STORAGE__PATH）
    #[arg(long = "storage")]
    storage: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 登录并保存令牌
    Login {
        #[arg(short, long)]
        username: String,
        /// 密码，未提供时读取 ACCOUNT_PASSWORD
        #[arg(short, long, value_parser = parse_secret)]
        password: Option<Secret<String>>,
    },
    /// 清除本地令牌
    Logout,
    /// 显示本地会话状态
    Status,
    /// 校验并刷新令牌
    Refresh,
    /// 显示当前用户
    Whoami,
    /// 注册新账户
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long, value_parser = parse_secret)]
        password: Secret<String>,
        #[arg(long, value_parser = parse_secret)]
        confirm_password: Secret<String>,
    },
    /// 修改当前用户密码
    ChangePassword {
        #[arg(long, value_parser = parse_secret)]
        old: Secret<String>,
        #[arg(long, value_parser = parse_secret)]
        new: Secret<String>,
    },
    /// 修改当前用户名
    ChangeUsername { username: String },
    /// 检查用户名是否已存在
    CheckUsername { username: String },
    /// 账户管理
    #[command(subcommand)]
    Accounts(AccountCommand),
    /// 按路由表打开页面路径
    Open { path: String },
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    List,
    Page {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        filter: Option<String>,
    },
    Get {
        id: i64,
    },
    Update {
        id: i64,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// 逗号分隔的角色列表
        #[arg(long, value_delimiter = ',')]
        roles: Option<Vec<String>>,
    },
    SetPassword {
        id: i64,
        #[arg(value_parser = parse_secret)]
        password: Secret<String>,
    },
    Delete {
        id: i64,
    },
    /// 生成测试账户（调试用）
    CreateTest,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 按优先级加载：.env.<ACCOUNT_ENV> 或 .env.local > .env.development > .env
    if let Ok(name) = std::env::var("ACCOUNT_ENV") {
        dotenv::from_filename(format!(".env.{}", name)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    if let Some(url) = cli.url {
        config.api.base_url = url;
    }
    if let Some(path) = cli.storage {
        config.storage.path = path;
    }

    telemetry::init_telemetry(&config);

    let storage = StorageService::new(Arc::new(FileBackend::open(&config.storage.path)));
    let shell = AppShell::from_config(&config, storage, Arc::new(LogNotifier))?;

    // 启动时先校验令牌并加载用户
    if needs_preload(&cli.command) {
        shell.preload_user().await;
    }

    match cli.command {
        Command::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => Secret::new(
                    std::env::var("ACCOUNT_PASSWORD")
                        .context("Password required: pass --password or set ACCOUNT_PASSWORD")?,
                ),
            };
            let auth = shell
                .session
                .login(&username, password.expose_secret())
                .await?;
            if let Some(user) = shell.load_user().await {
                shell.notifier().success(&format!("Logged in as {}", user.display_name()));
            }
            print_json(&auth)?;
        }
        Command::Logout => {
            shell.logout();
            println!("Logged out");
        }
        Command::Status => {
            let auth = shell.session.auth_data();
            print_json(&serde_json::json!({
                "logged_in": shell.session.is_logged_in(),
                "username": auth.as_ref().and_then(|a| a.username.clone()),
                "issued_at": auth.as_ref().and_then(|a| a.issued_at()).map(|t| t.to_rfc3339()),
            }))?;
        }
        Command::Refresh => {
            shell.session.refresh_token().await?;
            println!("Token is valid");
        }
        Command::Whoami => {
            let user = match shell.store.user() {
                Some(user) => user,
                None => shell.users.get_user().await?,
            };
            print_json(&user)?;
        }
        Command::Register {
            username,
            email,
            first_name,
            last_name,
            password,
            confirm_password,
        } => {
            let new_user = NewUser {
                username,
                email,
                first_name,
                last_name,
                password: password.expose_secret().clone(),
                confirm_password: confirm_password.expose_secret().clone(),
            };
            let user = shell.users.register(&new_user).await?;
            shell.notifier().success("Registration successful");
            print_json(&user)?;
        }
        Command::ChangePassword { old, new } => {
            shell
                .users
                .change_password(old.expose_secret(), new.expose_secret())
                .await?;
            shell.notifier().success("Password changed");
        }
        Command::ChangeUsername { username } => {
            shell.users.change_username(&username).await?;
            shell.notifier().success("Username changed");
        }
        Command::CheckUsername { username } => {
            let exists = shell.users.check_username_exists(&username).await?;
            print_json(&serde_json::json!({ "username": username, "exists": exists }))?;
        }
        Command::Accounts(command) => run_accounts(&shell, command).await?,
        Command::Open { path } => match shell.router.navigate(&path) {
            Navigation::Allowed(route) => {
                let href = shell.router.href(&route);
                print_json(&serde_json::json!({
                    "route": route.name,
                    "path": href,
                    "params": route.params,
                }))?
            }
            Navigation::Redirected { attempted, to } => {
                let href = shell.router.href(&to);
                print_json(&serde_json::json!({
                    "route": to.name,
                    "path": href,
                    "redirected_from": attempted.name,
                }))?
            }
        },
    }

    Ok(())
}

async fn run_accounts(shell: &AppShell, command: AccountCommand) -> anyhow::Result<()> {
    match command {
        AccountCommand::List => print_json(&shell.accounts.list().await?)?,
        AccountCommand::Page {
            page,
            size,
            sort,
            desc,
            search,
            filter,
        } => {
            let query = PageQuery {
                page,
                size,
                ascending: sort.as_ref().map(|_| !desc),
                sort,
                search,
                filter,
            };
            print_json(&shell.accounts.get_page(&query).await?)?;
        }
        AccountCommand::Get { id } => print_json(&shell.accounts.get_by_id(id).await?)?,
        AccountCommand::Update {
            id,
            username,
            email,
            first_name,
            last_name,
            roles,
        } => {
            let current: User = shell.accounts.get_by_id(id).await?;
            let updated = User {
                id,
                username: username.unwrap_or(current.username),
                email: email.unwrap_or(current.email),
                first_name: first_name.unwrap_or(current.first_name),
                last_name: last_name.unwrap_or(current.last_name),
                roles: roles.unwrap_or(current.roles),
            };
            print_json(&shell.accounts.update(&updated).await?)?;
        }
        AccountCommand::SetPassword { id, password } => {
            shell
                .accounts
                .change_password(id, password.expose_secret())
                .await?;
            shell.notifier().success("Password changed");
        }
        AccountCommand::Delete { id } => {
            shell.accounts.delete(id).await?;
            shell.notifier().success("Account deleted");
        }
        AccountCommand::CreateTest => {
            shell.accounts.add_test_accounts().await?;
            shell.notifier().success("Test accounts created");
        }
    }
    Ok(())
}

/// 命令行凭据直接解析为 Secret，Debug 输出时被遮蔽
fn parse_secret(value: &str) -> Result<Secret<String>, std::convert::Infallible> {
    Ok(Secret::new(value.to_string()))
}

/// `refresh` 自己会请求 /refresh；`logout`、`status` 只读写本地状态
fn needs_preload(command: &Command) -> bool {
    !matches!(command, Command::Logout | Command::Status | Command::Refresh)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
