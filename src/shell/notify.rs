//! 通知
//!
//! 服务层只决定消息内容，展示方式由实现方决定。

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    /// 建议展示时长（毫秒）
    pub fn duration_ms(&self) -> u64 {
        match self {
            NoticeLevel::Info | NoticeLevel::Success => 3000,
            NoticeLevel::Warning => 4000,
            NoticeLevel::Error => 8000,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);

    fn info(&self, message: &str) {
        self.notify(NoticeLevel::Info, message);
    }

    fn success(&self, message: &str) {
        self.notify(NoticeLevel::Success, message);
    }

    fn warning(&self, message: &str) {
        self.notify(NoticeLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NoticeLevel::Error, message);
    }
}

/// 写入日志的通知实现
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        let duration_ms = level.duration_ms();
        match level {
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(notice = ?level, duration_ms, "{}", message)
            }
            NoticeLevel::Warning => tracing::warn!(duration_ms, "{}", message),
            NoticeLevel::Error => tracing::error!(duration_ms, "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_notices_stay_longest() {
        assert!(NoticeLevel::Error.duration_ms() > NoticeLevel::Warning.duration_ms());
        assert!(NoticeLevel::Warning.duration_ms() > NoticeLevel::Info.duration_ms());
    }
}
