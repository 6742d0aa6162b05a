//! 重大度に応じたログ出力と、ホスト向けの tracing-subscriber 初期化。
//!
//! # 使用例
//!
//! ```ignore
//! use k1s0_structured_error::{init_logger, StructuredError};
//!
//! init_logger("dev", "text", None);
//! StructuredError::new("SYS_ORDER_NOT_FOUND").log(None);
//! ```

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{Handled, StructuredError};

const BORDER: &str = "\n---------------------------------------------------------------\n";

impl StructuredError {
    /// `Severity::to_tracing_level` のレベルでログを出力する。状態は変更しない。
    ///
    /// message が None の場合は `print()` の整形結果を出力する。
    pub fn log(&self, message: Option<&str>) -> &Self {
        let rendered;
        let message = match message {
            Some(m) => m,
            None => {
                rendered = self.print();
                &rendered
            }
        };

        // tracing のマクロはレベルを定数で受け取るため分岐する
        let level = self.severity.to_tracing_level();
        if level == Level::ERROR {
            tracing::error!(
                code = %self.code,
                name = %self.name,
                severity = %self.severity,
                "{message}"
            );
        } else if level == Level::WARN {
            tracing::warn!(
                code = %self.code,
                name = %self.name,
                severity = %self.severity,
                "{message}"
            );
        } else {
            tracing::info!(
                code = %self.code,
                name = %self.name,
                severity = %self.severity,
                "{message}"
            );
        }
        self
    }

    /// 人が読むための複数行レポートを生成する。
    pub fn print(&self) -> String {
        let mut contents = format!("{self}\n{}", self.message);

        if !self.info.is_empty() {
            contents.push_str(&format!(
                "\nInfo: {:#}",
                serde_json::Value::Object(self.info.clone())
            ));
        }
        if let Handled::Info(ref handled) = self.handled {
            contents.push_str(&format!(
                "\nHandled Info: {:#}",
                serde_json::Value::Object(handled.clone())
            ));
        }
        if !self.update_hx.is_empty() {
            let entries = self
                .update_hx
                .iter()
                .map(crate::HistoryEntry::to_value)
                .collect();
            contents.push_str(&format!(
                "\nUpdateHx: {:#}",
                serde_json::Value::Array(entries)
            ));
        }
        if let Some(ref stack) = self.stack {
            contents.push('\n');
            contents.push_str(stack);
        }

        format!("{BORDER}{contents}{BORDER}")
    }
}

/// init_logger は tracing-subscriber を初期化する。
/// 環境に応じてログレベルを設定し、format に応じて出力形式を切り替える。
///
/// - dev: debug
/// - staging: info
/// - prod: warn
///
/// level が指定された場合は環境のデフォルトより優先する。
/// 既にグローバル subscriber が設定されている場合は何もしない。
pub fn init_logger(env: &str, format: &str, level: Option<Level>) {
    let level = level.unwrap_or(match env {
        "dev" => Level::DEBUG,
        "staging" => Level::INFO,
        _ => Level::WARN,
    });
    let filter = EnvFilter::new(level.to_string().to_lowercase());

    let registry = tracing_subscriber::registry().with(filter);

    let result = if format == "text" {
        registry.with(fmt::layer().with_target(true)).try_init()
    } else {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("global subscriber already set; skipping logger init");
    }
}

/// ログレベル文字列を tracing の Level に変換する。未知の文字列は None。
pub fn parse_log_level(level: &str) -> Option<Level> {
    match level {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorProps, Severity};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};

    /// 受け取ったイベントのレベルを記録する。
    #[derive(Clone, Default)]
    struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

    impl LevelRecorder {
        fn levels(&self) -> Vec<Level> {
            self.0.lock().unwrap().clone()
        }
    }

    impl<S: Subscriber> Layer<S> for LevelRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    #[test]
    fn test_print_contains_sections() {
        let mut err = StructuredError::new(
            ErrorProps::new()
                .with_code("SYS_PRINT")
                .with_message("printable")
                .with_stack("at print::test")
                .with_info_entry("key", "value"),
        );
        err.update(ErrorProps::new().with_message("updated"));
        let mut meta = crate::Info::new();
        meta.insert("by".to_string(), json!("ops"));
        err.handle(Some(meta));

        let report = err.print();
        assert!(report.starts_with(BORDER));
        assert!(report.ends_with(BORDER));
        assert!(report.contains("StructuredError - SYS_PRINT (HIGH - HANDLED)"));
        assert!(report.contains("\nupdated"));
        assert!(report.contains("Info: {"));
        assert!(report.contains("Handled Info: {"));
        assert!(report.contains("UpdateHx: ["));
        assert!(report.contains("at print::test"));
    }

    #[test]
    fn test_print_omits_empty_sections() {
        let mut err = StructuredError::new("SYS_BARE");
        err.stack = None;
        let report = err.print();
        assert!(!report.contains("Info:"));
        assert!(!report.contains("UpdateHx:"));
    }

    #[test]
    fn test_log_does_not_mutate() {
        let err = StructuredError::new(ErrorProps::new().with_code("SYS_LOG").with_severity(Severity::Low));
        let before = err.to_object();
        err.log(None).log(Some("custom"));
        assert_eq!(err.to_object(), before);
    }

    #[test]
    fn test_log_routes_by_severity() {
        for severity in Severity::ALL {
            let err = StructuredError::new(ErrorProps::new().with_code("SYS_ROUTE").with_severity(severity));
            let recorder = LevelRecorder::default();
            let subscriber = tracing_subscriber::registry().with(recorder.clone());

            tracing::subscriber::with_default(subscriber, || {
                err.log(None);
            });

            let expected = match severity {
                Severity::High | Severity::Medium => Level::ERROR,
                Severity::Low => Level::WARN,
                Severity::None => Level::INFO,
            };
            assert_eq!(recorder.levels(), vec![expected], "severity {severity}");
            assert_eq!(severity.to_tracing_level(), expected);
        }
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_log_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_log_level("info"), Some(Level::INFO));
        assert_eq!(parse_log_level("warn"), Some(Level::WARN));
        assert_eq!(parse_log_level("error"), Some(Level::ERROR));
        assert_eq!(parse_log_level("verbose"), None);
        assert_eq!(parse_log_level("INFO"), None);
    }
}
