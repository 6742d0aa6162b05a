//! StructuredError 本体と生成処理。
//!
//! StructuredError は任意の失敗値を正規化した統一的なエラー表現で、
//! コード・メッセージ・重大度・コンテキスト情報・処理状態・更新履歴を持つ。
//! ライブラリ内部の失敗（props 検証エラー等）も StructuredError として返す。

use std::backtrace::{Backtrace, BacktraceStatus};

use serde_json::{json, Value};

use crate::code::codes;
use crate::history::{now_millis, HistoryEntry};
use crate::hook;
use crate::transform::Parent;
use crate::validation::validate_props;
use crate::{ErrorCode, ErrorProps, Handled, Info, Severity};

/// name 未指定時に使用する分類名
pub const DEFAULT_NAME: &str = "StructuredError";
/// code もメッセージも無い場合のメッセージ
pub const MESSAGE_MISSING: &str = "Message Missing";

/// StructuredError は構造化されたシリアライズ可能なエラー。
///
/// 生成後の変更は `update` と `handle` を通してのみ行う。
#[derive(Debug, Clone)]
pub struct StructuredError {
    pub(crate) code: ErrorCode,
    pub(crate) name: String,
    pub(crate) message: String,
    pub(crate) severity: Severity,
    pub(crate) info: Info,
    pub(crate) handled: Handled,
    pub(crate) stack: Option<String>,
    /// 正規化前の元の値。シリアライズ対象外。
    pub(crate) parent: Option<Parent>,
    pub(crate) revived: bool,
    pub(crate) timestamp: i64,
    pub(crate) update_hx: Vec<HistoryEntry>,
}

impl StructuredError {
    /// props またはコード単体から StructuredError を生成する。
    ///
    /// - message: 明示指定 → code の文字列表現 → `"Message Missing"`
    /// - code: 未指定なら `"CODE_MISSING"`
    /// - severity: 未指定なら `HIGH`
    pub fn new(props: impl Into<ErrorProps>) -> Self {
        Self::build(props.into(), None)
    }

    /// 型が保証されない JSON の props から生成する。
    /// 検証に失敗した場合は `ERROR_CONSTRUCT_ERROR` の StructuredError を返す。
    pub fn from_value(props: Value) -> Result<Self, Self> {
        if let Err(e) = validate_props(&props) {
            tracing::debug!(field = e.field(), error = %e, "props validation failed");
            let details = e.to_details();
            return Err(Self::construct_error(props, details));
        }

        match serde_json::from_value::<ErrorProps>(props.clone()) {
            Ok(typed) => Ok(Self::new(typed)),
            Err(e) => {
                let details = json!({ "field": "props", "message": e.to_string() });
                Err(Self::construct_error(props, details))
            }
        }
    }

    pub(crate) fn build(props: ErrorProps, parent: Option<Parent>) -> Self {
        let code = props.present_code().cloned();
        let message = props
            .present_message()
            .map(str::to_string)
            .or_else(|| code.as_ref().map(ToString::to_string))
            .unwrap_or_else(|| MESSAGE_MISSING.to_string());
        let stack = props
            .present_stack()
            .map(str::to_string)
            .or_else(capture_stack);

        let error = Self {
            code: code.unwrap_or_else(codes::code_missing),
            name: props
                .present_name()
                .unwrap_or(DEFAULT_NAME)
                .to_string(),
            message,
            severity: props.severity.unwrap_or_default(),
            info: props.info.unwrap_or_default(),
            handled: props.handled.unwrap_or_default(),
            stack,
            parent,
            revived: false,
            timestamp: now_millis(),
            update_hx: Vec::new(),
        };

        hook::notify_created(&error);
        error
    }

    fn construct_error(props: Value, details: Value) -> Self {
        Self::new(
            ErrorProps::new()
                .with_code(codes::CONSTRUCT_ERROR)
                .with_message("Unable to construct error. Check format of props.")
                .with_severity(Severity::High)
                .with_info_entry("props", props)
                .with_info_entry("details", details),
        )
    }

    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn handled(&self) -> &Handled {
        &self.handled
    }

    pub fn is_handled(&self) -> bool {
        self.handled.is_handled()
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// create に渡された元の値（StructuredError 以外から生成された場合のみ）。
    pub fn parent(&self) -> Option<&Parent> {
        self.parent.as_ref()
    }

    /// revive 経由で復元されたインスタンスかどうか。
    pub fn is_revived(&self) -> bool {
        self.revived
    }

    /// 最終更新時刻（エポックミリ秒）
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn update_hx(&self) -> &[HistoryEntry] {
        &self.update_hx
    }
}

fn capture_stack() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} ({}", self.name, self.code, self.severity)?;
        if self.is_handled() {
            write!(f, " - HANDLED")?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for StructuredError {}
