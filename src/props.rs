use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ErrorCode, Severity};

/// Info はエラーに付随する任意のコンテキスト情報。
pub type Info = serde_json::Map<String, Value>;

/// Handled はエラーの処理状態を表す。
/// 単純なフラグ、または処理メタデータを持つオブジェクトのいずれか。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Handled {
    Flag(bool),
    Info(Info),
}

impl Handled {
    /// 処理済みかどうか。オブジェクトは中身に関わらず処理済みとみなす。
    pub fn is_handled(&self) -> bool {
        match self {
            Handled::Flag(flag) => *flag,
            Handled::Info(_) => true,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Handled::Flag(flag) => Value::Bool(*flag),
            Handled::Info(info) => Value::Object(info.clone()),
        }
    }
}

impl Default for Handled {
    fn default() -> Self {
        Handled::Flag(false)
    }
}

impl From<bool> for Handled {
    fn from(flag: bool) -> Self {
        Handled::Flag(flag)
    }
}

impl From<Info> for Handled {
    fn from(info: Info) -> Self {
        Handled::Info(info)
    }
}

/// ErrorProps は StructuredError の生成・更新に使う部分的なフィールド集合。
///
/// 生成時は未指定のフィールドにデフォルトが適用され、更新時は
/// 指定されたフィールドのみが変更対象になる。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handled: Option<Handled>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(mut self, code: impl Into<ErrorCode>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_handled(mut self, handled: impl Into<Handled>) -> Self {
        self.handled = Some(handled.into());
        self
    }

    pub fn with_info(mut self, info: Info) -> Self {
        self.info = Some(info);
        self
    }

    /// info に 1 件のキーを追加する。
    pub fn with_info_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.info
            .get_or_insert_with(Info::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// 空文字列を除いたコード
    pub(crate) fn present_code(&self) -> Option<&ErrorCode> {
        self.code.as_ref().filter(|code| code.is_present())
    }

    pub(crate) fn present_message(&self) -> Option<&str> {
        non_empty(self.message.as_deref())
    }

    pub(crate) fn present_name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    pub(crate) fn present_stack(&self) -> Option<&str> {
        non_empty(self.stack.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

impl From<&str> for ErrorProps {
    fn from(code: &str) -> Self {
        Self::new().with_code(code)
    }
}

impl From<String> for ErrorProps {
    fn from(code: String) -> Self {
        Self::new().with_code(code)
    }
}

impl From<i64> for ErrorProps {
    fn from(code: i64) -> Self {
        Self::new().with_code(code)
    }
}

impl From<ErrorCode> for ErrorProps {
    fn from(code: ErrorCode) -> Self {
        Self::new().with_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handled_truthiness() {
        assert!(!Handled::Flag(false).is_handled());
        assert!(Handled::Flag(true).is_handled());
        assert!(Handled::Info(Info::new()).is_handled());
    }

    #[test]
    fn test_props_builder() {
        let props = ErrorProps::new()
            .with_code("SYS_TEST")
            .with_message("boom")
            .with_severity(Severity::Low)
            .with_info_entry("user_id", "u-1")
            .with_info_entry("retry", 3);
        assert_eq!(props.code, Some(ErrorCode::new("SYS_TEST")));
        assert_eq!(props.message.as_deref(), Some("boom"));
        assert_eq!(props.severity, Some(Severity::Low));
        let info = props.info.unwrap();
        assert_eq!(info["user_id"], json!("u-1"));
        assert_eq!(info["retry"], json!(3));
    }

    #[test]
    fn test_props_from_code() {
        let props = ErrorProps::from("ONLY_CODE");
        assert_eq!(props.code, Some(ErrorCode::new("ONLY_CODE")));
        assert!(props.message.is_none());
    }

    #[test]
    fn test_empty_strings_are_not_present() {
        let props = ErrorProps::new().with_code("").with_message("").with_name("");
        assert!(props.present_code().is_none());
        assert!(props.present_message().is_none());
        assert!(props.present_name().is_none());
    }

    #[test]
    fn test_props_deserialize_handled_object() {
        let props: ErrorProps =
            serde_json::from_value(json!({ "handled": { "by": "ops" } })).unwrap();
        match props.handled {
            Some(Handled::Info(info)) => assert_eq!(info["by"], json!("ops")),
            other => panic!("unexpected handled: {other:?}"),
        }
    }
}
