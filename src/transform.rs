//! 任意の失敗値を StructuredError に正規化する create / transform。
//!
//! 捕捉した値の形は `Thrown` の 3 種類に限定し、実行時の型判定は
//! `Thrown::from_value` / `Thrown::from_error` の境界でのみ行う。

use serde_json::{Map, Value};

use crate::{ErrorProps, Info, StructuredError};

/// info に元の値のコピーを格納するキー
pub const PARENT_ERROR_KEY: &str = "parentError";

/// ErrorLike は message / stack を持つエラー形状の値。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorLike {
    pub name: Option<String>,
    pub message: String,
    pub stack: Option<String>,
    /// name / message / stack 以外の独自フィールド
    pub fields: Info,
}

impl ErrorLike {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// フィールドを平坦化した浅いコピーを返す。
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        if let Some(ref name) = self.name {
            map.insert("name".to_string(), Value::String(name.clone()));
        }
        map.insert("message".to_string(), Value::String(self.message.clone()));
        if let Some(ref stack) = self.stack {
            map.insert("stack".to_string(), Value::String(stack.clone()));
        }
        Value::Object(map)
    }
}

/// Thrown は create に渡される「捕捉された値」。
#[derive(Debug, Clone)]
pub enum Thrown {
    /// 既に StructuredError であるもの。同一インスタンスがそのまま再利用される。
    Structured(StructuredError),
    ErrorLike(ErrorLike),
    /// 文字列・数値・その他の任意の値
    Other(Value),
}

impl Thrown {
    /// std のエラー型から ErrorLike を作る。source チェーンは `causes` に格納する。
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let type_name = std::any::type_name::<E>();
        let short_name = type_name.rsplit("::").next().unwrap_or(type_name);

        let mut like = ErrorLike::new(error.to_string()).with_name(short_name);

        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(Value::String(cause.to_string()));
            source = cause.source();
        }
        if !causes.is_empty() {
            like.fields.insert("causes".to_string(), Value::Array(causes));
        }

        Thrown::ErrorLike(like)
    }

    /// JSON 値の形状から分類する。
    /// 文字列の `message` または `stack` を持つオブジェクトは ErrorLike になる。
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) if is_error_shaped(&map) => Thrown::ErrorLike(error_like(map)),
            other => Thrown::Other(other),
        }
    }
}

fn is_error_shaped(map: &Map<String, Value>) -> bool {
    map.get("message").is_some_and(Value::is_string) || map.get("stack").is_some_and(Value::is_string)
}

fn error_like(mut map: Map<String, Value>) -> ErrorLike {
    let mut take_string = |key: &str| match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
        None => None,
    };
    let name = take_string("name");
    let message = take_string("message").unwrap_or_default();
    let stack = take_string("stack");
    ErrorLike {
        name,
        message,
        stack,
        fields: map,
    }
}

impl From<StructuredError> for Thrown {
    fn from(error: StructuredError) -> Self {
        Thrown::Structured(error)
    }
}

impl From<ErrorLike> for Thrown {
    fn from(like: ErrorLike) -> Self {
        Thrown::ErrorLike(like)
    }
}

impl From<&str> for Thrown {
    fn from(s: &str) -> Self {
        Thrown::Other(Value::String(s.to_string()))
    }
}

impl From<String> for Thrown {
    fn from(s: String) -> Self {
        Thrown::Other(Value::String(s))
    }
}

/// Parent は StructuredError の生成元になった元の値。シリアライズされない。
#[derive(Debug, Clone, PartialEq)]
pub enum Parent {
    ErrorLike(ErrorLike),
    Other(Value),
}

impl StructuredError {
    /// 捕捉した値を props と合わせて StructuredError に正規化する。
    ///
    /// - source なし: props から通常生成する
    /// - `Thrown::Structured`: 同一インスタンスを返す。overwrite=false なら
    ///   props.info を既存キー優先でマージ、true なら props で update する
    /// - `Thrown::ErrorLike`: message（props 未指定時）と stack を引き継ぎ、
    ///   `info.parentError` に元の値のコピーを格納する
    /// - `Thrown::Other`: 文字列なら message（props 未指定時）に使う
    ///
    /// 新規生成の場合も overwrite=true なら生成後に props で update する。
    pub fn create(props: impl Into<ErrorProps>, source: Option<Thrown>, overwrite: bool) -> Self {
        let props = props.into();

        let Some(source) = source else {
            return Self::new(props);
        };

        match source {
            Thrown::Structured(mut error) => {
                if overwrite {
                    error.update(props);
                } else if let Some(incoming) = props.info {
                    for (key, value) in incoming {
                        error.info.entry(key).or_insert(value);
                    }
                }
                error
            }
            Thrown::ErrorLike(like) => {
                let mut base = props.clone();
                if base.present_message().is_none() && !like.message.is_empty() {
                    base.message = Some(like.message.clone());
                }
                if let Some(ref stack) = like.stack {
                    base.stack = Some(stack.clone());
                }
                base = base.with_info_entry(PARENT_ERROR_KEY, like.to_value());

                let error = Self::build(base, Some(Parent::ErrorLike(like)));
                finish(error, props, overwrite)
            }
            Thrown::Other(value) => {
                let mut base = props.clone();
                if base.present_message().is_none() {
                    if let Some(s) = value.as_str().filter(|s| !s.is_empty()) {
                        base.message = Some(s.to_string());
                    }
                }
                if !value.is_null() {
                    base = base.with_info_entry(PARENT_ERROR_KEY, value.clone());
                }

                let error = Self::build(base, Some(Parent::Other(value)));
                finish(error, props, overwrite)
            }
        }
    }
}

fn finish(mut error: StructuredError, props: ErrorProps, overwrite: bool) -> StructuredError {
    if overwrite {
        error.update(props);
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorCode, Severity};
    use serde_json::json;

    #[derive(Debug)]
    struct Inner;

    impl std::fmt::Display for Inner {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "disk full")
        }
    }

    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "write failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_from_error_collects_causes() {
        match Thrown::from_error(&Outer(Inner)) {
            Thrown::ErrorLike(like) => {
                assert_eq!(like.message, "write failed");
                assert_eq!(like.name.as_deref(), Some("Outer"));
                assert_eq!(like.fields["causes"], json!(["disk full"]));
            }
            other => panic!("unexpected thrown: {other:?}"),
        }
    }

    #[test]
    fn test_from_value_classifies_error_shaped_objects() {
        match Thrown::from_value(json!({ "message": "boom", "stack": "at x", "status": 500 })) {
            Thrown::ErrorLike(like) => {
                assert_eq!(like.message, "boom");
                assert_eq!(like.stack.as_deref(), Some("at x"));
                assert_eq!(like.fields["status"], json!(500));
                assert!(!like.fields.contains_key("message"));
            }
            other => panic!("unexpected thrown: {other:?}"),
        }

        assert!(matches!(
            Thrown::from_value(json!({ "status": 500 })),
            Thrown::Other(_)
        ));
        assert!(matches!(Thrown::from_value(json!("oops")), Thrown::Other(_)));
    }

    #[test]
    fn test_create_without_source() {
        let err = StructuredError::create("PLAIN", None, true);
        assert_eq!(err.code(), &ErrorCode::new("PLAIN"));
        assert!(err.update_hx().is_empty());
        assert!(err.parent().is_none());
    }

    #[test]
    fn test_create_from_error_like_keeps_props_message() {
        let like = ErrorLike::new("socket closed").with_stack("at net::read");
        let err = StructuredError::create(
            ErrorProps::new().with_code("SYS_NET").with_message("network failure"),
            Some(Thrown::ErrorLike(like.clone())),
            false,
        );
        assert_eq!(err.message(), "network failure");
        assert_eq!(err.stack(), Some("at net::read"));
        assert_eq!(err.info()[PARENT_ERROR_KEY]["message"], json!("socket closed"));
        assert_eq!(err.parent(), Some(&Parent::ErrorLike(like)));
    }

    #[test]
    fn test_create_from_error_like_substitutes_message() {
        let err = StructuredError::create(
            "SYS_NET",
            Some(Thrown::ErrorLike(ErrorLike::new("socket closed"))),
            false,
        );
        assert_eq!(err.message(), "socket closed");
    }

    #[test]
    fn test_create_from_string_source() {
        let err = StructuredError::create("SYS_STR", Some(Thrown::from("raw failure")), false);
        assert_eq!(err.message(), "raw failure");
        assert_eq!(err.parent(), Some(&Parent::Other(json!("raw failure"))));
        assert!(!err.is_revived());
    }

    #[test]
    fn test_create_from_opaque_value() {
        let err = StructuredError::create(
            ErrorProps::new().with_code("SYS_ODD").with_severity(Severity::Low),
            Some(Thrown::Other(json!(42))),
            false,
        );
        assert_eq!(err.message(), "SYS_ODD");
        assert_eq!(err.info()[PARENT_ERROR_KEY], json!(42));
        assert_eq!(err.severity(), Severity::Low);
    }

    #[test]
    fn test_create_new_instance_with_overwrite_records_history() {
        let err = StructuredError::create(
            ErrorProps::new().with_code("SYS_X"),
            Some(Thrown::from("boom")),
            true,
        );
        assert_eq!(err.update_hx().len(), 1);
        assert_eq!(err.update_hx()[0].code, Some(ErrorCode::new("SYS_X")));
    }
}
