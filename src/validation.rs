//! 動的な props / ワイヤオブジェクトの型検証。
//!
//! JSON 境界から入ってきた値は型が保証されないため、StructuredError に
//! 変換する前にここで検証する。`null` は未指定と同じ扱い。

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::Severity;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("props needs to be an object")]
    NotAnObject,
    #[error("code needs to be a string or an integer")]
    InvalidCode,
    #[error("handled needs to be a boolean or object")]
    InvalidHandled,
    #[error("info needs to be an object")]
    InvalidInfo,
    #[error("message needs to be a string")]
    InvalidMessage,
    #[error("name needs to be a string")]
    InvalidName,
    #[error("severity needs to be either HIGH, MEDIUM, LOW, or NONE")]
    InvalidSeverity,
    #[error("stack needs to be a string")]
    InvalidStack,
    #[error("timestamp needs to be an integer (epoch milliseconds)")]
    InvalidTimestamp,
    #[error("updateHx needs to be an array")]
    InvalidUpdateHx,
    #[error("updateHx entry could not be decoded: {0}")]
    InvalidHistoryEntry(String),
}

impl ValidationError {
    /// 違反したフィールド名を返す。
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NotAnObject => "props",
            ValidationError::InvalidCode => "code",
            ValidationError::InvalidHandled => "handled",
            ValidationError::InvalidInfo => "info",
            ValidationError::InvalidMessage => "message",
            ValidationError::InvalidName => "name",
            ValidationError::InvalidSeverity => "severity",
            ValidationError::InvalidStack => "stack",
            ValidationError::InvalidTimestamp => "timestamp",
            ValidationError::InvalidUpdateHx | ValidationError::InvalidHistoryEntry(_) => {
                "updateHx"
            }
        }
    }

    /// StructuredError の info.details に格納する形式に変換する。
    pub fn to_details(&self) -> Value {
        json!({
            "field": self.field(),
            "message": self.to_string(),
        })
    }
}

/// 生成用 props を検証する。
pub fn validate_props(props: &Value) -> Result<(), ValidationError> {
    let Some(map) = props.as_object() else {
        return Err(ValidationError::NotAnObject);
    };

    if !present(map, "code").map_or(true, |code| code.is_string() || code.is_i64()) {
        return Err(ValidationError::InvalidCode);
    }
    if !present(map, "handled").map_or(true, |h| h.is_boolean() || h.is_object()) {
        return Err(ValidationError::InvalidHandled);
    }
    if !present(map, "info").map_or(true, Value::is_object) {
        return Err(ValidationError::InvalidInfo);
    }
    if !present(map, "message").map_or(true, Value::is_string) {
        return Err(ValidationError::InvalidMessage);
    }
    if !present(map, "name").map_or(true, Value::is_string) {
        return Err(ValidationError::InvalidName);
    }
    if !present(map, "severity").map_or(true, |s| {
        s.as_str().is_some_and(|s| s.parse::<Severity>().is_ok())
    }) {
        return Err(ValidationError::InvalidSeverity);
    }
    if !present(map, "stack").map_or(true, Value::is_string) {
        return Err(ValidationError::InvalidStack);
    }
    Ok(())
}

/// 復元用オブジェクトの監査フィールドのみを検証する。
pub fn validate_object(object: &Value) -> Result<(), ValidationError> {
    let Some(map) = object.as_object() else {
        return Err(ValidationError::NotAnObject);
    };

    if !present(map, "timestamp").map_or(true, Value::is_i64) {
        return Err(ValidationError::InvalidTimestamp);
    }
    if !present(map, "updateHx").map_or(true, Value::is_array) {
        return Err(ValidationError::InvalidUpdateHx);
    }
    Ok(())
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}
