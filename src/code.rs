//! エラーコードの表現。
//!
//! コードは文字列または整数のいずれかで、ワイヤ形式でもそのまま
//! JSON の string / number として表現される。
//!
//! 例:
//! - `"CODE_MISSING"`
//! - `"ERROR_CONSTRUCT_ERROR"`
//! - `404`

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ErrorCode は機械可読なエラーコードを表す。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Text(String),
    Number(i64),
}

impl ErrorCode {
    /// 文字列コードを生成する。
    pub fn new(code: impl Into<String>) -> Self {
        Self::Text(code.into())
    }

    /// 空文字列と 0 は「未指定」と同じ扱いになる。
    pub fn is_present(&self) -> bool {
        match self {
            ErrorCode::Text(s) => !s.is_empty(),
            ErrorCode::Number(n) => *n != 0,
        }
    }

    /// 文字列コードであれば &str を返す。
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ErrorCode::Text(s) => Some(s),
            ErrorCode::Number(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ErrorCode::Text(s) => Value::String(s.clone()),
            ErrorCode::Number(n) => Value::from(*n),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::Text(s) => write!(f, "{s}"),
            ErrorCode::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ErrorCode {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ErrorCode {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl PartialEq<&str> for ErrorCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

/// ライブラリ自身が発行する既知のエラーコード。
pub mod codes {
    use super::ErrorCode;

    /// コード未指定時のセンチネル
    pub const CODE_MISSING: &str = "CODE_MISSING";
    pub const CONSTRUCT_ERROR: &str = "ERROR_CONSTRUCT_ERROR";
    pub const REVIVE_ERROR: &str = "ERROR_REVIVE_ERROR";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const HOOK_ALREADY_REGISTERED: &str = "HOOK_ALREADY_REGISTERED";

    pub fn code_missing() -> ErrorCode {
        ErrorCode::new(CODE_MISSING)
    }

    pub fn construct_error() -> ErrorCode {
        ErrorCode::new(CONSTRUCT_ERROR)
    }

    pub fn revive_error() -> ErrorCode {
        ErrorCode::new(REVIVE_ERROR)
    }

    pub fn parse_error() -> ErrorCode {
        ErrorCode::new(PARSE_ERROR)
    }

    pub fn hook_already_registered() -> ErrorCode {
        ErrorCode::new(HOOK_ALREADY_REGISTERED)
    }
}
