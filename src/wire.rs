//! ワイヤ形式へのシリアライズと JSON からの復元（revive）。
//!
//! ワイヤ形式:
//!
//! ```json
//! {
//!   "name": "StructuredError", "code": "SYS_X", "handled": false,
//!   "message": "...", "severity": "HIGH", "info": {}, "stack": "",
//!   "timestamp": 1700000000000,
//!   "updateHx": [{ "code": "OLD", "timestamp": 1699999999999 }],
//!   "_JSONrev": "StructuredError"
//! }
//! ```
//!
//! `_JSONrev` を持つオブジェクトのみが json_parse で StructuredError に復元される。

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::code::codes;
use crate::history::{now_millis, HistoryEntry};
use crate::transform::Thrown;
use crate::validation::{validate_object, ValidationError};
use crate::{ErrorCode, ErrorProps, Handled, Info, Severity, StructuredError};

/// 判別タグのキー
pub const JSON_REV_KEY: &str = "_JSONrev";
/// 判別タグの値
pub const JSON_REV: &str = "StructuredError";

/// ErrorObject は StructuredError のプレーンなスナップショット。
/// parent と revived は含まない。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorObject {
    pub name: String,
    pub code: ErrorCode,
    pub handled: Handled,
    pub message: String,
    pub severity: Severity,
    pub info: Info,
    pub stack: String,
    pub timestamp: i64,
    #[serde(rename = "updateHx")]
    pub update_hx: Vec<HistoryEntry>,
}

impl ErrorObject {
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("code".to_string(), self.code.to_value());
        map.insert("handled".to_string(), self.handled.to_value());
        map.insert("message".to_string(), Value::String(self.message.clone()));
        map.insert("severity".to_string(), Value::from(self.severity.as_str()));
        map.insert("info".to_string(), Value::Object(self.info.clone()));
        map.insert("stack".to_string(), Value::String(self.stack.clone()));
        map.insert("timestamp".to_string(), Value::from(self.timestamp));
        map.insert(
            "updateHx".to_string(),
            Value::Array(self.update_hx.iter().map(HistoryEntry::to_value).collect()),
        );
        Value::Object(map)
    }
}

impl Serialize for ErrorObject {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

impl StructuredError {
    pub fn to_object(&self) -> ErrorObject {
        ErrorObject {
            name: self.name.clone(),
            code: self.code.clone(),
            handled: self.handled.clone(),
            message: self.message.clone(),
            severity: self.severity,
            info: self.info.clone(),
            stack: self.stack.clone().unwrap_or_default(),
            timestamp: self.timestamp,
            update_hx: self.update_hx.clone(),
        }
    }

    /// 判別タグ付きのワイヤ形式 JSON 値を返す。
    pub fn to_wire_value(&self) -> Value {
        let mut value = self.to_object().to_value();
        if let Some(map) = value.as_object_mut() {
            map.insert(JSON_REV_KEY.to_string(), Value::String(JSON_REV.to_string()));
        }
        value
    }

    /// 判別タグ付きのワイヤ形式 JSON 文字列を返す。
    pub fn to_json(&self) -> String {
        self.to_wire_value().to_string()
    }

    /// デコード済みオブジェクトから StructuredError を復元する。
    ///
    /// 通常の生成経路で組み立てた後、timestamp・updateHx・stack を
    /// オブジェクトの値で上書きし、revived を立てる。
    pub fn revive(object: Value) -> Result<Self, Self> {
        if let Err(e) = validate_object(&object) {
            tracing::debug!(field = e.field(), error = %e, "revive validation failed");
            let details = e.to_details();
            return Err(Self::revive_error(object, details));
        }

        let update_hx = match decode_history(&object) {
            Ok(entries) => entries,
            Err(e) => {
                let details = e.to_details();
                return Err(Self::revive_error(object, details));
            }
        };
        let timestamp = object.get("timestamp").and_then(Value::as_i64);
        let stack = object
            .get("stack")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        // props の検証失敗は ERROR_CONSTRUCT_ERROR のまま返す
        let mut error = Self::from_value(object)?;
        error.timestamp = timestamp.unwrap_or_else(now_millis);
        error.update_hx = update_hx;
        error.stack = stack;
        error.revived = true;
        Ok(error)
    }

    /// JSON 文字列をデコードし、判別タグを持つオブジェクトをすべて StructuredError に置き換える。
    ///
    /// 不正な JSON は `PARSE_ERROR`（`info.JSONstring` に入力文字列）になる。
    pub fn json_parse(json_string: &str) -> Result<Decoded, Self> {
        let value: Value = match serde_json::from_str(json_string) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "failed to parse structured error JSON");
                return Err(Self::create(
                    parse_error_props(json_string),
                    Some(Thrown::from_error(&e)),
                    false,
                ));
            }
        };

        Decoded::revive_tree(value).map_err(|revive_error| {
            Self::create(
                parse_error_props(json_string),
                Some(Thrown::Structured(revive_error)),
                false,
            )
        })
    }

    fn revive_error(object: Value, details: Value) -> Self {
        Self::new(
            ErrorProps::new()
                .with_code(codes::REVIVE_ERROR)
                .with_message("Unable to revive error. Check format of object.")
                .with_severity(Severity::High)
                .with_info_entry("object", object)
                .with_info_entry("details", details),
        )
    }
}

fn parse_error_props(json_string: &str) -> ErrorProps {
    ErrorProps::new()
        .with_code(codes::PARSE_ERROR)
        .with_message("Unable to parse string")
        .with_severity(Severity::High)
        .with_info_entry("JSONstring", json_string)
}

fn decode_history(object: &Value) -> Result<Vec<HistoryEntry>, ValidationError> {
    match object.get("updateHx") {
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                serde_json::from_value(entry.clone())
                    .map_err(|e| ValidationError::InvalidHistoryEntry(e.to_string()))
            })
            .collect(),
        _ => Ok(Vec::new()),
    }
}

fn is_tagged(map: &Map<String, Value>) -> bool {
    map.get(JSON_REV_KEY).and_then(Value::as_str) == Some(JSON_REV)
}

/// Decoded は json_parse の結果の木。判別タグ付きのノードは StructuredError に置き換わる。
#[derive(Debug, Clone)]
pub enum Decoded {
    /// null / bool / number / string
    Value(Value),
    Array(Vec<Decoded>),
    Object(BTreeMap<String, Decoded>),
    Error(Box<StructuredError>),
}

impl Decoded {
    fn revive_tree(value: Value) -> Result<Self, StructuredError> {
        match value {
            Value::Object(mut map) if is_tagged(&map) => {
                map.remove(JSON_REV_KEY);
                StructuredError::revive(Value::Object(map)).map(|e| Decoded::Error(Box::new(e)))
            }
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| Ok((key, Self::revive_tree(value)?)))
                .collect::<Result<BTreeMap<_, _>, StructuredError>>()
                .map(Decoded::Object),
            Value::Array(items) => items
                .into_iter()
                .map(Self::revive_tree)
                .collect::<Result<Vec<_>, StructuredError>>()
                .map(Decoded::Array),
            scalar => Ok(Decoded::Value(scalar)),
        }
    }

    pub fn as_error(&self) -> Option<&StructuredError> {
        match self {
            Decoded::Error(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    pub fn into_error(self) -> Option<StructuredError> {
        match self {
            Decoded::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Decoded::Value(v) => Some(v),
            _ => None,
        }
    }

    /// オブジェクトのキーで子要素を取得する。
    pub fn get(&self, key: &str) -> Option<&Decoded> {
        match self {
            Decoded::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// 配列の要素を取得する。
    pub fn get_index(&self, index: usize) -> Option<&Decoded> {
        match self {
            Decoded::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// プレーンな JSON 値に戻す。StructuredError はワイヤ形式になる。
    pub fn into_value(self) -> Value {
        match self {
            Decoded::Value(v) => v,
            Decoded::Array(items) => Value::Array(items.into_iter().map(Decoded::into_value).collect()),
            Decoded::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, value.into_value()))
                    .collect(),
            ),
            Decoded::Error(e) => e.to_wire_value(),
        }
    }
}

impl Serialize for StructuredError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_wire_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StructuredError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(mut map) = value else {
            return Err(D::Error::custom("structured error must be a JSON object"));
        };
        if !is_tagged(&map) {
            return Err(D::Error::custom(format!(
                "missing {JSON_REV_KEY} discriminator"
            )));
        }
        map.remove(JSON_REV_KEY);

        StructuredError::revive(Value::Object(map))
            .map_err(|e| D::Error::custom(format!("{e}: {}", e.message())))
    }
}
