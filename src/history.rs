//! 更新履歴（updateHx）と update / handle 操作。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ErrorCode, ErrorProps, Handled, Info, Severity, StructuredError};

/// HistoryEntry は update 直前のフィールド値のスナップショット。
///
/// 変更されたフィールドのみ値を持ち、`timestamp` は更新前の時刻。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub code: Option<ErrorCode>,
    #[serde(default)]
    pub handled: Option<Handled>,
    #[serde(default)]
    pub info: Option<Info>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub stack: Option<String>,
    pub timestamp: i64,
}

impl HistoryEntry {
    pub(crate) fn at(timestamp: i64) -> Self {
        Self {
            code: None,
            handled: None,
            info: None,
            message: None,
            name: None,
            severity: None,
            stack: None,
            timestamp,
        }
    }

    /// ワイヤ形式の JSON オブジェクトに変換する。値を持たないフィールドは出力しない。
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(ref code) = self.code {
            map.insert("code".to_string(), code.to_value());
        }
        if let Some(ref handled) = self.handled {
            map.insert("handled".to_string(), handled.to_value());
        }
        if let Some(ref info) = self.info {
            map.insert("info".to_string(), Value::Object(info.clone()));
        }
        if let Some(ref message) = self.message {
            map.insert("message".to_string(), Value::String(message.clone()));
        }
        if let Some(ref name) = self.name {
            map.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(severity) = self.severity {
            map.insert("severity".to_string(), Value::from(severity.as_str()));
        }
        if let Some(ref stack) = self.stack {
            map.insert("stack".to_string(), Value::String(stack.clone()));
        }
        map.insert("timestamp".to_string(), Value::from(self.timestamp));
        Value::Object(map)
    }
}

impl Serialize for HistoryEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 同一ミリ秒内の連続更新でも単調増加させる。
pub(crate) fn next_timestamp(previous: i64) -> i64 {
    now_millis().max(previous.saturating_add(1))
}

impl StructuredError {
    /// 指定されたフィールドで自身を上書きし、変更前の値を updateHx に記録する。
    ///
    /// - code / message / name / stack / severity: 空でない値が指定された場合のみ
    /// - handled: `false` を含むあらゆる明示値で記録・上書きする
    /// - info: キー単位でマージする。既存キーの値が異なる場合のみ旧値を記録する
    ///
    /// 何も指定されない場合でも、旧タイムスタンプのみを持つエントリが追加される。
    pub fn update(&mut self, props: ErrorProps) -> &mut Self {
        let mut prev = HistoryEntry::at(self.timestamp);

        if let Some(code) = props.present_code() {
            prev.code = Some(std::mem::replace(&mut self.code, code.clone()));
        }

        if let Some(info) = props.info {
            let mut prev_info = Info::new();
            for (key, value) in info {
                match self.info.get(&key) {
                    Some(old) if *old == value => {}
                    Some(old) => {
                        prev_info.insert(key.clone(), old.clone());
                        self.info.insert(key, value);
                    }
                    None => {
                        self.info.insert(key, value);
                    }
                }
            }
            if !prev_info.is_empty() {
                prev.info = Some(prev_info);
            }
        }

        if let Some(message) = non_empty(props.message) {
            prev.message = Some(std::mem::replace(&mut self.message, message));
        }
        if let Some(name) = non_empty(props.name) {
            prev.name = Some(std::mem::replace(&mut self.name, name));
        }
        if let Some(stack) = non_empty(props.stack) {
            prev.stack = self.stack.replace(stack);
        }
        if let Some(severity) = props.severity {
            prev.severity = Some(std::mem::replace(&mut self.severity, severity));
        }
        // handled は false でも明示的なリセットとして扱う
        if let Some(handled) = props.handled {
            prev.handled = Some(std::mem::replace(&mut self.handled, handled));
        }

        self.update_hx.push(prev);
        self.timestamp = next_timestamp(self.timestamp);

        tracing::debug!(
            code = %self.code,
            history_len = self.update_hx.len(),
            "structured error updated"
        );
        self
    }

    /// 未処理であれば処理済みにして true を返す。処理済みなら何もせず false を返す。
    ///
    /// updateHx には記録しない。
    pub fn handle(&mut self, handled_info: Option<Info>) -> bool {
        if self.handled.is_handled() {
            return false;
        }

        self.handled = handled_info.map_or(Handled::Flag(true), Handled::Info);
        tracing::info!(code = %self.code, "Handled: {}", self);
        true
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}
