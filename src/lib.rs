//! k1s0 structured error.
//!
//! 任意の失敗値を統一的な StructuredError に正規化し、更新履歴を残しながら
//! ログ出力・JSON シリアライズ・JSON からの復元を行う。

pub mod code;
pub mod config;
pub mod error;
pub mod history;
pub mod hook;
pub mod logger;
pub mod props;
pub mod severity;
pub mod transform;
pub mod validation;
pub mod wire;

pub use code::{codes, ErrorCode};
pub use config::{ConfigError, ErrorConfig, LogConfig};
pub use error::{StructuredError, DEFAULT_NAME, MESSAGE_MISSING};
pub use history::HistoryEntry;
pub use hook::{is_create_hook_registered, register_create_hook, CreateHook};
pub use logger::{init_logger, parse_log_level};
pub use props::{ErrorProps, Handled, Info};
pub use severity::Severity;
pub use transform::{ErrorLike, Parent, Thrown, PARENT_ERROR_KEY};
pub use validation::{validate_object, validate_props, ValidationError};
pub use wire::{Decoded, ErrorObject, JSON_REV, JSON_REV_KEY};
