//! 生成フック。
//!
//! すべての StructuredError の生成完了時に同期的に呼び出されるコールバック。
//! 集中ログやメトリクスなど横断的な観測に使用する。起動時に一度だけ登録する。

use std::sync::OnceLock;

use crate::code::codes;
use crate::{ErrorProps, Severity, StructuredError};

/// CreateHook は生成されたインスタンスを受け取る。戻り値は使用されない。
pub type CreateHook = Box<dyn Fn(&StructuredError) + Send + Sync>;

static CREATE_HOOK: OnceLock<CreateHook> = OnceLock::new();

/// 生成フックを登録する。既に登録済みの場合は `HOOK_ALREADY_REGISTERED` を返す。
pub fn register_create_hook<F>(hook: F) -> Result<(), StructuredError>
where
    F: Fn(&StructuredError) + Send + Sync + 'static,
{
    CREATE_HOOK.set(Box::new(hook)).map_err(|_| {
        StructuredError::new(
            ErrorProps::new()
                .with_code(codes::HOOK_ALREADY_REGISTERED)
                .with_message("Create hook is already registered")
                .with_severity(Severity::Medium),
        )
    })
}

/// フックが登録済みかどうか。
pub fn is_create_hook_registered() -> bool {
    CREATE_HOOK.get().is_some()
}

pub(crate) fn notify_created(error: &StructuredError) {
    if let Some(hook) = CREATE_HOOK.get() {
        hook(error);
    }
}
