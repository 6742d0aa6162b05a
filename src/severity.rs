use serde::{Deserialize, Serialize};

/// Severity は 4 段階の重大度を表す。ログの出力先の振り分けに使用する。
///
/// 未指定の場合は最も高い `High` になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    High,
    Medium,
    Low,
    None,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::None => "NONE",
        }
    }

    /// 対応する tracing のレベルに変換する。
    /// HIGH と MEDIUM はどちらも ERROR に出力される。
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Severity::High | Severity::Medium => tracing::Level::ERROR,
            Severity::Low => tracing::Level::WARN,
            Severity::None => tracing::Level::INFO,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.as_str() == s)
            .ok_or_else(|| format!("unknown severity: {s}"))
    }
}
