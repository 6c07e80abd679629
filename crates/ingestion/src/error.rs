//! Ingestion 错误类型

use contracts::SourceError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 不可恢复的消息源错误 (认证 / 配置)，adapter 线程退出
    #[error("feed '{adapter}' stopped: {source}")]
    Fatal {
        /// adapter 名称
        adapter: String,
        #[source]
        source: SourceError,
    },

    /// adapter 线程无法启动
    #[error("failed to spawn thread for feed '{adapter}': {source}")]
    Spawn {
        /// adapter 名称
        adapter: String,
        #[source]
        source: std::io::Error,
    },

    /// adapter 线程 panic
    #[error("feed '{adapter}' thread panicked")]
    Panicked {
        /// adapter 名称
        adapter: String,
    },
}

impl IngestionError {
    pub fn fatal(adapter: impl Into<String>, source: SourceError) -> Self {
        Self::Fatal {
            adapter: adapter.into(),
            source,
        }
    }

    /// 出错的 adapter 名称
    pub fn adapter(&self) -> &str {
        match self {
            Self::Fatal { adapter, .. }
            | Self::Spawn { adapter, .. }
            | Self::Panicked { adapter } => adapter,
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
