// ==========================================
// ACA-O 作物面积优化引擎 - 数据提供方错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// 上游服务不可用
    #[error("上游数据源不可用 ({source_name}): {message}")]
    Unavailable { source_name: String, message: String },

    /// 上游返回的数据无法解释
    #[error("上游数据非法 ({source_name}): {message}")]
    InvalidData { source_name: String, message: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;
