// ==========================================
// ACA-O 作物面积优化引擎 - API层错误类型
// ==========================================
// 职责: 将各层错误转换为边界错误分类
// 规则: 不可行分配 / 求解超时是成功响应，不在此列
// ==========================================

use crate::config::ConfigError;
use crate::engine::error::EngineError;
use crate::importer::ImportError;
use crate::provider::ProviderError;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    /// 输入非法（调用方可修正）
    #[error("输入校验失败 (field={field}): {message}")]
    Validation { field: String, message: String },

    #[error("资源未找到: {entity}(id={id})")]
    NotFound { entity: String, id: String },

    /// 上游承重数据缺失或不可用
    #[error("上游数据错误 ({source_name}): {message}")]
    UpstreamData { source_name: String, message: String },

    /// 并发写入冲突
    #[error("写入冲突: {0}")]
    Conflict(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// HTTP 等价状态码
    pub fn error_code(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 400,
            ApiError::NotFound { .. } => 404,
            ApiError::Conflict(_) => 409,
            ApiError::UpstreamData { .. } => 502,
            ApiError::Internal(_) => 500,
        }
    }

    /// 结构化错误体
    pub fn to_body(&self) -> ErrorBody {
        let field = match self {
            ApiError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        ErrorBody {
            code: self.error_code(),
            kind: match self {
                ApiError::Validation { .. } => "VALIDATION",
                ApiError::NotFound { .. } => "NOT_FOUND",
                ApiError::UpstreamData { .. } => "UPSTREAM_DATA",
                ApiError::Conflict(_) => "CONFLICT",
                ApiError::Internal(_) => "INTERNAL",
            },
            field,
            message: self.to_string(),
        }
    }
}

/// 错误响应体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub kind: &'static str,
    pub field: Option<String>,
    pub message: String,
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation { field, message } => ApiError::Validation { field, message },
            EngineError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            EngineError::UpstreamData {
                source_name,
                message,
            } => ApiError::UpstreamData {
                source_name,
                message,
            },
            EngineError::Solver(msg) => ApiError::Internal(format!("求解器错误: {}", msg)),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                field_id,
                season,
                expected,
                actual,
            } => ApiError::Conflict(format!(
                "田块{}季度{}的方案已被其他写入更新（期望revision={}，实际revision={}）",
                field_id, season, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::Validation { field, message }
            }
            RepositoryError::LockError(msg) => {
                ApiError::Internal(format!("数据库锁获取失败: {}", msg))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// ==========================================
// 从 ProviderError 转换
// ==========================================
impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable {
                source_name,
                message,
            }
            | ProviderError::InvalidData {
                source_name,
                message,
            } => ApiError::UpstreamData {
                source_name,
                message,
            },
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::not_found("file", path),
            other => ApiError::UpstreamData {
                source_name: "import".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
