// ==========================================
// ACA-O 作物面积优化引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 不可行分配 / 求解超时是领域结果，不在此列
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 输入格式/取值错误（调用方可修正），携带字段路径
    #[error("输入校验失败 (field={field}): {message}")]
    Validation { field: String, message: String },

    /// 引用的田块/作物/季度无数据
    #[error("资源未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    /// 上游承重数据缺失或失效（无法以缺省值替代）
    #[error("上游数据错误 ({source_name}): {message}")]
    UpstreamData { source_name: String, message: String },

    /// 求解器内部错误（数值失败、迭代上限等）
    #[error("求解器错误: {0}")]
    Solver(String),
}

impl EngineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
