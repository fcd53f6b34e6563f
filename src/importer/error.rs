// ==========================================
// ACA-O 作物面积优化引擎 - 导入层错误类型
// ==========================================
// 工具: thiserror
// 规则: 文件级错误中止导入；行级问题记入报告并跳过该行
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件级错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("缺少必需列: 文件={file}, 列={column}")]
    MissingColumn { file: String, column: String },

    // ===== 行级错误 =====
    #[error("主键缺失: 行{row}, 字段={field}")]
    PrimaryKeyMissing { row: usize, field: String },

    #[error("类型转换失败: 行{row}, 字段={field}, 值={value}")]
    TypeConversionError {
        row: usize,
        field: String,
        value: String,
    },

    #[error("日期格式错误: 行{row}, 字段={field}, 值={value}")]
    DateFormatError {
        row: usize,
        field: String,
        value: String,
    },

    #[error("字段值非法: 行{row}, {message}")]
    FieldMappingError { row: usize, message: String },
}

impl ImportError {
    /// 行级错误 (可记入报告后继续)
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            ImportError::PrimaryKeyMissing { .. }
                | ImportError::TypeConversionError { .. }
                | ImportError::DateFormatError { .. }
                | ImportError::FieldMappingError { .. }
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
