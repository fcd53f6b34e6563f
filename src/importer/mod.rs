// ==========================================
// ACA-O 作物面积优化引擎 - 导入层
// ==========================================
// 职责: 外部 CSV 数据导入为内存目录
// 支持: CSV (fields / crops / prices / yields)
// ==========================================

pub mod catalog_importer;
pub mod error;
pub mod file_parser;

// 重导出核心类型
pub use catalog_importer::{CatalogImportReport, CatalogImporter, ImportIssue};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, RawRow};
