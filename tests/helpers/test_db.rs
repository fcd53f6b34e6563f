// ==========================================
// 测试数据库辅助
// ==========================================
// 职责: 临时 SQLite 文件 + 统一 schema 初始化
// ==========================================

use aca_engine::db::{init_schema, open_sqlite_connection};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> (NamedTempFile, String) {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path).unwrap();
    init_schema(&conn).unwrap();

    (temp_file, db_path)
}

/// 打开共享连接 (与生产代码同样的 PRAGMA)
pub fn open_test_connection(db_path: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_sqlite_connection(db_path).unwrap()))
}
