// ==========================================
// 集成测试共享辅助
// ==========================================
#![allow(dead_code)]

pub mod test_data_builder;
pub mod test_db;
