// ==========================================
// ACA-O 作物面积优化引擎 - 配置层
// ==========================================
// 职责: 引擎配置结构 + config_kv 覆写加载
// 存储: config_kv 表
// 红线: 配置在构造时显式传入各组件，无进程级全局配置
// ==========================================

pub mod config_manager;
pub mod engine_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigError, ConfigManager, ConfigResult};
pub use engine_config::{AllocationConfig, EngineConfig, FeatureConfig, RiskConfig, ScoringConfig};
