// ==========================================
// ACA-O 作物面积优化引擎 - 核心库
// ==========================================
// 职责: 作物适宜度评分 + 面积分配优化 + 季中 Plan-B 重算 + 供给汇总
// 技术栈: Rust + SQLite
// 系统定位: 决策支持 (引擎给出方案，人工最终决定)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 纯计算
pub mod engine;

// 数据提供方 - 上游数据读取接口
pub mod provider;

// 导入层 - CSV 数据
pub mod importer;

// 数据仓储层 - 方案持久化
pub mod repository;

// 配置层
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 请求/响应边界
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{PlanKind, PlanStatus, RiskBand, WaterQuotaBasis, WaterSensitivity};

// 领域实体
pub use domain::{
    AllocationPlan, CandidateCrop, CropAllocation, CropFeatureVector, CriteriaWeights, Crop,
    Field, Scenario, SuitabilityScore, SupplySummaryItem, TriangularFuzzyNumber,
};

// 引擎
pub use engine::{
    AllocationOptimizer, EngineError, EngineResult, PlanBReOptimizer, RecommendationPipeline,
    SuitabilityScorer, SupplyAggregator,
};

// API
pub use api::{ApiError, RecommendationApi};

// 配置
pub use config::{ConfigManager, EngineConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "ACA-O 作物面积优化引擎";
