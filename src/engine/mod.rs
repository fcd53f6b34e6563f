// ==========================================
// ACA-O 作物面积优化引擎 - 引擎层
// ==========================================
// 组件 (由叶到根):
//   特征构建 -> 适宜度评分 -> 面积分配 -> Plan-B 重算 -> 供给汇总
// ==========================================
// 职责: 纯计算，不拼 SQL，不做 I/O
// 红线: 每次求解是无状态的纯函数调用，可并行执行
// ==========================================

pub mod allocation;
pub mod error;
pub mod feature_builder;
pub mod orchestrator;
pub mod replan;
pub mod risk;
pub mod solver;
pub mod suitability;
pub mod supply;
pub mod yield_history;

// 重导出核心引擎
pub use allocation::{AllocationOptimizer, AllocationProblem};
pub use error::{EngineError, EngineResult};
pub use feature_builder::{FeatureBuilder, FeatureSet};
pub use orchestrator::{RecommendationInput, RecommendationOutcome, RecommendationPipeline};
pub use replan::{change_summary, ChangeContext, PlanBReOptimizer};
pub use risk::RiskAssessor;
pub use solver::{BranchAndBoundSolver, MipModel, MipSolver, SolveLimits, SolveOutcome};
pub use suitability::SuitabilityScorer;
pub use supply::SupplyAggregator;
pub use yield_history::YieldHistoryAnalyzer;
