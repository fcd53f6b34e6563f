// ==========================================
// ACA-O 作物面积优化引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 方案持久化边界，屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod locked_area_repo;
pub mod plan_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use locked_area_repo::LockedAreaRepository;
pub use plan_repo::{PlanRepository, StoredPlan};
