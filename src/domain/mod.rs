// ==========================================
// ACA-O 作物面积优化引擎 - 领域模型层
// ==========================================
// 依据: ACA-O 数据模型 - 3. DATA MODEL
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod features;
pub mod field;
pub mod fuzzy;
pub mod market;
pub mod plan;
pub mod scenario;
pub mod supply;
pub mod types;

// 重导出核心类型
pub use features::{CriteriaWeights, Criterion, CropFeatureVector, CropFeatures, SuitabilityScore};
pub use field::{Crop, Field, Location};
pub use fuzzy::TriangularFuzzyNumber;
pub use market::{PriceQuote, PriceRecord, YieldRecord, YieldStats};
pub use plan::{
    AllocationPlan, CandidateCrop, CropAllocation, InfeasibilityReason, PlanInputs, PlanWarning,
    RelaxedConstraint, SolveSummary,
};
pub use scenario::Scenario;
pub use supply::SupplySummaryItem;
pub use types::{PlanKind, PlanStatus, RiskBand, WaterQuotaBasis, WaterSensitivity};
