// ==========================================
// ACA-O 作物面积优化引擎 - 分配方案领域模型
// ==========================================
// 依据: ACA-O 数据模型 - AllocationPlan / CropAllocation
// 红线: 方案只会被新方案取代，不可原地修改
// ==========================================

use crate::domain::features::CropFeatureVector;
use crate::domain::field::Field;
use crate::domain::market::YieldStats;
use crate::domain::types::{PlanKind, PlanStatus, RiskBand, WaterSensitivity};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// CandidateCrop - 参与分配的候选作物
// ==========================================
// 由特征构建 + 适宜度评分产出，作为优化器输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCrop {
    pub crop_id: String,
    pub suitability_score: f64,
    pub expected_yield_t_ha: f64,
    pub price_per_kg: f64,
    pub water_requirement_mm: f64,
    pub estimated_cost_per_ha: f64,
    #[serde(default)]
    pub water_sensitivity: WaterSensitivity,
    #[serde(default)]
    pub yield_stats: Option<YieldStats>,
    #[serde(default)]
    pub features: Option<CropFeatureVector>, // 用于 Plan-B 配额变化后的重新评分
    #[serde(default)]
    pub fixed_area: bool,                    // 计划外已播种作物: 面积固定为已播种面积
}

impl CandidateCrop {
    /// 每公顷预期收益 = 产量(t/ha) × 1000 × 单价(/kg) − 成本(/ha)
    pub fn expected_profit_per_ha(&self) -> f64 {
        self.expected_yield_t_ha * 1000.0 * self.price_per_kg - self.estimated_cost_per_ha
    }
}

// ==========================================
// CropAllocation - 单作物分配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropAllocation {
    pub crop_id: String,
    pub area_ha: f64,
    pub suitability_score: f64,
    pub suitability_factor: f64,        // 目标函数中的适宜度折算系数
    pub expected_yield_t_ha: f64,
    pub expected_profit_per_ha: f64,
    pub water_requirement_mm: f64,
    pub risk_band: RiskBand,
    #[serde(default)]
    pub locked_area_ha: f64,            // 已播种锁定面积
    pub rationale: String,
}

impl CropAllocation {
    pub fn is_selected(&self) -> bool {
        self.area_ha > 0.0
    }

    pub fn expected_production_t(&self) -> f64 {
        self.area_ha * self.expected_yield_t_ha
    }
}

// ==========================================
// PlanInputs - 方案输入快照
// ==========================================
// 用途: Plan-B 以原方案为基线重算，必须能复现原输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInputs {
    pub field: Field,
    pub candidates: Vec<CandidateCrop>,
    pub min_area_per_selected_crop_ha: f64,
    pub max_crops_selected: Option<usize>,
    pub water_budget_mm_ha: f64,
}

// ==========================================
// 放宽约束 / 不可行原因 / 告警
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelaxedConstraint {
    MinimumArea,
    Cardinality,
}

impl fmt::Display for RelaxedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelaxedConstraint::MinimumArea => write!(f, "MINIMUM_AREA"),
            RelaxedConstraint::Cardinality => write!(f, "CARDINALITY"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfeasibilityReason {
    /// 无候选作物
    NoCandidates,
    /// 候选作物预期收益均不为正
    NoProfitableCrop,
    /// 水量预算不足以种植任何作物
    InsufficientWater { water_budget_mm_ha: f64 },
    /// 约束无解 (放宽后仍无解)
    ConstraintsUnsatisfiable { detail: String },
    /// 求解超时且未找到任何可行解
    NoSolutionWithinTimeLimit { time_limit_ms: u64 },
}

impl fmt::Display for InfeasibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfeasibilityReason::NoCandidates => write!(f, "no eligible candidate crops"),
            InfeasibilityReason::NoProfitableCrop => {
                write!(f, "no candidate crop has a positive expected profit")
            }
            InfeasibilityReason::InsufficientWater { water_budget_mm_ha } => write!(
                f,
                "water budget {:.1} mm·ha is insufficient for any crop",
                water_budget_mm_ha
            ),
            InfeasibilityReason::ConstraintsUnsatisfiable { detail } => {
                write!(f, "constraints admit no solution: {}", detail)
            }
            InfeasibilityReason::NoSolutionWithinTimeLimit { time_limit_ms } => write!(
                f,
                "no feasible allocation found within {} ms",
                time_limit_ms
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanWarning {
    /// 上游数据缺失，已用缺省值替代
    DegradedData { crop_id: Option<String>, detail: String },
    /// 已播种面积用水超过新配额
    OverQuota { locked_water_mm_ha: f64, water_budget_mm_ha: f64 },
    /// 求解超时，返回当前最优可行解
    SolverTimeout { time_limit_ms: u64, nodes_explored: usize },
    /// 为得到可行解放宽了约束
    ConstraintRelaxed { constraint: RelaxedConstraint },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::DegradedData { crop_id: Some(c), detail } => {
                write!(f, "degraded data for {}: {}", c, detail)
            }
            PlanWarning::DegradedData { crop_id: None, detail } => {
                write!(f, "degraded data: {}", detail)
            }
            PlanWarning::OverQuota {
                locked_water_mm_ha,
                water_budget_mm_ha,
            } => write!(
                f,
                "over-quota: planted area needs {:.1} mm·ha but budget is {:.1} mm·ha",
                locked_water_mm_ha, water_budget_mm_ha
            ),
            PlanWarning::SolverTimeout {
                time_limit_ms,
                nodes_explored,
            } => write!(
                f,
                "best-effort: solver stopped after {} ms ({} nodes)",
                time_limit_ms, nodes_explored
            ),
            PlanWarning::ConstraintRelaxed { constraint } => {
                write!(f, "constraint relaxed: {}", constraint)
            }
        }
    }
}

/// 求解统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveSummary {
    pub nodes_explored: usize,
    pub lp_iterations: usize,
    pub elapsed_ms: u64,
}

// ==========================================
// AllocationPlan - 田块季度分配方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub plan_id: String,
    pub field_id: String,
    pub season: String,
    pub kind: PlanKind,
    pub baseline_plan_id: Option<String>,    // Plan-B 的基线方案
    pub created_at: NaiveDateTime,
    pub status: PlanStatus,
    pub allocations: Vec<CropAllocation>,    // 已分配在前 (面积降序)，其余按适宜度降序
    pub objective_value: f64,
    pub infeasibility: Option<InfeasibilityReason>,
    pub relaxed_constraints: Vec<RelaxedConstraint>,
    pub warnings: Vec<PlanWarning>,
    pub message: Option<String>,             // Plan-B 变更说明
    pub inputs: PlanInputs,
    pub solve_summary: SolveSummary,
}

impl AllocationPlan {
    pub fn total_area_ha(&self) -> f64 {
        self.allocations.iter().map(|a| a.area_ha).sum()
    }

    /// Σ area × water_requirement (mm·ha)
    pub fn total_water_mm_ha(&self) -> f64 {
        self.allocations
            .iter()
            .map(|a| a.area_ha * a.water_requirement_mm)
            .sum()
    }

    pub fn total_expected_production_t(&self) -> f64 {
        self.allocations.iter().map(|a| a.expected_production_t()).sum()
    }

    pub fn selected(&self) -> impl Iterator<Item = &CropAllocation> {
        self.allocations.iter().filter(|a| a.is_selected())
    }

    pub fn allocation_for(&self, crop_id: &str) -> Option<&CropAllocation> {
        self.allocations.iter().find(|a| a.crop_id == crop_id)
    }

    pub fn area_of(&self, crop_id: &str) -> f64 {
        self.allocation_for(crop_id).map(|a| a.area_ha).unwrap_or(0.0)
    }

    pub fn is_degraded(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, PlanWarning::DegradedData { .. }))
    }

    pub fn is_over_quota(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, PlanWarning::OverQuota { .. }))
    }

    pub fn is_best_effort(&self) -> bool {
        self.status == PlanStatus::BestEffort
    }

    pub fn scheme_id(&self) -> Option<&str> {
        self.inputs.field.scheme_id.as_deref()
    }
}
