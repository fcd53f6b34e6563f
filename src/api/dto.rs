// ==========================================
// ACA-O 作物面积优化引擎 - 请求/响应结构
// ==========================================
// 边界数据: RecommendationRequest/Response, PlanBRequest/Response, SupplyResponse
// ==========================================

use crate::domain::features::SuitabilityScore;
use crate::domain::market::PriceQuote;
use crate::domain::plan::{
    AllocationPlan, CropAllocation, InfeasibilityReason, PlanWarning, RelaxedConstraint,
};
use crate::domain::scenario::Scenario;
use crate::domain::supply::SupplySummaryItem;
use crate::domain::types::{PlanKind, PlanStatus, RiskBand};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// 请求
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub field_id: String,
    pub season: String,
    #[serde(default)]
    pub scenario: Option<Scenario>,
    /// 价格取值日期 (缺省为当天)
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl RecommendationRequest {
    pub fn new(field_id: impl Into<String>, season: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            season: season.into(),
            scenario: None,
            as_of: None,
        }
    }

    /// 情景模拟请求不落库
    pub fn is_what_if(&self) -> bool {
        self.scenario.as_ref().map_or(false, |s| !s.is_baseline())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanBRequest {
    pub field_id: String,
    pub season: String,
    #[serde(default)]
    pub updated_quota_mm: Option<f64>,
    #[serde(default)]
    pub updated_prices: Option<BTreeMap<String, f64>>,
    /// 随请求上报的已播种面积，先写入再重算
    #[serde(default)]
    pub planted_area_ha: Option<BTreeMap<String, f64>>,
}

// ==========================================
// 响应
// ==========================================

/// 单个作物选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropOption {
    pub rank: usize,
    pub crop_id: String,
    pub area_ha: f64,
    pub locked_area_ha: f64,
    pub suitability_score: f64,
    pub suitability_factor: f64,
    pub expected_yield_t_ha: f64,
    pub expected_profit_per_ha: f64,
    pub expected_profit: f64,
    pub risk_band: RiskBand,
    pub rationale: String,
}

impl CropOption {
    pub fn from_allocation(rank: usize, a: &CropAllocation) -> Self {
        Self {
            rank,
            crop_id: a.crop_id.clone(),
            area_ha: a.area_ha,
            locked_area_ha: a.locked_area_ha,
            suitability_score: a.suitability_score,
            suitability_factor: a.suitability_factor,
            expected_yield_t_ha: a.expected_yield_t_ha,
            expected_profit_per_ha: a.expected_profit_per_ha,
            expected_profit: a.area_ha * a.expected_profit_per_ha,
            risk_band: a.risk_band,
            rationale: a.rationale.clone(),
        }
    }
}

/// 方案视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanView {
    pub plan_id: String,
    pub kind: PlanKind,
    pub baseline_plan_id: Option<String>,
    /// 已落库时的 revision
    pub revision: Option<i64>,
    pub status: PlanStatus,
    pub degraded: bool,
    pub over_quota: bool,
    pub best_effort: bool,
    pub infeasibility: Option<InfeasibilityReason>,
    pub relaxed_constraints: Vec<RelaxedConstraint>,
    pub warnings: Vec<PlanWarning>,
    pub total_area_ha: f64,
    pub total_water_mm_ha: f64,
    pub objective_value: f64,
    pub recommendations: Vec<CropOption>,
}

impl PlanView {
    pub fn from_plan(plan: &AllocationPlan, revision: Option<i64>) -> Self {
        Self {
            plan_id: plan.plan_id.clone(),
            kind: plan.kind,
            baseline_plan_id: plan.baseline_plan_id.clone(),
            revision,
            status: plan.status,
            degraded: plan.is_degraded(),
            over_quota: plan.is_over_quota(),
            best_effort: plan.is_best_effort(),
            infeasibility: plan.infeasibility.clone(),
            relaxed_constraints: plan.relaxed_constraints.clone(),
            warnings: plan.warnings.clone(),
            total_area_ha: plan.total_area_ha(),
            total_water_mm_ha: plan.total_water_mm_ha(),
            objective_value: plan.objective_value,
            recommendations: plan
                .allocations
                .iter()
                .enumerate()
                .map(|(i, a)| CropOption::from_allocation(i + 1, a))
                .collect(),
        }
    }
}

/// 实际应用的价格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPrice {
    pub crop_id: String,
    pub price_per_kg: f64,
    pub applied_date: NaiveDate,
    pub stale: bool,
}

impl From<&PriceQuote> for AppliedPrice {
    fn from(q: &PriceQuote) -> Self {
        Self {
            crop_id: q.crop_id.clone(),
            price_per_kg: q.price_per_kg,
            applied_date: q.applied_date,
            stale: q.is_stale(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub field_id: String,
    pub season: String,
    #[serde(flatten)]
    pub plan: PlanView,
    pub applied_prices: Vec<AppliedPrice>,
    /// 适宜度排名 (评分降序)
    pub ranking: Vec<SuitabilityScore>,
}

impl RecommendationResponse {
    pub fn recommendations(&self) -> &[CropOption] {
        &self.plan.recommendations
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanBResponse {
    pub field_id: String,
    pub season: String,
    pub message: String,
    pub adjusted_plan: PlanView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyResponse {
    pub season: String,
    pub scheme_id: Option<String>,
    pub items: Vec<SupplySummaryItem>,
}
