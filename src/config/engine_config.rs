// ==========================================
// ACA-O 作物面积优化引擎 - 引擎配置
// ==========================================
// 职责: 各组件构造时显式传入的配置结构
// 红线: 不使用进程级全局配置对象
// ==========================================

use crate::domain::features::CriteriaWeights;
use crate::domain::types::{WaterQuotaBasis, WaterSensitivity};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::solver::SolveLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// ScoringConfig - 适宜度评分配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: CriteriaWeights,
    /// 实测土壤数据换算适宜度时的模糊展开宽度
    pub measured_soil_spread: f64,
    /// 土壤数据缺失时的模糊展开宽度
    pub missing_soil_spread: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: CriteriaWeights::default(),
            measured_soil_spread: 0.05,
            missing_soil_spread: 0.25,
        }
    }
}

// ==========================================
// AllocationConfig - 面积分配配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub min_area_per_selected_crop_ha: f64,
    pub max_crops_selected: Option<usize>,
    /// 适宜度折算系数 = floor + (1 − floor) × score
    pub suitability_floor: f64,
    pub water_quota_basis: WaterQuotaBasis,
    pub solver_time_limit_ms: u64,
    pub solver_node_limit: usize,
    pub epsilon: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            min_area_per_selected_crop_ha: 0.5,
            max_crops_selected: None,
            suitability_floor: 0.5,
            water_quota_basis: WaterQuotaBasis::PerHectareDepth,
            solver_time_limit_ms: 2_000,
            solver_node_limit: 50_000,
            epsilon: 1e-6,
        }
    }
}

impl AllocationConfig {
    pub fn solve_limits(&self) -> SolveLimits {
        SolveLimits {
            time_limit: Duration::from_millis(self.solver_time_limit_ms),
            node_limit: self.solver_node_limit,
            eps: 1e-9,
        }
    }

    /// 目标函数中的适宜度折算系数
    pub fn suitability_factor(&self, score: f64) -> f64 {
        let floor = self.suitability_floor.clamp(0.0, 1.0);
        floor + (1.0 - floor) * score.clamp(0.0, 1.0)
    }
}

// ==========================================
// RiskConfig - 风险等级配置
// ==========================================
// 依据: 历史产量变异系数 (CV)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub cv_low_max: f64,
    pub cv_medium_max: f64,
    pub min_samples: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            cv_low_max: 0.10,
            cv_medium_max: 0.25,
            min_samples: 3,
        }
    }
}

// ==========================================
// FeatureConfig - 特征构建配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub default_water_sensitivity: WaterSensitivity,
    pub default_growth_duration_days: u32,
    pub default_soil_suitability: f64,
    /// 历史产量按年份指数衰减的系数 (0,1]
    pub recency_decay: f64,
    /// pH 偏离适宜区间后适宜度线性降为 0 的宽度
    pub ph_tolerance: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            default_water_sensitivity: WaterSensitivity::Medium,
            default_growth_duration_days: 120,
            default_soil_suitability: 0.5,
            recency_decay: 0.8,
            ph_tolerance: 1.0,
        }
    }
}

// ==========================================
// EngineConfig - 汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub allocation: AllocationConfig,
    pub risk: RiskConfig,
    pub features: FeatureConfig,
}

impl EngineConfig {
    /// 配置合法性校验
    pub fn validate(&self) -> EngineResult<()> {
        let a = &self.allocation;
        if !a.min_area_per_selected_crop_ha.is_finite() || a.min_area_per_selected_crop_ha < 0.0 {
            return Err(EngineError::validation(
                "allocation.min_area_per_selected_crop_ha",
                "必须为非负数",
            ));
        }
        if a.max_crops_selected == Some(0) {
            return Err(EngineError::validation(
                "allocation.max_crops_selected",
                "必须大于 0",
            ));
        }
        if !(0.0..=1.0).contains(&a.suitability_floor) {
            return Err(EngineError::validation(
                "allocation.suitability_floor",
                "必须位于 [0, 1]",
            ));
        }
        if !(a.epsilon > 0.0) {
            return Err(EngineError::validation("allocation.epsilon", "必须大于 0"));
        }
        let r = &self.risk;
        if !(r.cv_low_max >= 0.0 && r.cv_low_max <= r.cv_medium_max) {
            return Err(EngineError::validation(
                "risk.cv_low_max",
                "必须满足 0 <= cv_low_max <= cv_medium_max",
            ));
        }
        let f = &self.features;
        if !(f.recency_decay > 0.0 && f.recency_decay <= 1.0) {
            return Err(EngineError::validation(
                "features.recency_decay",
                "必须位于 (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&f.default_soil_suitability) {
            return Err(EngineError::validation(
                "features.default_soil_suitability",
                "必须位于 [0, 1]",
            ));
        }
        if f.default_growth_duration_days == 0 {
            return Err(EngineError::validation(
                "features.default_growth_duration_days",
                "必须大于 0",
            ));
        }
        if !(f.ph_tolerance > 0.0) {
            return Err(EngineError::validation("features.ph_tolerance", "必须大于 0"));
        }
        Ok(())
    }
}
