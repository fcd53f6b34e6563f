// ==========================================
// ACA-O 作物面积优化引擎 - 领域类型定义
// ==========================================
// 依据: ACA-O 数据模型 - 3. DATA MODEL
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 需水敏感度 (Water Sensitivity)
// ==========================================
// 缺省值: Medium (上游数据缺失时)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterSensitivity {
    Low,    // 耐旱
    Medium, // 一般
    High,   // 敏感
}

impl Default for WaterSensitivity {
    fn default() -> Self {
        WaterSensitivity::Medium
    }
}

impl fmt::Display for WaterSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl WaterSensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaterSensitivity::Low => "low",
            WaterSensitivity::Medium => "medium",
            WaterSensitivity::High => "high",
        }
    }

    /// 宽松解析，无法识别时返回 None（由调用方决定缺省值）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "l" => Some(WaterSensitivity::Low),
            "medium" | "med" | "m" => Some(WaterSensitivity::Medium),
            "high" | "h" => Some(WaterSensitivity::High),
            _ => None,
        }
    }

    /// 缺省需水量 (mm)，仅在作物目录缺少 water_requirement_mm 时使用
    pub fn default_water_requirement_mm(&self) -> f64 {
        match self {
            WaterSensitivity::Low => 350.0,
            WaterSensitivity::Medium => 500.0,
            WaterSensitivity::High => 700.0,
        }
    }
}

// ==========================================
// 风险等级 (Risk Band)
// ==========================================
// 顺序: Low < Medium < High
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskBand::Low => write!(f, "low"),
            RiskBand::Medium => write!(f, "medium"),
            RiskBand::High => write!(f, "high"),
        }
    }
}

// ==========================================
// 方案类型 (Plan Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanKind {
    Recommendation, // 季初推荐
    PlanB,          // 季中重算
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PlanKind {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PLAN_B" => PlanKind::PlanB,
            _ => PlanKind::Recommendation,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            PlanKind::Recommendation => "RECOMMENDATION",
            PlanKind::PlanB => "PLAN_B",
        }
    }
}

// ==========================================
// 方案求解状态 (Plan Status)
// ==========================================
// 红线: 不可把 BestEffort 当作 Optimal 呈现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Optimal,    // 求解完成 (可能含放宽约束)
    BestEffort, // 超时，返回当前最优可行解
    Infeasible, // 无可行种植方案 (零分配 + 原因)
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStatus::Optimal => write!(f, "OPTIMAL"),
            PlanStatus::BestEffort => write!(f, "BEST_EFFORT"),
            PlanStatus::Infeasible => write!(f, "INFEASIBLE"),
        }
    }
}

// ==========================================
// 用水配额口径 (Water Quota Basis)
// ==========================================
// PerHectareDepth: water_quota_mm 为田块平均水深，预算 = quota × 可种面积
// Absolute: water_quota_mm 直接作为 Σ area × requirement 的上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterQuotaBasis {
    PerHectareDepth,
    Absolute,
}

impl Default for WaterQuotaBasis {
    fn default() -> Self {
        WaterQuotaBasis::PerHectareDepth
    }
}

impl WaterQuotaBasis {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "per_hectare_depth" | "depth" => Some(WaterQuotaBasis::PerHectareDepth),
            "absolute" => Some(WaterQuotaBasis::Absolute),
            _ => None,
        }
    }

    /// 计算田块水量预算 (mm·ha)
    pub fn budget(&self, water_quota_mm: f64, plantable_area_ha: f64) -> f64 {
        match self {
            WaterQuotaBasis::PerHectareDepth => water_quota_mm * plantable_area_ha,
            WaterQuotaBasis::Absolute => water_quota_mm,
        }
    }
}
