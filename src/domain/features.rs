// ==========================================
// ACA-O 作物面积优化引擎 - 特征向量与评分
// ==========================================
// 依据: ACA-O 数据模型 - CropFeatureVector / CriteriaWeights / SuitabilityScore
// ==========================================

use crate::domain::fuzzy::TriangularFuzzyNumber;
use crate::domain::types::WaterSensitivity;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// Criterion - 评分准则
// ==========================================
// 全部为"越大越好"口径: 需水敏感度与生育期在评分时取倒数
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    SoilSuitability,
    WaterCoverageRatio,
    HistoricalYield,
    WaterSensitivity,
    GrowthDuration,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::SoilSuitability,
        Criterion::WaterCoverageRatio,
        Criterion::HistoricalYield,
        Criterion::WaterSensitivity,
        Criterion::GrowthDuration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::SoilSuitability => "soil_suitability",
            Criterion::WaterCoverageRatio => "water_coverage_ratio",
            Criterion::HistoricalYield => "historical_yield",
            Criterion::WaterSensitivity => "water_sensitivity",
            Criterion::GrowthDuration => "growth_duration",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Criterion::ALL.into_iter().find(|c| c.as_str() == s.trim())
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// CriteriaWeights - 准则权重
// ==========================================
// 键集合必须与 Criterion::ALL 完全一致；权重非负，评分前内部归一化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct CriteriaWeights {
    weights: BTreeMap<Criterion, f64>,
}

impl CriteriaWeights {
    /// 从命名映射构造并校验
    pub fn from_named(named: &BTreeMap<String, f64>) -> EngineResult<Self> {
        let mut weights = BTreeMap::new();
        for (name, w) in named {
            let criterion = Criterion::parse(name).ok_or_else(|| EngineError::Validation {
                field: format!("weights.{}", name),
                message: "未知评分准则".to_string(),
            })?;
            if !w.is_finite() || *w < 0.0 {
                return Err(EngineError::Validation {
                    field: format!("weights.{}", name),
                    message: format!("权重必须为非负有限数, 实际={}", w),
                });
            }
            weights.insert(criterion, *w);
        }
        Self::from_map(weights)
    }

    pub fn from_map(weights: BTreeMap<Criterion, f64>) -> EngineResult<Self> {
        for c in Criterion::ALL {
            if !weights.contains_key(&c) {
                return Err(EngineError::Validation {
                    field: format!("weights.{}", c),
                    message: "缺少评分准则权重".to_string(),
                });
            }
        }
        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(EngineError::Validation {
                field: "weights".to_string(),
                message: "权重之和必须大于 0".to_string(),
            });
        }
        Ok(Self { weights })
    }

    /// 等权
    pub fn uniform() -> Self {
        Self {
            weights: Criterion::ALL.into_iter().map(|c| (c, 1.0)).collect(),
        }
    }

    pub fn raw(&self, criterion: Criterion) -> f64 {
        self.weights.get(&criterion).copied().unwrap_or(0.0)
    }

    /// 归一化后的权重 (和为 1)
    pub fn normalized(&self) -> BTreeMap<Criterion, f64> {
        let total: f64 = self.weights.values().sum();
        self.weights.iter().map(|(c, w)| (*c, w / total)).collect()
    }
}

impl Default for CriteriaWeights {
    fn default() -> Self {
        let weights = [
            (Criterion::SoilSuitability, 0.25),
            (Criterion::WaterCoverageRatio, 0.25),
            (Criterion::HistoricalYield, 0.25),
            (Criterion::WaterSensitivity, 0.15),
            (Criterion::GrowthDuration, 0.10),
        ]
        .into_iter()
        .collect();
        Self { weights }
    }
}

impl TryFrom<BTreeMap<String, f64>> for CriteriaWeights {
    type Error = EngineError;

    fn try_from(value: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::from_named(&value)
    }
}

impl From<CriteriaWeights> for BTreeMap<String, f64> {
    fn from(value: CriteriaWeights) -> Self {
        value
            .weights
            .into_iter()
            .map(|(c, w)| (c.as_str().to_string(), w))
            .collect()
    }
}

// ==========================================
// CropFeatureVector - 单作物特征向量
// ==========================================
// 同一次优化运行内不可变；土壤/预报/价格变化时重新计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropFeatureVector {
    pub soil_suitability: TriangularFuzzyNumber,      // [0,1]
    pub water_coverage_ratio: TriangularFuzzyNumber,  // [0,1]
    pub historical_yield_t_ha: TriangularFuzzyNumber, // >= 0
    pub water_sensitivity: WaterSensitivity,
    pub growth_duration_days: TriangularFuzzyNumber,  // > 0
}

impl CropFeatureVector {
    /// 全精确值构造
    pub fn crisp(
        soil_suitability: f64,
        water_coverage_ratio: f64,
        historical_yield_t_ha: f64,
        water_sensitivity: WaterSensitivity,
        growth_duration_days: u32,
    ) -> Self {
        Self {
            soil_suitability: TriangularFuzzyNumber::crisp(soil_suitability),
            water_coverage_ratio: TriangularFuzzyNumber::crisp(water_coverage_ratio),
            historical_yield_t_ha: TriangularFuzzyNumber::crisp(historical_yield_t_ha),
            water_sensitivity,
            growth_duration_days: TriangularFuzzyNumber::crisp(growth_duration_days as f64),
        }
    }

    /// 值域校验，返回带字段路径的错误
    pub fn validate(&self, crop_id: &str) -> EngineResult<()> {
        let check = |name: &str, v: &TriangularFuzzyNumber, lo: f64, hi: f64| {
            if !v.is_finite() || !v.within(lo, hi) {
                Err(EngineError::Validation {
                    field: format!("features.{}.{}", crop_id, name),
                    message: format!(
                        "取值越界 ({:.4}, {:.4}, {:.4}), 期望 [{}, {}]",
                        v.lower, v.mode, v.upper, lo, hi
                    ),
                })
            } else {
                Ok(())
            }
        };
        check("soil_suitability", &self.soil_suitability, 0.0, 1.0)?;
        check("water_coverage_ratio", &self.water_coverage_ratio, 0.0, 1.0)?;
        check("historical_yield_t_ha", &self.historical_yield_t_ha, 0.0, f64::MAX)?;
        if !self.growth_duration_days.is_finite() || self.growth_duration_days.lower <= 0.0 {
            return Err(EngineError::Validation {
                field: format!("features.{}.growth_duration_days", crop_id),
                message: "生育期必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

/// 带作物ID的特征向量 (保持输入顺序，用于平局裁决)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropFeatures {
    pub crop_id: String,
    pub features: CropFeatureVector,
}

// ==========================================
// SuitabilityScore - 适宜度评分
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityScore {
    pub crop_id: String,
    pub score: f64,                              // [0,1]
    pub closeness: TriangularFuzzyNumber,        // 去模糊化前的贴近度
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_require_exact_keys() {
        let mut named: BTreeMap<String, f64> = Criterion::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), 1.0))
            .collect();
        assert!(CriteriaWeights::from_named(&named).is_ok());

        named.insert("price".to_string(), 1.0);
        assert!(CriteriaWeights::from_named(&named).is_err());

        named.remove("price");
        named.remove("growth_duration");
        match CriteriaWeights::from_named(&named) {
            Err(EngineError::Validation { field, .. }) => assert_eq!(field, "weights.growth_duration"),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_weights_are_normalized() {
        let named: BTreeMap<String, f64> = Criterion::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), 4.0))
            .collect();
        let w = CriteriaWeights::from_named(&named).unwrap();
        let n = w.normalized();
        assert!((n.values().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((n[&Criterion::HistoricalYield] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_weights_serde_by_name() {
        let json = serde_json::to_string(&CriteriaWeights::uniform()).unwrap();
        assert!(json.contains("\"soil_suitability\":1.0"));
        let back: CriteriaWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CriteriaWeights::uniform());

        let bad = r#"{"soil_suitability": -1.0}"#;
        assert!(serde_json::from_str::<CriteriaWeights>(bad).is_err());
    }

    #[test]
    fn test_feature_validation() {
        let mut v = CropFeatureVector::crisp(0.8, 0.5, 4.0, WaterSensitivity::Low, 120);
        assert!(v.validate("C1").is_ok());
        v.water_coverage_ratio = TriangularFuzzyNumber::crisp(1.2);
        assert!(v.validate("C1").is_err());
    }
}
