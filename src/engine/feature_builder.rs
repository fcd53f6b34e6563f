// ==========================================
// ACA-O 作物面积优化引擎 - 特征构建
// ==========================================
// 输入: 田块 + 作物目录 + 价格 + 历史产量 + 情景覆盖
// 输出: 每个作物的特征向量与经济参数 (候选作物)
// 红线:
// - 可选数据缺失用文档缺省值替代，并输出 DegradedData 告警
// - 承重数据 (可种面积) 缺失直接报错
// ==========================================

use crate::config::{EngineConfig, FeatureConfig, ScoringConfig};
use crate::domain::features::{CropFeatureVector, CropFeatures};
use crate::domain::field::{Crop, Field};
use crate::domain::fuzzy::TriangularFuzzyNumber;
use crate::domain::market::{PriceQuote, YieldRecord};
use crate::domain::plan::{CandidateCrop, PlanWarning};
use crate::domain::scenario::Scenario;
use crate::domain::types::WaterQuotaBasis;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::yield_history::YieldHistoryAnalyzer;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, instrument};

// ==========================================
// FeatureSet - 构建结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// 已应用情景覆盖的田块快照
    pub field: Field,
    pub water_budget_mm_ha: f64,
    pub crop_features: Vec<CropFeatures>,
    /// suitability_score 在评分后回填
    pub candidates: Vec<CandidateCrop>,
    pub warnings: Vec<PlanWarning>,
}

impl FeatureSet {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

// ==========================================
// FeatureBuilder
// ==========================================
pub struct FeatureBuilder {
    features: FeatureConfig,
    scoring: ScoringConfig,
    basis: WaterQuotaBasis,
}

impl FeatureBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            features: config.features.clone(),
            scoring: config.scoring.clone(),
            basis: config.allocation.water_quota_basis,
        }
    }

    /// 每公顷可用水深 / 作物需水，截断到 [0,1]
    pub fn water_coverage(water_per_ha_mm: f64, requirement_mm: f64) -> f64 {
        if requirement_mm <= 0.0 {
            1.0
        } else {
            (water_per_ha_mm / requirement_mm).clamp(0.0, 1.0)
        }
    }

    /// 构建特征与候选作物
    ///
    /// # 参数
    /// - `prices`: crop_id -> 实际应用价格
    /// - `history`: 田块的历史产量记录 (可含其他作物)
    #[instrument(skip_all, fields(field_id = %field.field_id, crops = crops.len()))]
    pub fn build(
        &self,
        field: &Field,
        crops: &[Crop],
        prices: &BTreeMap<String, PriceQuote>,
        history: &[YieldRecord],
        scenario: &Scenario,
    ) -> EngineResult<FeatureSet> {
        // 1. 承重字段校验
        if !field.total_plantable_area_ha.is_finite() || field.total_plantable_area_ha <= 0.0 {
            return Err(EngineError::UpstreamData {
                source_name: "field_data".to_string(),
                message: format!(
                    "田块 {} 可种面积缺失或非法: {}",
                    field.field_id, field.total_plantable_area_ha
                ),
            });
        }

        let quota = match scenario.water_quota_mm {
            Some(q) if !q.is_finite() || q < 0.0 => {
                return Err(EngineError::validation(
                    "scenario.water_quota_mm",
                    format!("配额必须为非负数, 实际={}", q),
                ))
            }
            Some(q) => q,
            None => field.water_quota_mm,
        };
        if !quota.is_finite() || quota < 0.0 {
            return Err(EngineError::validation(
                "field.water_quota_mm",
                format!("配额必须为非负数, 实际={}", quota),
            ));
        }
        let price_factor = scenario.price_factor.unwrap_or(1.0);
        if !price_factor.is_finite() || price_factor <= 0.0 {
            return Err(EngineError::validation(
                "scenario.price_factor",
                format!("价格系数必须大于 0, 实际={}", price_factor),
            ));
        }

        let field = field.with_quota(quota);
        let area = field.total_plantable_area_ha;
        let water_budget = self.basis.budget(quota, area);
        let water_per_ha = water_budget / area;

        let mut warnings = Vec::new();
        if field.soil_ph.is_none() && field.soil_ec.is_none() {
            warnings.push(PlanWarning::DegradedData {
                crop_id: None,
                detail: "field soil pH/EC missing; default soil suitability used".to_string(),
            });
        }

        // 2. 逐作物构建
        let analyzer = YieldHistoryAnalyzer::new(self.features.recency_decay);
        let mut seen = HashSet::new();
        let mut crop_features = Vec::new();
        let mut candidates = Vec::new();

        for crop in crops {
            if !seen.insert(crop.crop_id.as_str()) {
                return Err(EngineError::validation(
                    format!("crops.{}", crop.crop_id),
                    "作物ID重复",
                ));
            }
            let id = crop.crop_id.as_str();
            let mut degrade = |detail: String| {
                warnings.push(PlanWarning::DegradedData {
                    crop_id: Some(id.to_string()),
                    detail,
                })
            };

            // 价格 (无记录则无法计算收益，排除)
            let quote = match prices.get(id) {
                Some(q) if q.price_per_kg.is_finite() && q.price_per_kg >= 0.0 => q,
                _ => {
                    degrade("no usable price record; crop excluded".to_string());
                    continue;
                }
            };
            if quote.is_stale() {
                degrade(format!(
                    "price from {} applied for {}",
                    quote.applied_date, quote.requested_date
                ));
            }

            let sensitivity = crop.water_sensitivity.unwrap_or_else(|| {
                degrade(format!(
                    "water sensitivity missing; defaulted to {}",
                    self.features.default_water_sensitivity
                ));
                self.features.default_water_sensitivity
            });

            let water_requirement = match crop.water_requirement_mm {
                Some(w) if w.is_finite() && w >= 0.0 => w,
                _ => {
                    let w = sensitivity.default_water_requirement_mm();
                    degrade(format!("water requirement missing; defaulted to {:.0} mm", w));
                    w
                }
            };

            // 历史产量 -> 模糊产量；无历史时退回基础产量
            let stats = analyzer.stats(
                history
                    .iter()
                    .filter(|r| r.crop_id == id && r.field_id == field.field_id),
            );
            let base_yield = crop
                .base_yield_t_per_ha
                .filter(|y| y.is_finite() && *y >= 0.0);
            let (expected_yield, yield_tfn) = match (&stats, base_yield) {
                (Some(s), _) => {
                    let sd = s.std_dev();
                    let m = s.weighted_mean_t_ha;
                    (m, TriangularFuzzyNumber::new((m - sd).max(0.0), m, m + sd))
                }
                (None, Some(b)) => {
                    degrade("no yield history; base yield used".to_string());
                    (b, TriangularFuzzyNumber::crisp(b))
                }
                (None, None) => {
                    degrade("no yield history or base yield; crop excluded".to_string());
                    continue;
                }
            };

            let growth = match crop.growth_duration_days.filter(|d| *d > 0) {
                Some(d) => TriangularFuzzyNumber::crisp(d as f64),
                None => {
                    let d = self.features.default_growth_duration_days as f64;
                    degrade(format!("growth duration missing; defaulted to {:.0} days", d));
                    TriangularFuzzyNumber::new(0.75 * d, d, 1.25 * d)
                }
            };

            let cost = match crop.estimated_cost_per_ha {
                Some(c) if c.is_finite() && c >= 0.0 => c,
                _ => {
                    degrade("estimated cost missing; defaulted to 0".to_string());
                    0.0
                }
            };

            let (soil, soil_measured) = self.soil_suitability(&field, crop);
            let field_has_soil = field.soil_ph.is_some() || field.soil_ec.is_some();
            if field_has_soil && !soil_measured {
                degrade("crop pH/EC limits missing; default soil suitability used".to_string());
            }

            let vector = CropFeatureVector {
                soil_suitability: soil,
                water_coverage_ratio: TriangularFuzzyNumber::crisp(Self::water_coverage(
                    water_per_ha,
                    water_requirement,
                )),
                historical_yield_t_ha: yield_tfn,
                water_sensitivity: sensitivity,
                growth_duration_days: growth,
            };

            crop_features.push(CropFeatures {
                crop_id: id.to_string(),
                features: vector.clone(),
            });
            candidates.push(CandidateCrop {
                crop_id: id.to_string(),
                suitability_score: 0.0,
                expected_yield_t_ha: expected_yield,
                price_per_kg: quote.price_per_kg * price_factor,
                water_requirement_mm: water_requirement,
                estimated_cost_per_ha: cost,
                water_sensitivity: sensitivity,
                yield_stats: stats,
                features: Some(vector),
                fixed_area: false,
            });
        }

        debug!(
            candidates = candidates.len(),
            warnings = warnings.len(),
            "特征构建完成"
        );

        Ok(FeatureSet {
            field,
            water_budget_mm_ha: water_budget,
            crop_features,
            candidates,
            warnings,
        })
    }

    // ==========================================
    // 土壤适宜度
    // ==========================================

    /// 返回 (模糊适宜度, 是否基于实测)
    ///
    /// pH 落在 [ph_min, ph_max] 内为 1，偏离后在 ph_tolerance 内线性降为 0；
    /// EC 不超过 ec_max 为 1，超出部分按比例下降；多项取最小值
    fn soil_suitability(&self, field: &Field, crop: &Crop) -> (TriangularFuzzyNumber, bool) {
        let mut parts = Vec::with_capacity(2);

        if let (Some(ph), Some(a), Some(b)) = (field.soil_ph, crop.ph_min, crop.ph_max) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let off = if ph < lo {
                lo - ph
            } else if ph > hi {
                ph - hi
            } else {
                0.0
            };
            parts.push((1.0 - off / self.features.ph_tolerance).max(0.0));
        }

        if let (Some(ec), Some(ec_max)) = (field.soil_ec, crop.ec_max) {
            let fit = if ec <= ec_max {
                1.0
            } else if ec_max <= 0.0 {
                0.0
            } else {
                (1.0 - (ec - ec_max) / ec_max).max(0.0)
            };
            parts.push(fit);
        }

        if parts.is_empty() {
            return (
                TriangularFuzzyNumber::spread(
                    self.features.default_soil_suitability,
                    self.scoring.missing_soil_spread,
                    0.0,
                    1.0,
                ),
                false,
            );
        }

        let value = parts.iter().copied().fold(1.0, f64::min);
        let spread = if parts.len() == 2 {
            self.scoring.measured_soil_spread
        } else {
            (self.scoring.measured_soil_spread + self.scoring.missing_soil_spread) / 2.0
        };
        (TriangularFuzzyNumber::spread(value, spread, 0.0, 1.0), true)
    }
}
