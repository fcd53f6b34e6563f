// ==========================================
// ACA-O 作物面积优化引擎 - Plan-B 季中重算
// ==========================================
// 输入: 基线方案 + 已播种面积 + 新配额/新价格
// 输出: 引用基线的新方案 + 变更说明
// 红线:
// - 已播种面积只增不减 (作为面积下界)
// - 配额不足以覆盖已播种用水时返回超配额方案 + 告警，不报错
// - 基线候选之外的已播种作物按已播种面积固定计入，不报错
// - 基线方案不可修改
// ==========================================

use crate::domain::features::{CriteriaWeights, CropFeatures};
use crate::domain::field::Crop;
use crate::domain::fuzzy::TriangularFuzzyNumber;
use crate::domain::plan::{AllocationPlan, CandidateCrop, PlanWarning};
use crate::domain::types::{PlanKind, PlanStatus};
use crate::engine::allocation::{AllocationOptimizer, AllocationProblem};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::feature_builder::FeatureBuilder;
use crate::engine::suitability::SuitabilityScorer;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 面积变化小于该值视为未变 (消息保留一位小数)
const AREA_CHANGE_TOL: f64 = 0.05;

// ==========================================
// 重算原因
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ChangeContext {
    /// (原配额, 新配额)
    pub quota: Option<(f64, f64)>,
    /// 调价的作物
    pub repriced: BTreeSet<String>,
    /// (已播种用水, 预算)
    pub over_quota: Option<(f64, f64)>,
    /// 计划外已播种的作物
    pub unplanned: BTreeSet<String>,
}

impl ChangeContext {
    fn cause(&self, crop_id: &str) -> &'static str {
        if self.unplanned.contains(crop_id) {
            return "planting outside the plan";
        }
        match self.quota {
            Some((old, new)) if new < old => "quota cut",
            Some((old, new)) if new > old => "quota increase",
            _ if self.repriced.contains(crop_id) => "price update",
            _ if !self.repriced.is_empty() => "price changes",
            _ => "re-optimization",
        }
    }
}

// ==========================================
// PlanBReOptimizer
// ==========================================
pub struct PlanBReOptimizer {
    optimizer: Arc<AllocationOptimizer>,
    scorer: SuitabilityScorer,
    weights: CriteriaWeights,
}

impl PlanBReOptimizer {
    pub fn new(optimizer: Arc<AllocationOptimizer>, weights: CriteriaWeights) -> Self {
        Self {
            optimizer,
            scorer: SuitabilityScorer::new(),
            weights,
        }
    }

    /// 季中重算
    ///
    /// # 参数
    /// - `prior`: 该田块该季度的最新方案
    /// - `locked_area`: crop_id -> 已播种面积
    /// - `updated_quota_mm`: 新配额
    /// - `updated_prices`: crop_id -> 新价格
    pub fn replan(
        &self,
        prior: &AllocationPlan,
        locked_area: &BTreeMap<String, f64>,
        updated_quota_mm: Option<f64>,
        updated_prices: Option<&BTreeMap<String, f64>>,
    ) -> EngineResult<AllocationPlan> {
        self.replan_with_crops(prior, locked_area, updated_quota_mm, updated_prices, &[])
    }

    /// 季中重算，`crops` 为作物目录，用于补全计划外已播种作物的需水与单产
    #[instrument(skip_all, fields(
        baseline = %prior.plan_id,
        field_id = %prior.field_id,
        season = %prior.season,
        locked = locked_area.len()
    ))]
    pub fn replan_with_crops(
        &self,
        prior: &AllocationPlan,
        locked_area: &BTreeMap<String, f64>,
        updated_quota_mm: Option<f64>,
        updated_prices: Option<&BTreeMap<String, f64>>,
        crops: &[Crop],
    ) -> EngineResult<AllocationPlan> {
        let inputs = &prior.inputs;
        let known: BTreeSet<&str> = inputs.candidates.iter().map(|c| c.crop_id.as_str()).collect();

        // 1. 覆盖参数校验
        let old_quota = inputs.field.water_quota_mm;
        let quota = match updated_quota_mm {
            Some(q) if !q.is_finite() || q < 0.0 => {
                return Err(EngineError::validation(
                    "updated_quota_mm",
                    format!("配额必须为非负数, 实际={}", q),
                ))
            }
            Some(q) => q,
            None => old_quota,
        };

        let mut candidates: Vec<CandidateCrop> = inputs.candidates.clone();
        let mut ctx = ChangeContext::default();
        if let Some(prices) = updated_prices {
            for (crop_id, price) in prices {
                if !known.contains(crop_id.as_str()) {
                    return Err(EngineError::not_found("candidate_crop", crop_id.clone()));
                }
                if !price.is_finite() || *price < 0.0 {
                    return Err(EngineError::validation(
                        format!("updated_prices.{}", crop_id),
                        format!("价格必须为非负数, 实际={}", price),
                    ));
                }
            }
            for c in candidates.iter_mut() {
                if let Some(p) = prices.get(&c.crop_id) {
                    if (p - c.price_per_kg).abs() > f64::EPSILON {
                        ctx.repriced.insert(c.crop_id.clone());
                    }
                    c.price_per_kg = *p;
                }
            }
        }

        let field = inputs.field.with_quota(quota);
        let area = field.total_plantable_area_ha;
        let basis = self.optimizer.config().water_quota_basis;
        let budget = basis.budget(quota, area);

        // 2. 配额变化: 重算用水覆盖率并重新评分
        if (quota - old_quota).abs() > f64::EPSILON {
            ctx.quota = Some((old_quota, quota));
            self.rescore(&mut candidates, budget / area)?;
        }

        let mut warnings: Vec<PlanWarning> = prior
            .warnings
            .iter()
            .filter(|w| matches!(w, PlanWarning::DegradedData { .. }))
            .cloned()
            .collect();

        // 3. 基线候选之外的已播种作物: 面积固定，收益按 0 计，用水计入预算
        for (crop_id, area_ha) in locked_area {
            if known.contains(crop_id.as_str()) || *area_ha == 0.0 {
                continue;
            }
            let crop = crops.iter().find(|c| &c.crop_id == crop_id);
            let fixed = fixed_candidate(crop_id, crop);
            warn!(crop_id = %crop_id, area_ha, "已播种作物不在基线候选中，按固定面积计入");
            warnings.push(PlanWarning::DegradedData {
                crop_id: Some(crop_id.clone()),
                detail: format!(
                    "planted outside the plan; {:.1} ha kept fixed at zero profit{}",
                    area_ha,
                    if crop.and_then(|c| c.water_requirement_mm).is_some() {
                        ""
                    } else {
                        ", water requirement defaulted"
                    }
                ),
            });
            ctx.unplanned.insert(crop_id.clone());
            candidates.push(fixed);
        }

        // 4. 已播种用水超出预算: 预算抬高到已播种用水，标记超配额
        let locked_water: f64 = candidates
            .iter()
            .map(|c| locked_area.get(&c.crop_id).copied().unwrap_or(0.0) * c.water_requirement_mm)
            .sum();
        let effective_budget = if locked_water > budget + self.optimizer.config().epsilon {
            warn!(locked_water, budget, "已播种用水超过配额");
            warnings.push(PlanWarning::OverQuota {
                locked_water_mm_ha: locked_water,
                water_budget_mm_ha: budget,
            });
            ctx.over_quota = Some((locked_water, budget));
            locked_water
        } else {
            budget
        };

        // 5. 求解
        let problem = AllocationProblem {
            field: &field,
            season: &prior.season,
            candidates: &candidates,
            min_area_per_selected_crop_ha: inputs.min_area_per_selected_crop_ha,
            max_crops_selected: inputs.max_crops_selected,
            locked_area,
            water_budget_mm_ha: effective_budget,
            kind: PlanKind::PlanB,
            baseline_plan_id: Some(prior.plan_id.as_str()),
        };
        let mut plan = self.optimizer.solve(&problem)?;

        warnings.append(&mut plan.warnings);
        plan.warnings = warnings;
        plan.message = Some(change_summary(prior, &plan, &ctx));

        info!(plan_id = %plan.plan_id, "Plan-B 重算完成");
        Ok(plan)
    }

    /// 用新的每公顷水深重算 water_coverage_ratio，所有候选都带特征时才重评分
    fn rescore(&self, candidates: &mut [CandidateCrop], water_per_ha_mm: f64) -> EngineResult<()> {
        let mut scored: Vec<&mut CandidateCrop> =
            candidates.iter_mut().filter(|c| !c.fixed_area).collect();
        if scored.is_empty() || scored.iter().any(|c| c.features.is_none()) {
            return Ok(());
        }
        let features: Vec<CropFeatures> = scored
            .iter_mut()
            .filter_map(|c| {
                let requirement = c.water_requirement_mm;
                let crop_id = c.crop_id.clone();
                c.features.as_mut().map(|f| {
                    f.water_coverage_ratio = TriangularFuzzyNumber::crisp(
                        FeatureBuilder::water_coverage(water_per_ha_mm, requirement),
                    );
                    CropFeatures {
                        crop_id,
                        features: f.clone(),
                    }
                })
            })
            .collect();

        let scores = self.scorer.score(&features, &self.weights)?;
        for (c, s) in scored.into_iter().zip(scores) {
            c.suitability_score = s.score;
        }
        Ok(())
    }
}

/// 计划外已播种作物的固定候选: 无价格，需水取目录值或按敏感度缺省
fn fixed_candidate(crop_id: &str, crop: Option<&Crop>) -> CandidateCrop {
    let sensitivity = crop.and_then(|c| c.water_sensitivity).unwrap_or_default();
    CandidateCrop {
        crop_id: crop_id.to_string(),
        suitability_score: 0.0,
        expected_yield_t_ha: crop.and_then(|c| c.base_yield_t_per_ha).unwrap_or(0.0),
        price_per_kg: 0.0,
        water_requirement_mm: crop
            .and_then(|c| c.water_requirement_mm)
            .unwrap_or_else(|| sensitivity.default_water_requirement_mm()),
        estimated_cost_per_ha: 0.0,
        water_sensitivity: sensitivity,
        yield_stats: None,
        features: None,
        fixed_area: true,
    }
}

// ==========================================
// 变更说明
// ==========================================

/// 生成相对基线方案的变更说明，多条以 "; " 连接
pub fn change_summary(prior: &AllocationPlan, next: &AllocationPlan, ctx: &ChangeContext) -> String {
    let mut parts = Vec::new();

    if let Some((locked_water, budget)) = ctx.over_quota {
        parts.push(format!(
            "Over-quota: planted area needs {:.1} mm·ha but the quota allows {:.1} mm·ha",
            locked_water, budget
        ));
    }

    let mut crop_ids: Vec<&str> = next.allocations.iter().map(|a| a.crop_id.as_str()).collect();
    for a in &prior.allocations {
        if !crop_ids.contains(&a.crop_id.as_str()) {
            crop_ids.push(&a.crop_id);
        }
    }

    for crop_id in crop_ids {
        let old = prior.area_of(crop_id);
        let new = next.area_of(crop_id);
        if (new - old).abs() < AREA_CHANGE_TOL {
            continue;
        }
        let line = if old <= 0.0 {
            format!("{} added with {:.1} ha due to {}", crop_id, new, ctx.cause(crop_id))
        } else if new <= 0.0 {
            format!("{} removed (was {:.1} ha) due to {}", crop_id, old, ctx.cause(crop_id))
        } else if new < old {
            format!(
                "{} area reduced from {:.1} to {:.1} ha due to {}",
                crop_id, old, new, ctx.cause(crop_id)
            )
        } else {
            format!(
                "{} area increased from {:.1} to {:.1} ha due to {}",
                crop_id, old, new, ctx.cause(crop_id)
            )
        };
        parts.push(line);
    }

    if next.status == PlanStatus::Infeasible {
        if let Some(reason) = &next.infeasibility {
            parts.push(format!("No feasible allocation: {}", reason));
        }
    }

    if parts.is_empty() {
        format!("No change versus baseline plan {}", prior.plan_id)
    } else {
        parts.join("; ")
    }
}
