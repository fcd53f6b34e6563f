// ==========================================
// ACA-O 作物面积优化引擎 - 面积分配优化器
// ==========================================
// 模型 (最大化):
//   Σ a_c × profit_c × factor_c
//   factor_c = floor + (1 − floor) × score_c   (适宜度折算，显式写入方案)
// 约束:
//   Σ a_c ≤ 可种面积                         (土地)
//   Σ a_c × water_c ≤ 水量预算               (用水)
//   a_c ≤ U_c × y_c,  a_c ≥ m × y_c          (选中指示 y_c ∈ {0,1} 门控最小面积)
//   Σ y_c ≤ K                                (可选: 作物数上限)
//   a_c ≥ locked_c                           (Plan-B: 已播种面积)
// 不可行策略:
//   1. 严格模型
//   2. 放宽最小面积，再放宽作物数上限
//   3. 仍无解 -> 零分配方案 + 不可行原因 (正常返回，不报错)
// ==========================================

use crate::config::{AllocationConfig, RiskConfig};
use crate::domain::field::Field;
use crate::domain::plan::{
    AllocationPlan, CandidateCrop, CropAllocation, InfeasibilityReason, PlanInputs, PlanWarning,
    RelaxedConstraint, SolveSummary,
};
use crate::domain::types::{PlanKind, PlanStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::risk::RiskAssessor;
use crate::engine::solver::{
    BranchAndBoundSolver, MipModel, MipSolver, Relation, SolveOutcome, SolveStats, VarId,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// AllocationProblem - 单次求解的完整输入
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocationProblem<'a> {
    pub field: &'a Field,
    pub season: &'a str,
    pub candidates: &'a [CandidateCrop],
    pub min_area_per_selected_crop_ha: f64,
    pub max_crops_selected: Option<usize>,
    /// crop_id -> 已播种面积 (下界)
    pub locked_area: &'a BTreeMap<String, f64>,
    pub water_budget_mm_ha: f64,
    pub kind: PlanKind,
    pub baseline_plan_id: Option<&'a str>,
}

/// 某一轮求解所用的约束集合
#[derive(Debug, Clone, Copy)]
struct Stage {
    min_area: f64,
    max_crops: Option<usize>,
}

/// 模型中的作物变量
#[derive(Debug, Clone, Copy)]
struct CropVars {
    index: usize, // candidates 下标
    area: VarId,
    selected: VarId,
}

#[derive(Debug, Clone)]
struct StageResult {
    areas: Vec<f64>, // 与 candidates 对齐
    best_effort: bool,
    stats: SolveStats,
}

#[derive(Debug)]
enum StageOutcome {
    Solved(StageResult),
    Infeasible(SolveStats),
    TimedOut(SolveStats),
}

// ==========================================
// AllocationOptimizer
// ==========================================
pub struct AllocationOptimizer {
    config: AllocationConfig,
    risk: RiskAssessor,
    solver: Arc<dyn MipSolver>,
}

impl AllocationOptimizer {
    pub fn new(config: AllocationConfig, risk: RiskConfig) -> Self {
        Self::with_solver(config, risk, Arc::new(BranchAndBoundSolver::new()))
    }

    /// 指定求解后端
    pub fn with_solver(config: AllocationConfig, risk: RiskConfig, solver: Arc<dyn MipSolver>) -> Self {
        Self {
            config,
            risk: RiskAssessor::new(risk),
            solver,
        }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// 季初分配
    ///
    /// # 参数
    /// - `field`: 田块 (只读)
    /// - `season`: 季度
    /// - `candidates`: 已评分的候选作物
    /// - `min_area_per_selected_crop_ha`: 选中作物的最小面积
    /// - `max_crops_selected`: 作物数上限
    pub fn allocate(
        &self,
        field: &Field,
        season: &str,
        candidates: &[CandidateCrop],
        min_area_per_selected_crop_ha: f64,
        max_crops_selected: Option<usize>,
    ) -> EngineResult<AllocationPlan> {
        let locked = BTreeMap::new();
        let problem = AllocationProblem {
            field,
            season,
            candidates,
            min_area_per_selected_crop_ha,
            max_crops_selected,
            locked_area: &locked,
            water_budget_mm_ha: self
                .config
                .water_quota_basis
                .budget(field.water_quota_mm, field.total_plantable_area_ha),
            kind: PlanKind::Recommendation,
            baseline_plan_id: None,
        };
        self.solve(&problem)
    }

    /// 求解完整问题 (推荐 / Plan-B 共用)
    #[instrument(skip_all, fields(
        field_id = %problem.field.field_id,
        season = %problem.season,
        kind = %problem.kind,
        candidates = problem.candidates.len()
    ))]
    pub fn solve(&self, problem: &AllocationProblem<'_>) -> EngineResult<AllocationPlan> {
        self.validate(problem)?;
        let eps = self.config.epsilon;
        let n = problem.candidates.len();

        let coefs: Vec<f64> = problem
            .candidates
            .iter()
            .map(|c| c.expected_profit_per_ha() * self.config.suitability_factor(c.suitability_score))
            .collect();
        let locked: Vec<f64> = problem
            .candidates
            .iter()
            .map(|c| problem.locked_area.get(&c.crop_id).copied().unwrap_or(0.0))
            .collect();
        let upper: Vec<f64> = problem
            .candidates
            .iter()
            .zip(&locked)
            .map(|(c, l)| {
                if c.fixed_area {
                    *l
                } else {
                    self.upper_bound(problem, c).max(*l)
                }
            })
            .collect();

        // 参与建模: 收益为正 或 有锁定面积
        let eligible: Vec<usize> = (0..n).filter(|&i| coefs[i] > eps || locked[i] > 0.0).collect();
        let plantable_profit = eligible.iter().any(|&i| coefs[i] > eps && upper[i] > eps);

        let mut warnings = Vec::new();
        let mut relaxed = Vec::new();

        let outcome = if eligible.is_empty() {
            None
        } else {
            let strict = Stage {
                min_area: problem.min_area_per_selected_crop_ha,
                max_crops: problem.max_crops_selected,
            };
            let mut stages = vec![(strict, Vec::new())];
            if strict.min_area > 0.0 {
                stages.push((
                    Stage { min_area: 0.0, ..strict },
                    vec![RelaxedConstraint::MinimumArea],
                ));
            }
            if strict.max_crops.is_some() {
                let mut r = stages.last().map(|(_, r)| r.clone()).unwrap_or_default();
                r.push(RelaxedConstraint::Cardinality);
                stages.push((Stage { min_area: 0.0, max_crops: None }, r));
            }

            // Err(true): 超时无解; Err(false): 约束无解
            let mut found: Option<Result<StageResult, bool>> = None;
            let mut total_stats = SolveStats::default();
            for (stage, stage_relaxed) in stages {
                let outcome =
                    self.solve_stage(problem, &eligible, &coefs, &locked, &upper, stage)?;
                match outcome {
                    StageOutcome::Solved(result) => {
                        accumulate(&mut total_stats, &result.stats);
                        let total: f64 = result.areas.iter().sum();
                        let empty_but_possible = total <= eps && plantable_profit;
                        if empty_but_possible && !result.best_effort {
                            debug!(?stage_relaxed, "严格约束下为空方案，尝试放宽");
                            found = Some(Ok(result));
                            continue;
                        }
                        relaxed = stage_relaxed;
                        found = Some(Ok(result));
                        break;
                    }
                    StageOutcome::Infeasible(stats) => {
                        accumulate(&mut total_stats, &stats);
                        debug!(?stage_relaxed, "约束无解，尝试放宽");
                        if found.is_none() {
                            found = Some(Err(false));
                        }
                    }
                    StageOutcome::TimedOut(stats) => {
                        accumulate(&mut total_stats, &stats);
                        found = Some(Err(true));
                        break;
                    }
                }
            }
            Some((found, total_stats))
        };

        // 结果归一
        let (areas, status, infeasibility, stats) = match outcome {
            None => {
                let reason = if problem.candidates.is_empty() {
                    InfeasibilityReason::NoCandidates
                } else {
                    InfeasibilityReason::NoProfitableCrop
                };
                (vec![0.0; n], PlanStatus::Infeasible, Some(reason), SolveStats::default())
            }
            Some((Some(Ok(result)), stats)) => {
                let total: f64 = result.areas.iter().sum();
                if result.best_effort {
                    warnings.push(PlanWarning::SolverTimeout {
                        time_limit_ms: self.config.solver_time_limit_ms,
                        nodes_explored: stats.nodes_explored,
                    });
                    let reason = (total <= eps).then(|| InfeasibilityReason::NoSolutionWithinTimeLimit {
                        time_limit_ms: self.config.solver_time_limit_ms,
                    });
                    (result.areas, PlanStatus::BestEffort, reason, stats)
                } else if total <= eps {
                    let reason = self.empty_reason(problem, &coefs, &upper);
                    (vec![0.0; n], PlanStatus::Infeasible, Some(reason), stats)
                } else {
                    (result.areas, PlanStatus::Optimal, None, stats)
                }
            }
            Some((Some(Err(true)), stats)) => {
                // 超时且无可行解: 仅保留已播种面积
                warn!(time_limit_ms = self.config.solver_time_limit_ms, "求解超时且无可行解");
                warnings.push(PlanWarning::SolverTimeout {
                    time_limit_ms: self.config.solver_time_limit_ms,
                    nodes_explored: stats.nodes_explored,
                });
                let reason = InfeasibilityReason::NoSolutionWithinTimeLimit {
                    time_limit_ms: self.config.solver_time_limit_ms,
                };
                (locked.clone(), PlanStatus::BestEffort, Some(reason), stats)
            }
            Some((_, stats)) => {
                let reason = self.empty_reason(problem, &coefs, &upper);
                (vec![0.0; n], PlanStatus::Infeasible, Some(reason), stats)
            }
        };

        for r in &relaxed {
            warnings.push(PlanWarning::ConstraintRelaxed { constraint: *r });
        }

        let allocations = self.build_allocations(problem, &areas, &coefs, &locked);
        let objective_value = areas.iter().zip(&coefs).map(|(a, c)| a * c).sum();

        let plan = AllocationPlan {
            plan_id: Uuid::new_v4().to_string(),
            field_id: problem.field.field_id.clone(),
            season: problem.season.to_string(),
            kind: problem.kind,
            baseline_plan_id: problem.baseline_plan_id.map(|s| s.to_string()),
            created_at: Utc::now().naive_utc(),
            status,
            allocations,
            objective_value,
            infeasibility,
            relaxed_constraints: relaxed,
            warnings,
            message: None,
            inputs: PlanInputs {
                field: problem.field.clone(),
                candidates: problem.candidates.to_vec(),
                min_area_per_selected_crop_ha: problem.min_area_per_selected_crop_ha,
                max_crops_selected: problem.max_crops_selected,
                water_budget_mm_ha: problem.water_budget_mm_ha,
            },
            solve_summary: SolveSummary {
                nodes_explored: stats.nodes_explored,
                lp_iterations: stats.lp_iterations,
                elapsed_ms: stats.elapsed.as_millis() as u64,
            },
        };

        info!(
            plan_id = %plan.plan_id,
            status = %plan.status,
            total_area_ha = plan.total_area_ha(),
            selected = plan.selected().count(),
            "分配求解完成"
        );
        Ok(plan)
    }

    // ==========================================
    // 输入校验
    // ==========================================
    fn validate(&self, p: &AllocationProblem<'_>) -> EngineResult<()> {
        let area = p.field.total_plantable_area_ha;
        if !area.is_finite() || area <= 0.0 {
            return Err(EngineError::validation(
                "field.total_plantable_area_ha",
                format!("可种面积必须大于 0, 实际={}", area),
            ));
        }
        if !p.field.water_quota_mm.is_finite() || p.field.water_quota_mm < 0.0 {
            return Err(EngineError::validation(
                "field.water_quota_mm",
                format!("配额必须为非负数, 实际={}", p.field.water_quota_mm),
            ));
        }
        if !p.water_budget_mm_ha.is_finite() || p.water_budget_mm_ha < 0.0 {
            return Err(EngineError::validation(
                "water_budget_mm_ha",
                format!("水量预算必须为非负数, 实际={}", p.water_budget_mm_ha),
            ));
        }
        if !p.min_area_per_selected_crop_ha.is_finite() || p.min_area_per_selected_crop_ha < 0.0 {
            return Err(EngineError::validation(
                "min_area_per_selected_crop_ha",
                "必须为非负数",
            ));
        }
        if p.max_crops_selected == Some(0) {
            return Err(EngineError::validation("max_crops_selected", "必须大于 0"));
        }

        let mut seen = HashSet::new();
        for c in p.candidates {
            let field = |name: &str| format!("candidates.{}.{}", c.crop_id, name);
            if !seen.insert(c.crop_id.as_str()) {
                return Err(EngineError::validation(
                    format!("candidates.{}", c.crop_id),
                    "作物ID重复",
                ));
            }
            if !(0.0..=1.0).contains(&c.suitability_score) {
                return Err(EngineError::validation(
                    field("suitability_score"),
                    format!("必须位于 [0,1], 实际={}", c.suitability_score),
                ));
            }
            let non_negative = [
                ("expected_yield_t_ha", c.expected_yield_t_ha),
                ("price_per_kg", c.price_per_kg),
                ("water_requirement_mm", c.water_requirement_mm),
                ("estimated_cost_per_ha", c.estimated_cost_per_ha),
            ];
            for (name, v) in non_negative {
                if !v.is_finite() || v < 0.0 {
                    return Err(EngineError::validation(
                        field(name),
                        format!("必须为非负数, 实际={}", v),
                    ));
                }
            }
        }

        let mut locked_total = 0.0;
        for (crop_id, a) in p.locked_area {
            if !seen.contains(crop_id.as_str()) {
                return Err(EngineError::not_found("candidate_crop", crop_id.clone()));
            }
            if !a.is_finite() || *a < 0.0 {
                return Err(EngineError::validation(
                    format!("locked_area.{}", crop_id),
                    format!("已播种面积必须为非负数, 实际={}", a),
                ));
            }
            locked_total += a;
        }
        if locked_total > area + self.config.epsilon {
            return Err(EngineError::validation(
                "locked_area",
                format!("已播种面积合计 {:.2} ha 超过可种面积 {:.2} ha", locked_total, area),
            ));
        }
        Ok(())
    }

    /// U_c = min(可种面积, 水量预算 / 需水)
    fn upper_bound(&self, p: &AllocationProblem<'_>, c: &CandidateCrop) -> f64 {
        let area = p.field.total_plantable_area_ha;
        if c.water_requirement_mm > 0.0 {
            area.min(p.water_budget_mm_ha / c.water_requirement_mm)
        } else {
            area
        }
    }

    // ==========================================
    // 建模 + 求解
    // ==========================================
    fn solve_stage(
        &self,
        p: &AllocationProblem<'_>,
        eligible: &[usize],
        coefs: &[f64],
        locked: &[f64],
        upper: &[f64],
        stage: Stage,
    ) -> EngineResult<StageOutcome> {
        let mut model = MipModel::new();
        let vars: Vec<CropVars> = eligible
            .iter()
            .map(|&i| {
                let id = &p.candidates[i].crop_id;
                let area = model.add_continuous(format!("area[{}]", id), locked[i], upper[i]);
                let selected = model.add_binary(format!("selected[{}]", id));
                if locked[i] > 0.0 {
                    model.variables[selected].lower = 1.0;
                }
                model.set_objective_coef(area, coefs[i]);
                CropVars { index: i, area, selected }
            })
            .collect();

        model.add_constraint(
            "land",
            vars.iter().map(|v| (v.area, 1.0)).collect(),
            Relation::Le,
            p.field.total_plantable_area_ha,
        );
        let water_terms: Vec<(VarId, f64)> = vars
            .iter()
            .map(|v| (v.area, p.candidates[v.index].water_requirement_mm))
            .filter(|(_, w)| *w > 0.0)
            .collect();
        if !water_terms.is_empty() {
            model.add_constraint("water", water_terms, Relation::Le, p.water_budget_mm_ha);
        }
        for v in &vars {
            let id = &p.candidates[v.index].crop_id;
            model.add_constraint(
                format!("link[{}]", id),
                vec![(v.area, 1.0), (v.selected, -upper[v.index])],
                Relation::Le,
                0.0,
            );
            if stage.min_area > 0.0 && locked[v.index] <= 0.0 {
                model.add_constraint(
                    format!("min_area[{}]", id),
                    vec![(v.area, 1.0), (v.selected, -stage.min_area)],
                    Relation::Ge,
                    0.0,
                );
            }
        }
        if let Some(k) = stage.max_crops {
            model.add_constraint(
                "cardinality",
                vars.iter().map(|v| (v.selected, 1.0)).collect(),
                Relation::Le,
                k as f64,
            );
        }

        let outcome = self
            .solver
            .solve(&model, &self.config.solve_limits())
            .map_err(|e| EngineError::Solver(e.to_string()))?;

        let extract = |values: &[f64]| {
            let mut areas = vec![0.0; p.candidates.len()];
            for v in &vars {
                let a = values[v.area];
                areas[v.index] = if a.abs() <= 1e-9 { 0.0 } else { a.max(0.0) };
            }
            areas
        };

        Ok(match outcome {
            SolveOutcome::Optimal { solution, stats } => StageOutcome::Solved(StageResult {
                areas: extract(&solution.values),
                best_effort: false,
                stats,
            }),
            SolveOutcome::BestEffort { solution, stats } => StageOutcome::Solved(StageResult {
                areas: extract(&solution.values),
                best_effort: true,
                stats,
            }),
            SolveOutcome::Infeasible { stats } => StageOutcome::Infeasible(stats),
            SolveOutcome::TimedOut { stats } => StageOutcome::TimedOut(stats),
        })
    }

    /// 零分配时的原因判定
    fn empty_reason(
        &self,
        p: &AllocationProblem<'_>,
        coefs: &[f64],
        upper: &[f64],
    ) -> InfeasibilityReason {
        let eps = self.config.epsilon;
        if p.candidates.is_empty() {
            return InfeasibilityReason::NoCandidates;
        }
        let profitable: Vec<usize> = (0..coefs.len()).filter(|&i| coefs[i] > eps).collect();
        if profitable.is_empty() {
            return InfeasibilityReason::NoProfitableCrop;
        }
        if profitable.iter().all(|&i| upper[i] <= eps) {
            return InfeasibilityReason::InsufficientWater {
                water_budget_mm_ha: p.water_budget_mm_ha,
            };
        }
        InfeasibilityReason::ConstraintsUnsatisfiable {
            detail: format!(
                "minimum area {:.1} ha and crop limit {:?} cannot be met on {:.1} ha with {:.1} mm·ha water",
                p.min_area_per_selected_crop_ha,
                p.max_crops_selected,
                p.field.total_plantable_area_ha,
                p.water_budget_mm_ha
            ),
        }
    }

    // ==========================================
    // 结果组装
    // ==========================================
    fn build_allocations(
        &self,
        p: &AllocationProblem<'_>,
        areas: &[f64],
        coefs: &[f64],
        locked: &[f64],
    ) -> Vec<CropAllocation> {
        let eps = self.config.epsilon;
        let mut allocations: Vec<CropAllocation> = p
            .candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let factor = self.config.suitability_factor(c.suitability_score);
                let profit = c.expected_profit_per_ha();
                let (risk_band, risk_basis) =
                    self.risk.assess(c.yield_stats.as_ref(), c.water_sensitivity);
                let area = areas[i];

                let mut rationale = if c.fixed_area {
                    format!(
                        "Fixed at {:.1} ha planted outside the plan; not re-optimized, water {:.0} mm/ha counted",
                        area, c.water_requirement_mm
                    )
                } else if area > 0.0 {
                    format!(
                        "Allocated {:.1} ha: suitability {:.2} (factor {:.2}), expected profit {:.1}/ha, water {:.0} mm/ha",
                        area, c.suitability_score, factor, profit, c.water_requirement_mm
                    )
                } else if coefs[i] <= eps {
                    format!(
                        "Not allocated: expected profit {:.1}/ha is not positive",
                        profit
                    )
                } else {
                    format!(
                        "Not allocated: land and water are worth more on other crops (suitability {:.2}, expected profit {:.1}/ha)",
                        c.suitability_score, profit
                    )
                };
                if locked[i] > 0.0 && !c.fixed_area {
                    rationale.push_str(&format!("; {:.1} ha already planted", locked[i]));
                }
                rationale.push_str(&format!("; risk {} ({})", risk_band, risk_basis));

                CropAllocation {
                    crop_id: c.crop_id.clone(),
                    area_ha: area,
                    suitability_score: c.suitability_score,
                    suitability_factor: factor,
                    expected_yield_t_ha: c.expected_yield_t_ha,
                    expected_profit_per_ha: profit,
                    water_requirement_mm: c.water_requirement_mm,
                    risk_band,
                    locked_area_ha: locked[i],
                    rationale,
                }
            })
            .collect();

        // 已分配在前 (面积降序)，其余按适宜度降序；最终按作物ID裁决
        allocations.sort_by(|a, b| {
            b.is_selected()
                .cmp(&a.is_selected())
                .then_with(|| b.area_ha.total_cmp(&a.area_ha))
                .then_with(|| b.suitability_score.total_cmp(&a.suitability_score))
                .then_with(|| a.crop_id.cmp(&b.crop_id))
        });
        allocations
    }
}

fn accumulate(total: &mut SolveStats, stage: &SolveStats) {
    total.nodes_explored += stage.nodes_explored;
    total.lp_iterations += stage.lp_iterations;
    total.elapsed += stage.elapsed;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::field::Location;
    use crate::domain::types::WaterSensitivity;

    fn field(area: f64, quota: f64) -> Field {
        Field {
            field_id: "F1".to_string(),
            total_plantable_area_ha: area,
            water_quota_mm: quota,
            soil_type: None,
            soil_ph: None,
            soil_ec: None,
            location: Location::default(),
            scheme_id: None,
        }
    }

    /// 收益 = yield × 1000 × price − cost；取 yield=1, cost=0，price = profit / 1000
    fn cand(id: &str, water: f64, score: f64, profit: f64) -> CandidateCrop {
        CandidateCrop {
            crop_id: id.to_string(),
            suitability_score: score,
            expected_yield_t_ha: 1.0,
            price_per_kg: profit / 1000.0,
            water_requirement_mm: water,
            estimated_cost_per_ha: 0.0,
            water_sensitivity: WaterSensitivity::Medium,
            yield_stats: None,
            features: None,
            fixed_area: false,
        }
    }

    fn optimizer() -> AllocationOptimizer {
        AllocationOptimizer::new(AllocationConfig::default(), RiskConfig::default())
    }

    #[test]
    fn test_single_crop_fills_land() {
        let f = field(10.0, 500.0);
        let plan = optimizer()
            .allocate(&f, "S", &[cand("A", 300.0, 0.8, 100.0)], 0.5, None)
            .unwrap();
        assert_eq!(plan.status, PlanStatus::Optimal);
        assert!((plan.area_of("A") - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_water_limits_thirsty_crop() {
        let f = field(10.0, 300.0); // 预算 3000
        let plan = optimizer()
            .allocate(&f, "S", &[cand("A", 600.0, 1.0, 100.0)], 0.5, None)
            .unwrap();
        assert!((plan.area_of("A") - 5.0).abs() < 1e-6);
        assert!(plan.total_water_mm_ha() <= 3000.0 + 1e-6);
    }

    #[test]
    fn test_unprofitable_crop_not_allocated() {
        let f = field(10.0, 500.0);
        let plan = optimizer()
            .allocate(
                &f,
                "S",
                &[cand("A", 300.0, 0.8, 100.0), cand("B", 300.0, 0.9, -5.0)],
                0.5,
                None,
            )
            .unwrap();
        assert_eq!(plan.area_of("B"), 0.0);
        assert_eq!(plan.allocations[0].crop_id, "A");
        assert!(plan.allocations[1].rationale.contains("not positive"));
    }

    #[test]
    fn test_cardinality_limits_selection() {
        let f = field(10.0, 500.0);
        let cands = [
            cand("A", 600.0, 0.8, 100.0),
            cand("B", 300.0, 0.6, 80.0),
        ];
        let plan = optimizer().allocate(&f, "S", &cands, 0.5, Some(1)).unwrap();
        assert_eq!(plan.selected().count(), 1);
        assert!(plan.relaxed_constraints.is_empty());
    }

    #[test]
    fn test_min_area_relaxed_when_water_tiny() {
        // 预算 0.2 × 10 = 2 mm·ha -> 每种作物最多 0.02 ha < 最小面积
        let f = field(10.0, 0.2);
        let plan = optimizer()
            .allocate(&f, "S", &[cand("A", 100.0, 0.8, 100.0)], 0.5, None)
            .unwrap();
        assert_eq!(plan.relaxed_constraints, vec![RelaxedConstraint::MinimumArea]);
        assert!((plan.area_of("A") - 0.02).abs() < 1e-6);
        assert_eq!(plan.status, PlanStatus::Optimal);
    }

    #[test]
    fn test_zero_quota_is_reported_not_error() {
        let f = field(10.0, 0.0);
        let plan = optimizer()
            .allocate(&f, "S", &[cand("A", 100.0, 0.8, 100.0)], 0.5, None)
            .unwrap();
        assert_eq!(plan.status, PlanStatus::Infeasible);
        assert!(matches!(
            plan.infeasibility,
            Some(InfeasibilityReason::InsufficientWater { .. })
        ));
        assert_eq!(plan.total_area_ha(), 0.0);
    }

    #[test]
    fn test_duplicate_candidate_rejected() {
        let f = field(10.0, 500.0);
        let result = optimizer().allocate(
            &f,
            "S",
            &[cand("A", 300.0, 0.8, 100.0), cand("A", 300.0, 0.8, 100.0)],
            0.5,
            None,
        );
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_locked_area_is_lower_bound() {
        let f = field(10.0, 500.0);
        let cands = [cand("A", 300.0, 0.8, 100.0), cand("B", 300.0, 0.8, 10.0)];
        let locked: BTreeMap<String, f64> = [("B".to_string(), 3.0)].into_iter().collect();
        let problem = AllocationProblem {
            field: &f,
            season: "S",
            candidates: &cands,
            min_area_per_selected_crop_ha: 0.5,
            max_crops_selected: None,
            locked_area: &locked,
            water_budget_mm_ha: 5000.0,
            kind: PlanKind::PlanB,
            baseline_plan_id: Some("P0"),
        };
        let plan = optimizer().solve(&problem).unwrap();
        assert!(plan.area_of("B") >= 3.0 - 1e-9);
        assert!((plan.area_of("A") - 7.0).abs() < 1e-6);
        assert_eq!(plan.baseline_plan_id.as_deref(), Some("P0"));
    }

    #[test]
    fn test_unknown_locked_crop_is_not_found() {
        let f = field(10.0, 500.0);
        let cands = [cand("A", 300.0, 0.8, 100.0)];
        let locked: BTreeMap<String, f64> = [("Z".to_string(), 1.0)].into_iter().collect();
        let problem = AllocationProblem {
            field: &f,
            season: "S",
            candidates: &cands,
            min_area_per_selected_crop_ha: 0.5,
            max_crops_selected: None,
            locked_area: &locked,
            water_budget_mm_ha: 5000.0,
            kind: PlanKind::PlanB,
            baseline_plan_id: None,
        };
        assert!(matches!(
            optimizer().solve(&problem),
            Err(EngineError::NotFound { .. })
        ));
    }
}
