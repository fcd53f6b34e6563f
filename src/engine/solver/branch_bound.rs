// ==========================================
// ACA-O 作物面积优化引擎 - 分支定界求解器
// ==========================================
// 职责: MipSolver 的内置实现 (深度优先 + LP 松弛定界)
// 红线:
// - 超时/节点上限时返回当前最优可行解，标记 BestEffort
// - 分支变量选择与节点顺序完全确定，同输入同输出
// ==========================================

use super::simplex::{solve_lp, LpOutcome};
use super::{
    MipModel, MipSolution, MipSolver, SolveLimits, SolveOutcome, SolveStats, SolverError, VarKind,
};
use std::time::Instant;
use tracing::{debug, instrument};

/// 0/1 变量判定为整数的容差
const INTEGRALITY_TOL: f64 = 1e-6;

#[derive(Debug, Clone)]
struct Node {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

// ==========================================
// BranchAndBoundSolver
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }

    fn validate(model: &MipModel) -> Result<(), SolverError> {
        let n = model.variables.len();
        for v in &model.variables {
            if !v.lower.is_finite() || v.upper.is_nan() {
                return Err(SolverError::InvalidModel(format!(
                    "variable {} has invalid bounds [{}, {}]",
                    v.name, v.lower, v.upper
                )));
            }
        }
        for (v, c) in &model.objective {
            if *v >= n || !c.is_finite() {
                return Err(SolverError::InvalidModel(format!(
                    "objective term ({}, {}) is invalid",
                    v, c
                )));
            }
        }
        for c in &model.constraints {
            if !c.rhs.is_finite() || c.terms.iter().any(|(v, a)| *v >= n || !a.is_finite()) {
                return Err(SolverError::InvalidModel(format!(
                    "constraint {} is invalid",
                    c.name
                )));
            }
        }
        Ok(())
    }
}

impl MipSolver for BranchAndBoundSolver {
    #[instrument(skip(self, model, limits), fields(
        vars = model.variables.len(),
        constraints = model.constraints.len()
    ))]
    fn solve(&self, model: &MipModel, limits: &SolveLimits) -> Result<SolveOutcome, SolverError> {
        Self::validate(model)?;
        let start = Instant::now();
        let binaries = model.binary_vars();

        // 0/1 变量的界取整
        let root = Node {
            lower: model
                .variables
                .iter()
                .map(|v| match v.kind {
                    VarKind::Binary => (v.lower - INTEGRALITY_TOL).ceil().clamp(0.0, 1.0),
                    VarKind::Continuous => v.lower,
                })
                .collect(),
            upper: model
                .variables
                .iter()
                .map(|v| match v.kind {
                    VarKind::Binary => (v.upper + INTEGRALITY_TOL).floor().clamp(0.0, 1.0),
                    VarKind::Continuous => v.upper,
                })
                .collect(),
        };

        let mut stack = vec![root];
        let mut incumbent: Option<MipSolution> = None;
        let mut stats = SolveStats::default();
        let mut exhausted = true;

        while let Some(node) = stack.pop() {
            if start.elapsed() >= limits.time_limit || stats.nodes_explored >= limits.node_limit {
                exhausted = false;
                break;
            }
            stats.nodes_explored += 1;

            let lp = solve_lp(model, &node.lower, &node.upper, limits.eps)?;
            stats.lp_iterations += lp.iterations();
            let LpOutcome::Optimal(relaxed) = lp else {
                continue;
            };

            // 定界剪枝
            if let Some(best) = &incumbent {
                let tol = 1e-9 * best.objective.abs().max(1.0);
                if relaxed.objective <= best.objective + tol {
                    continue;
                }
            }

            // 选择最不整的 0/1 变量 (并列取最小下标)
            let mut branch_var: Option<(usize, f64)> = None;
            for &v in &binaries {
                let x = relaxed.values[v];
                let frac = (x - x.floor()).min(x.ceil() - x);
                if frac > INTEGRALITY_TOL && branch_var.map_or(true, |(_, f)| frac > f) {
                    branch_var = Some((v, frac));
                }
            }

            match branch_var {
                None => {
                    let mut values = relaxed.values;
                    for &v in &binaries {
                        values[v] = values[v].round();
                    }
                    let objective = model.objective_value(&values);
                    debug!(objective, nodes = stats.nodes_explored, "新的可行解");
                    incumbent = Some(MipSolution { values, objective });
                }
                Some((v, _)) => {
                    // 后压入者先出栈: 先探索 "选中" 分支
                    let mut down = node.clone();
                    down.upper[v] = 0.0;
                    let mut up = node;
                    up.lower[v] = 1.0;
                    stack.push(down);
                    stack.push(up);
                }
            }
        }

        stats.elapsed = start.elapsed();
        Ok(match (incumbent, exhausted) {
            (Some(solution), true) => SolveOutcome::Optimal { solution, stats },
            (Some(solution), false) => SolveOutcome::BestEffort { solution, stats },
            (None, true) => SolveOutcome::Infeasible { stats },
            (None, false) => SolveOutcome::TimedOut { stats },
        })
    }
}
