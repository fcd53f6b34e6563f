// ==========================================
// ACA-O 作物面积优化引擎 - 求解器抽象
// ==========================================
// 职责: 带标签决策变量模型 (连续面积 + 0/1 选择) 与求解接口
// 红线: 引擎不绑定具体求解后端，只依赖 MipSolver::solve
// ==========================================

pub mod branch_bound;
pub mod simplex;

pub use branch_bound::BranchAndBoundSolver;
pub use simplex::{solve_lp, LpOutcome, LpSolution};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 决策变量下标
pub type VarId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64, // f64::INFINITY 表示无上界
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

// ==========================================
// MipModel - 混合整数规划模型 (最大化)
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MipModel {
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    pub objective: Vec<(VarId, f64)>,
}

impl MipModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
        });
        self.variables.len() - 1
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
        });
        self.variables.len() - 1
    }

    pub fn set_objective_coef(&mut self, var: VarId, coef: f64) {
        match self.objective.iter_mut().find(|(v, _)| *v == var) {
            Some(entry) => entry.1 = coef,
            None => self.objective.push((var, coef)),
        }
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        relation: Relation,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            relation,
            rhs,
        });
    }

    pub fn binary_vars(&self) -> Vec<VarId> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind == VarKind::Binary)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|(v, c)| c * values.get(*v).copied().unwrap_or(0.0))
            .sum()
    }

    /// 校验一组取值是否满足全部约束与变量界 (容差 eps)
    pub fn is_feasible(&self, values: &[f64], eps: f64) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let bounds_ok = self.variables.iter().zip(values).all(|(var, x)| {
            let integral = var.kind != VarKind::Binary || (x - x.round()).abs() <= eps;
            integral && *x >= var.lower - eps && *x <= var.upper + eps
        });
        bounds_ok
            && self.constraints.iter().all(|c| {
                let lhs: f64 = c.terms.iter().map(|(v, a)| a * values[*v]).sum();
                match c.relation {
                    Relation::Le => lhs <= c.rhs + eps,
                    Relation::Ge => lhs >= c.rhs - eps,
                    Relation::Eq => (lhs - c.rhs).abs() <= eps,
                }
            })
    }
}

// ==========================================
// 求解限制 / 结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveLimits {
    pub time_limit: Duration,
    pub node_limit: usize,
    pub eps: f64,
}

impl Default for SolveLimits {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_millis(2_000),
            node_limit: 50_000,
            eps: 1e-9,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveStats {
    pub nodes_explored: usize,
    pub lp_iterations: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MipSolution {
    pub values: Vec<f64>,
    pub objective: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// 已证明最优
    Optimal { solution: MipSolution, stats: SolveStats },
    /// 超时/节点上限，返回当前最优可行解
    BestEffort { solution: MipSolution, stats: SolveStats },
    /// 模型无可行解
    Infeasible { stats: SolveStats },
    /// 超时且未找到可行解
    TimedOut { stats: SolveStats },
}

impl SolveOutcome {
    pub fn stats(&self) -> &SolveStats {
        match self {
            SolveOutcome::Optimal { stats, .. }
            | SolveOutcome::BestEffort { stats, .. }
            | SolveOutcome::Infeasible { stats }
            | SolveOutcome::TimedOut { stats } => stats,
        }
    }

    pub fn solution(&self) -> Option<&MipSolution> {
        match self {
            SolveOutcome::Optimal { solution, .. } | SolveOutcome::BestEffort { solution, .. } => {
                Some(solution)
            }
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("模型非法: {0}")]
    InvalidModel(String),

    #[error("线性规划无界: {0}")]
    Unbounded(String),

    #[error("单纯形迭代超过上限: {0}")]
    IterationLimit(usize),
}

// ==========================================
// MipSolver - 求解后端接口
// ==========================================
pub trait MipSolver: Send + Sync {
    fn solve(&self, model: &MipModel, limits: &SolveLimits) -> Result<SolveOutcome, SolverError>;
}
