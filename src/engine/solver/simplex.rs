// ==========================================
// ACA-O 作物面积优化引擎 - 两阶段单纯形法
// ==========================================
// 职责: 求解分支定界各节点的线性松弛 (最大化)
// 说明:
// - 变量下界平移为 0，上界转为显式约束
// - 右端项统一为非负后，Le 加松弛变量，Ge/Eq 加人工变量
// - 入基/出基均采用 Bland 规则，保证退化问题不循环且结果确定
// ==========================================

use super::{MipModel, Relation, SolverError};

/// 判定 Phase I 可行性的容差
const FEASIBILITY_TOL: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    pub values: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LpOutcome {
    Optimal(LpSolution),
    Infeasible { iterations: usize },
}

impl LpOutcome {
    pub fn iterations(&self) -> usize {
        match self {
            LpOutcome::Optimal(s) => s.iterations,
            LpOutcome::Infeasible { iterations } => *iterations,
        }
    }
}

struct Tableau {
    rows: Vec<Vec<f64>>,
    obj: Vec<f64>,
    basis: Vec<usize>,
    cols: usize, // 不含右端项
}

impl Tableau {
    fn rhs(&self, i: usize) -> f64 {
        self.rows[i][self.cols]
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let width = self.cols + 1;
        let p = self.rows[row][col];
        for k in 0..width {
            self.rows[row][k] /= p;
        }
        let pivot_row = self.rows[row].clone();
        for (i, r) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let f = r[col];
            if f != 0.0 {
                for k in 0..width {
                    r[k] -= f * pivot_row[k];
                }
            }
        }
        let f = self.obj[col];
        if f != 0.0 {
            for k in 0..width {
                self.obj[k] -= f * pivot_row[k];
            }
        }
        self.basis[row] = col;
    }

    /// 单纯形主循环，allowed[j] = false 的列不可入基
    fn run(
        &mut self,
        allowed: &[bool],
        eps: f64,
        max_iter: usize,
        iterations: &mut usize,
    ) -> Result<(), SolverError> {
        loop {
            let Some(col) = (0..self.cols).find(|&j| allowed[j] && self.obj[j] < -eps) else {
                return Ok(());
            };
            if *iterations >= max_iter {
                return Err(SolverError::IterationLimit(max_iter));
            }

            let mut best: Option<(usize, f64)> = None;
            for i in 0..self.rows.len() {
                let a = self.rows[i][col];
                if a <= eps {
                    continue;
                }
                let ratio = self.rhs(i) / a;
                best = match best {
                    None => Some((i, ratio)),
                    Some((bi, br)) => {
                        if ratio < br - eps
                            || ((ratio - br).abs() <= eps && self.basis[i] < self.basis[bi])
                        {
                            Some((i, ratio))
                        } else {
                            Some((bi, br))
                        }
                    }
                };
            }
            let Some((row, _)) = best else {
                return Err(SolverError::Unbounded(format!("entering column {}", col)));
            };

            self.pivot(row, col);
            *iterations += 1;
        }
    }
}

/// 求解模型的线性松弛 (忽略整数性)，变量界由 lower/upper 覆盖
pub fn solve_lp(
    model: &MipModel,
    lower: &[f64],
    upper: &[f64],
    eps: f64,
) -> Result<LpOutcome, SolverError> {
    let n = model.variables.len();
    if lower.len() != n || upper.len() != n {
        return Err(SolverError::InvalidModel(format!(
            "bounds length mismatch: vars={}, lower={}, upper={}",
            n,
            lower.len(),
            upper.len()
        )));
    }
    for j in 0..n {
        if !lower[j].is_finite() {
            return Err(SolverError::InvalidModel(format!(
                "variable {} has no finite lower bound",
                model.variables[j].name
            )));
        }
        if upper[j] < lower[j] - eps {
            return Ok(LpOutcome::Infeasible { iterations: 0 });
        }
    }

    // ===== Step 1: 平移下界，生成约束行 =====
    let mut raw_rows: Vec<(Vec<f64>, Relation, f64)> = Vec::new();
    for c in &model.constraints {
        let mut coefs = vec![0.0; n];
        for (v, a) in &c.terms {
            if *v >= n {
                return Err(SolverError::InvalidModel(format!(
                    "constraint {} references unknown variable {}",
                    c.name, v
                )));
            }
            coefs[*v] += a;
        }
        let shift: f64 = coefs.iter().zip(lower).map(|(a, l)| a * l).sum();
        raw_rows.push((coefs, c.relation, c.rhs - shift));
    }
    for j in 0..n {
        if upper[j].is_finite() {
            let mut coefs = vec![0.0; n];
            coefs[j] = 1.0;
            raw_rows.push((coefs, Relation::Le, (upper[j] - lower[j]).max(0.0)));
        }
    }

    // 右端项非负化
    for (coefs, rel, rhs) in raw_rows.iter_mut() {
        if *rhs < 0.0 {
            coefs.iter_mut().for_each(|a| *a = -*a);
            *rhs = -*rhs;
            *rel = match rel {
                Relation::Le => Relation::Ge,
                Relation::Ge => Relation::Le,
                Relation::Eq => Relation::Eq,
            };
        }
    }

    // ===== Step 2: 列布局 [结构变量 | 松弛/剩余 | 人工] =====
    let m = raw_rows.len();
    let n_slack = raw_rows
        .iter()
        .filter(|(_, rel, _)| *rel != Relation::Eq)
        .count();
    let n_art = raw_rows
        .iter()
        .filter(|(_, rel, _)| *rel != Relation::Le)
        .count();
    let art_start = n + n_slack;
    let cols = art_start + n_art;

    let mut rows = Vec::with_capacity(m);
    let mut basis = Vec::with_capacity(m);
    let mut slack_idx = n;
    let mut art_idx = art_start;
    for (coefs, rel, rhs) in &raw_rows {
        let mut row = vec![0.0; cols + 1];
        row[..n].copy_from_slice(coefs);
        row[cols] = *rhs;
        match rel {
            Relation::Le => {
                row[slack_idx] = 1.0;
                basis.push(slack_idx);
                slack_idx += 1;
            }
            Relation::Ge => {
                row[slack_idx] = -1.0;
                slack_idx += 1;
                row[art_idx] = 1.0;
                basis.push(art_idx);
                art_idx += 1;
            }
            Relation::Eq => {
                row[art_idx] = 1.0;
                basis.push(art_idx);
                art_idx += 1;
            }
        }
        rows.push(row);
    }

    let mut tab = Tableau {
        rows,
        obj: vec![0.0; cols + 1],
        basis,
        cols,
    };
    let max_iter = 200 * (m + cols) + 1_000;
    let mut iterations = 0usize;

    // ===== Step 3: Phase I (最大化 −Σ人工变量) =====
    if n_art > 0 {
        for j in art_start..cols {
            tab.obj[j] = 1.0;
        }
        for i in 0..m {
            if tab.basis[i] >= art_start {
                let row = tab.rows[i].clone();
                for k in 0..=cols {
                    tab.obj[k] -= row[k];
                }
            }
        }
        let all = vec![true; cols];
        tab.run(&all, eps, max_iter, &mut iterations)?;

        if tab.obj[cols] < -FEASIBILITY_TOL {
            return Ok(LpOutcome::Infeasible { iterations });
        }

        // 把残留在基中的人工变量换出 (其取值为 0)
        for i in 0..m {
            if tab.basis[i] >= art_start {
                if let Some(j) = (0..art_start).find(|&j| tab.rows[i][j].abs() > eps) {
                    tab.pivot(i, j);
                }
            }
        }
    }

    // ===== Step 4: Phase II =====
    tab.obj = vec![0.0; cols + 1];
    for (v, c) in &model.objective {
        tab.obj[*v] -= c;
    }
    for i in 0..m {
        let b = tab.basis[i];
        let f = tab.obj[b];
        if f != 0.0 {
            let row = tab.rows[i].clone();
            for k in 0..=cols {
                tab.obj[k] -= f * row[k];
            }
        }
    }
    let allowed: Vec<bool> = (0..cols).map(|j| j < art_start).collect();
    tab.run(&allowed, eps, max_iter, &mut iterations)?;

    // ===== Step 5: 还原变量取值 =====
    let mut values = lower.to_vec();
    for i in 0..m {
        let b = tab.basis[i];
        if b < n {
            values[b] += tab.rhs(i);
        }
    }
    for j in 0..n {
        values[j] = values[j].max(lower[j]).min(upper[j]);
    }
    let objective = model.objective_value(&values);

    Ok(LpOutcome::Optimal(LpSolution {
        values,
        objective,
        iterations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::solver::MipModel;

    fn bounds(model: &MipModel) -> (Vec<f64>, Vec<f64>) {
        (
            model.variables.iter().map(|v| v.lower).collect(),
            model.variables.iter().map(|v| v.upper).collect(),
        )
    }

    #[test]
    fn test_textbook_lp() {
        // max 3x + 5y, x <= 4, 2y <= 12, 3x + 2y <= 18 -> (2, 6), 36
        let mut m = MipModel::new();
        let x = m.add_continuous("x", 0.0, f64::INFINITY);
        let y = m.add_continuous("y", 0.0, f64::INFINITY);
        m.set_objective_coef(x, 3.0);
        m.set_objective_coef(y, 5.0);
        m.add_constraint("c1", vec![(x, 1.0)], Relation::Le, 4.0);
        m.add_constraint("c2", vec![(y, 2.0)], Relation::Le, 12.0);
        m.add_constraint("c3", vec![(x, 3.0), (y, 2.0)], Relation::Le, 18.0);

        let (lo, up) = bounds(&m);
        match solve_lp(&m, &lo, &up, 1e-9).unwrap() {
            LpOutcome::Optimal(s) => {
                assert!((s.values[x] - 2.0).abs() < 1e-9);
                assert!((s.values[y] - 6.0).abs() < 1e-9);
                assert!((s.objective - 36.0).abs() < 1e-9);
            }
            other => panic!("Expected Optimal, got {:?}", other),
        }
    }

    #[test]
    fn test_ge_and_lower_bounds_need_phase_one() {
        // max -x - y, x + y >= 3, x >= 1 -> objective -3
        let mut m = MipModel::new();
        let x = m.add_continuous("x", 1.0, 10.0);
        let y = m.add_continuous("y", 0.0, 10.0);
        m.set_objective_coef(x, -1.0);
        m.set_objective_coef(y, -1.0);
        m.add_constraint("cover", vec![(x, 1.0), (y, 1.0)], Relation::Ge, 3.0);

        let (lo, up) = bounds(&m);
        match solve_lp(&m, &lo, &up, 1e-9).unwrap() {
            LpOutcome::Optimal(s) => {
                assert!((s.objective + 3.0).abs() < 1e-9);
                assert!(s.values[x] >= 1.0 - 1e-9);
                assert!(m.is_feasible(&s.values, 1e-7));
            }
            other => panic!("Expected Optimal, got {:?}", other),
        }
    }

    #[test]
    fn test_infeasible_lp() {
        let mut m = MipModel::new();
        let x = m.add_continuous("x", 0.0, 5.0);
        m.set_objective_coef(x, 1.0);
        m.add_constraint("need", vec![(x, 1.0)], Relation::Ge, 7.0);
        let (lo, up) = bounds(&m);
        assert!(matches!(
            solve_lp(&m, &lo, &up, 1e-9).unwrap(),
            LpOutcome::Infeasible { .. }
        ));
    }

    #[test]
    fn test_equality_constraint() {
        // max x + 2y, x + y = 4, y <= 3 -> (1, 3), 7
        let mut m = MipModel::new();
        let x = m.add_continuous("x", 0.0, f64::INFINITY);
        let y = m.add_continuous("y", 0.0, 3.0);
        m.set_objective_coef(x, 1.0);
        m.set_objective_coef(y, 2.0);
        m.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], Relation::Eq, 4.0);
        let (lo, up) = bounds(&m);
        match solve_lp(&m, &lo, &up, 1e-9).unwrap() {
            LpOutcome::Optimal(s) => assert!((s.objective - 7.0).abs() < 1e-9),
            other => panic!("Expected Optimal, got {:?}", other),
        }
    }

    #[test]
    fn test_unbounded_is_an_error() {
        let mut m = MipModel::new();
        let x = m.add_continuous("x", 0.0, f64::INFINITY);
        m.set_objective_coef(x, 1.0);
        let (lo, up) = bounds(&m);
        assert!(matches!(
            solve_lp(&m, &lo, &up, 1e-9),
            Err(SolverError::Unbounded(_))
        ));
    }
}
