// ==========================================
// ACA-O 作物面积优化引擎 - 三角模糊数
// ==========================================
// 职责: 评分链路上的区间不确定性载体
// 红线: 去模糊化只允许在贴近度 (closeness) 计算完成后进行
// ==========================================

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

/// 三角模糊数 (l, m, u)，满足 l <= m <= u
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularFuzzyNumber {
    pub lower: f64,
    pub mode: f64,
    pub upper: f64,
}

impl TriangularFuzzyNumber {
    /// 由三个顶点构造，顶点乱序时自动排序
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        let mut v = [a, b, c];
        v.sort_by(|x, y| x.total_cmp(y));
        Self {
            lower: v[0],
            mode: v[1],
            upper: v[2],
        }
    }

    /// 精确值 (退化三角数)
    pub fn crisp(x: f64) -> Self {
        Self {
            lower: x,
            mode: x,
            upper: x,
        }
    }

    /// 以 mode 为中心、对称展开 spread，并裁剪到 [floor, ceil]
    pub fn spread(mode: f64, spread: f64, floor: f64, ceil: f64) -> Self {
        let m = mode.clamp(floor, ceil);
        Self::new(
            (m - spread).clamp(floor, ceil),
            m,
            (m + spread).clamp(floor, ceil),
        )
    }

    pub fn is_crisp(&self) -> bool {
        self.lower == self.mode && self.mode == self.upper
    }

    pub fn is_finite(&self) -> bool {
        self.lower.is_finite() && self.mode.is_finite() && self.upper.is_finite()
    }

    /// 是否落在 [lo, hi] 内
    pub fn within(&self, lo: f64, hi: f64) -> bool {
        self.lower >= lo && self.upper <= hi
    }

    /// 质心去模糊化
    pub fn centroid(&self) -> f64 {
        (self.lower + self.mode + self.upper) / 3.0
    }

    /// 倒数: 1/(l,m,u) = (1/u, 1/m, 1/l)，要求 l > 0
    pub fn reciprocal(&self) -> Self {
        Self::new(1.0 / self.upper, 1.0 / self.mode, 1.0 / self.lower)
    }

    /// 标量缩放 (k >= 0)
    pub fn scale(&self, k: f64) -> Self {
        Self::new(self.lower * k, self.mode * k, self.upper * k)
    }

    /// 逐顶点取大
    pub fn vertex_max(&self, other: &Self) -> Self {
        Self::new(
            self.lower.max(other.lower),
            self.mode.max(other.mode),
            self.upper.max(other.upper),
        )
    }

    /// 逐顶点取小
    pub fn vertex_min(&self, other: &Self) -> Self {
        Self::new(
            self.lower.min(other.lower),
            self.mode.min(other.mode),
            self.upper.min(other.upper),
        )
    }

    /// 逐顶点平方差，返回 (dl², dm², du²)
    pub fn vertex_sq_diff(&self, other: &Self) -> [f64; 3] {
        [
            (self.lower - other.lower).powi(2),
            (self.mode - other.mode).powi(2),
            (self.upper - other.upper).powi(2),
        ]
    }

    /// 模糊除法: (a/b) = (al/bu, am/bm, au/bl)
    ///
    /// 分母顶点为 0 的分量无定义，按 `undefined` 填充
    pub fn div(&self, denom: &Self, undefined: f64, eps: f64) -> Self {
        let part = |num: f64, den: f64| if den.abs() <= eps { undefined } else { num / den };
        Self::new(
            part(self.lower, denom.upper),
            part(self.mode, denom.mode),
            part(self.upper, denom.lower),
        )
    }

    /// 顶点近似相等
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        (self.lower - other.lower).abs() <= eps
            && (self.mode - other.mode).abs() <= eps
            && (self.upper - other.upper).abs() <= eps
    }
}

impl Default for TriangularFuzzyNumber {
    fn default() -> Self {
        Self::crisp(0.0)
    }
}

impl From<f64> for TriangularFuzzyNumber {
    fn from(x: f64) -> Self {
        Self::crisp(x)
    }
}

impl Add for TriangularFuzzyNumber {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.lower + rhs.lower,
            self.mode + rhs.mode,
            self.upper + rhs.upper,
        )
    }
}

impl Mul<f64> for TriangularFuzzyNumber {
    type Output = Self;

    fn mul(self, k: f64) -> Self {
        self.scale(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_vertices() {
        let t = TriangularFuzzyNumber::new(3.0, 1.0, 2.0);
        assert_eq!((t.lower, t.mode, t.upper), (1.0, 2.0, 3.0));
        assert!(!t.is_crisp());
        assert!(TriangularFuzzyNumber::crisp(2.0).is_crisp());
    }

    #[test]
    fn test_reciprocal_and_centroid() {
        let t = TriangularFuzzyNumber::new(2.0, 4.0, 8.0);
        let r = t.reciprocal();
        assert_eq!((r.lower, r.mode, r.upper), (0.125, 0.25, 0.5));
        assert!((t.centroid() - 14.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_spread_is_clamped() {
        let t = TriangularFuzzyNumber::spread(0.95, 0.1, 0.0, 1.0);
        assert_eq!(t.upper, 1.0);
        assert!((t.lower - 0.85).abs() < 1e-12);
        assert!(t.within(0.0, 1.0));
    }

    #[test]
    fn test_div_guards_zero_denominator() {
        let num = TriangularFuzzyNumber::new(1.0, 1.0, 1.0);
        let den = TriangularFuzzyNumber::new(0.0, 2.0, 4.0);
        let q = num.div(&den, 0.5, 1e-12);
        // al/bu = 0.25, am/bm = 0.5, au/bl -> 未定义 -> 0.5
        assert_eq!((q.lower, q.mode, q.upper), (0.25, 0.5, 0.5));
    }
}
