// ==========================================
// ACA-O 作物面积优化引擎 - 历史产量统计
// ==========================================
// 职责: 近期加权均值 / 方差 (按年份指数衰减)
// ==========================================

use crate::domain::market::{YieldRecord, YieldStats};

pub struct YieldHistoryAnalyzer {
    decay: f64,
}

impl YieldHistoryAnalyzer {
    /// decay ∈ (0,1]: 每早一年权重乘以 decay
    pub fn new(decay: f64) -> Self {
        Self {
            decay: decay.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }

    /// 计算加权统计；无有效记录时返回 None
    pub fn stats<'a, I>(&self, records: I) -> Option<YieldStats>
    where
        I: IntoIterator<Item = &'a YieldRecord>,
    {
        let valid: Vec<&YieldRecord> = records
            .into_iter()
            .filter(|r| r.yield_t_per_ha.is_finite() && r.yield_t_per_ha >= 0.0)
            .collect();
        let latest = valid.iter().map(|r| r.year).max()?;

        let weight = |r: &YieldRecord| self.decay.powi((latest - r.year).max(0));
        let total_w: f64 = valid.iter().map(|r| weight(r)).sum();
        if total_w <= 0.0 {
            return None;
        }
        let mean = valid.iter().map(|r| weight(r) * r.yield_t_per_ha).sum::<f64>() / total_w;
        let variance = valid
            .iter()
            .map(|r| weight(r) * (r.yield_t_per_ha - mean).powi(2))
            .sum::<f64>()
            / total_w;

        Some(YieldStats {
            weighted_mean_t_ha: mean,
            weighted_variance: variance,
            samples: valid.len(),
        })
    }
}
