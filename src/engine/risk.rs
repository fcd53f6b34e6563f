// ==========================================
// ACA-O 作物面积优化引擎 - 风险等级评估
// ==========================================
// 依据: 选中作物历史产量的变异系数 (CV)
// 规则:
// - 样本数 >= min_samples: CV <= cv_low_max 为低，<= cv_medium_max 为中，否则高
// - 历史不足: 按需水敏感度回退 (低/中/高 对应 低/中/高)
// ==========================================

use crate::config::RiskConfig;
use crate::domain::market::YieldStats;
use crate::domain::types::{RiskBand, WaterSensitivity};

pub struct RiskAssessor {
    config: RiskConfig,
}

impl RiskAssessor {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// 评估风险等级
    ///
    /// # 返回
    /// (风险等级, 判定依据)
    pub fn assess(
        &self,
        stats: Option<&YieldStats>,
        sensitivity: WaterSensitivity,
    ) -> (RiskBand, String) {
        if let Some(s) = stats.filter(|s| s.samples >= self.config.min_samples) {
            if let Some(cv) = s.coefficient_of_variation() {
                let band = if cv <= self.config.cv_low_max {
                    RiskBand::Low
                } else if cv <= self.config.cv_medium_max {
                    RiskBand::Medium
                } else {
                    RiskBand::High
                };
                return (
                    band,
                    format!("yield CV {:.2} over {} seasons", cv, s.samples),
                );
            }
        }

        let band = match sensitivity {
            WaterSensitivity::Low => RiskBand::Low,
            WaterSensitivity::Medium => RiskBand::Medium,
            WaterSensitivity::High => RiskBand::High,
        };
        (
            band,
            format!("{} water sensitivity, limited yield history", sensitivity),
        )
    }
}
