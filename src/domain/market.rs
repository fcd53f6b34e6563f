// ==========================================
// ACA-O 作物面积优化引擎 - 价格与历史产量记录
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// PriceRecord - 价格原始记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub crop_id: String,
    pub price_date: NaiveDate,
    pub price_per_kg: f64,
}

// ==========================================
// PriceQuote - 实际应用的价格
// ==========================================
// 请求日期无记录时取最近的历史记录，applied_date 说明实际使用哪一天
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub crop_id: String,
    pub price_per_kg: f64,
    pub requested_date: NaiveDate,
    pub applied_date: NaiveDate,
}

impl PriceQuote {
    pub fn is_stale(&self) -> bool {
        self.applied_date != self.requested_date
    }
}

// ==========================================
// YieldRecord - 历史产量
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRecord {
    pub field_id: String,
    pub crop_id: String,
    pub season: String,
    pub year: i32,
    pub yield_t_per_ha: f64,
}

// ==========================================
// YieldStats - 近期加权产量统计
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldStats {
    pub weighted_mean_t_ha: f64,
    pub weighted_variance: f64,
    pub samples: usize,
}

impl YieldStats {
    pub fn std_dev(&self) -> f64 {
        self.weighted_variance.max(0.0).sqrt()
    }

    /// 变异系数 (均值为 0 时无定义)
    pub fn coefficient_of_variation(&self) -> Option<f64> {
        if self.weighted_mean_t_ha > 0.0 {
            Some(self.std_dev() / self.weighted_mean_t_ha)
        } else {
            None
        }
    }
}
