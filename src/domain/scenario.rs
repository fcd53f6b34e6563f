// ==========================================
// ACA-O 作物面积优化引擎 - 情景参数
// ==========================================
// 用途: 推荐请求中的 "假设" 覆盖 (配额 / 价格系数)，不修改上游数据
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// 覆盖田块季度用水配额
    #[serde(default)]
    pub water_quota_mm: Option<f64>,
    /// 所有作物价格乘以该系数
    #[serde(default)]
    pub price_factor: Option<f64>,
}

impl Scenario {
    pub fn is_baseline(&self) -> bool {
        self.water_quota_mm.is_none() && self.price_factor.is_none()
    }
}
