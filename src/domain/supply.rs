// ==========================================
// ACA-O 作物面积优化引擎 - 供给汇总
// ==========================================
// 红线: 派生数据，按需计算，不独立持久化
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplySummaryItem {
    pub crop_id: String,
    pub season: String,
    pub scheme_id: Option<String>,
    pub total_area_ha: f64,
    pub total_expected_production_tonnes: f64,
    pub field_count: usize,
}
