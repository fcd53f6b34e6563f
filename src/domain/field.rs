// ==========================================
// ACA-O 作物面积优化引擎 - 田块与作物目录
// ==========================================
// 依据: ACA-O 数据模型 - Field / Crop 记录
// 红线: 上游数据只读，引擎不回写
// ==========================================

use crate::domain::types::WaterSensitivity;
use serde::{Deserialize, Serialize};

// ==========================================
// Location - 田块位置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
}

// ==========================================
// Field - 田块
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub field_id: String,                    // 田块ID
    pub total_plantable_area_ha: f64,        // 可种面积 (承重字段，缺失即致命)
    pub water_quota_mm: f64,                 // 季度用水配额
    #[serde(default)]
    pub soil_type: Option<String>,           // 土壤类型
    #[serde(default)]
    pub soil_ph: Option<f64>,                // 土壤 pH
    #[serde(default)]
    pub soil_ec: Option<f64>,                // 土壤电导率 (dS/m)
    #[serde(default)]
    pub location: Location,                  // 位置
    #[serde(default)]
    pub scheme_id: Option<String>,           // 所属灌区
}

impl Field {
    /// 用新的配额复制一份田块快照 (Plan-B / 情景模拟)
    pub fn with_quota(&self, water_quota_mm: f64) -> Self {
        let mut f = self.clone();
        f.water_quota_mm = water_quota_mm;
        f
    }
}

// ==========================================
// Crop - 作物目录记录
// ==========================================
// 可选字段缺失时按文档缺省值处理，并在方案上标记 degraded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub crop_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ph_min: Option<f64>,
    #[serde(default)]
    pub ph_max: Option<f64>,
    #[serde(default)]
    pub ec_max: Option<f64>,
    #[serde(default)]
    pub water_sensitivity: Option<WaterSensitivity>,
    #[serde(default)]
    pub base_yield_t_per_ha: Option<f64>,
    #[serde(default)]
    pub growth_duration_days: Option<u32>,
    #[serde(default)]
    pub water_requirement_mm: Option<f64>,     // 每公顷需水深度
    #[serde(default)]
    pub estimated_cost_per_ha: Option<f64>,    // 由农艺数据方提供，引擎不推算
}

impl Crop {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.crop_id)
    }
}
