// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use aca_engine::domain::{CandidateCrop, Crop, Field, Location, YieldRecord};
use aca_engine::provider::InMemoryCatalog;
use aca_engine::WaterSensitivity;
use chrono::NaiveDate;

pub const SEASON: &str = "kharif-2026";

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

// ==========================================
// Field 构建器
// ==========================================

pub struct FieldBuilder {
    field: Field,
}

impl FieldBuilder {
    pub fn new(field_id: &str) -> Self {
        Self {
            field: Field {
                field_id: field_id.to_string(),
                total_plantable_area_ha: 10.0,
                water_quota_mm: 500.0,
                soil_type: Some("loam".to_string()),
                soil_ph: Some(6.5),
                soil_ec: Some(1.0),
                location: Location::default(),
                scheme_id: None,
            },
        }
    }

    pub fn area(mut self, ha: f64) -> Self {
        self.field.total_plantable_area_ha = ha;
        self
    }

    pub fn quota(mut self, mm: f64) -> Self {
        self.field.water_quota_mm = mm;
        self
    }

    pub fn soil(mut self, ph: Option<f64>, ec: Option<f64>) -> Self {
        self.field.soil_ph = ph;
        self.field.soil_ec = ec;
        self
    }

    pub fn scheme(mut self, scheme_id: &str) -> Self {
        self.field.scheme_id = Some(scheme_id.to_string());
        self
    }

    pub fn build(self) -> Field {
        self.field
    }
}

// ==========================================
// Crop 构建器
// ==========================================

pub struct CropBuilder {
    crop: Crop,
}

impl CropBuilder {
    /// 字段齐全的作物记录
    pub fn new(crop_id: &str) -> Self {
        Self {
            crop: Crop {
                crop_id: crop_id.to_string(),
                name: Some(crop_id.to_lowercase()),
                ph_min: Some(5.5),
                ph_max: Some(7.5),
                ec_max: Some(4.0),
                water_sensitivity: Some(WaterSensitivity::Medium),
                base_yield_t_per_ha: Some(4.0),
                growth_duration_days: Some(120),
                water_requirement_mm: Some(400.0),
                estimated_cost_per_ha: Some(200.0),
            },
        }
    }

    /// 只有ID的作物记录 (其余字段全部缺失)
    pub fn bare(crop_id: &str) -> Self {
        Self {
            crop: Crop {
                crop_id: crop_id.to_string(),
                name: None,
                ph_min: None,
                ph_max: None,
                ec_max: None,
                water_sensitivity: None,
                base_yield_t_per_ha: None,
                growth_duration_days: None,
                water_requirement_mm: None,
                estimated_cost_per_ha: None,
            },
        }
    }

    pub fn water(mut self, mm: f64) -> Self {
        self.crop.water_requirement_mm = Some(mm);
        self
    }

    pub fn sensitivity(mut self, s: WaterSensitivity) -> Self {
        self.crop.water_sensitivity = Some(s);
        self
    }

    pub fn base_yield(mut self, t_ha: f64) -> Self {
        self.crop.base_yield_t_per_ha = Some(t_ha);
        self
    }

    pub fn growth_days(mut self, days: u32) -> Self {
        self.crop.growth_duration_days = Some(days);
        self
    }

    pub fn cost(mut self, per_ha: f64) -> Self {
        self.crop.estimated_cost_per_ha = Some(per_ha);
        self
    }

    pub fn ph(mut self, min: f64, max: f64) -> Self {
        self.crop.ph_min = Some(min);
        self.crop.ph_max = Some(max);
        self
    }

    pub fn build(self) -> Crop {
        self.crop
    }
}

// ==========================================
// 候选作物
// ==========================================

/// 每公顷收益 = 1 t/ha × 1000 × price - 0
pub fn candidate(crop_id: &str, score: f64, profit_per_ha: f64, water_mm: f64) -> CandidateCrop {
    CandidateCrop {
        crop_id: crop_id.to_string(),
        suitability_score: score,
        expected_yield_t_ha: 1.0,
        price_per_kg: profit_per_ha / 1000.0,
        water_requirement_mm: water_mm,
        estimated_cost_per_ha: 0.0,
        water_sensitivity: WaterSensitivity::Medium,
        yield_stats: None,
        features: None,
        fixed_area: false,
    }
}

/// 水稻 (600 mm, 0.8, 100/ha) + 玉米 (300 mm, 0.6, 80/ha)
pub fn rice_maize() -> Vec<CandidateCrop> {
    vec![
        candidate("RICE", 0.8, 100.0, 600.0),
        candidate("MAIZE", 0.6, 80.0, 300.0),
    ]
}

pub fn yield_record(field_id: &str, crop_id: &str, year: i32, t_ha: f64) -> YieldRecord {
    YieldRecord {
        field_id: field_id.to_string(),
        crop_id: crop_id.to_string(),
        season: "kharif".to_string(),
        year,
        yield_t_per_ha: t_ha,
    }
}

// ==========================================
// 内存目录
// ==========================================

/// 三个田块 (F1/F2 属 S1, F3 属 S2)，三种作物，价格与历史产量
pub fn sample_catalog() -> InMemoryCatalog {
    let d = |m, day| NaiveDate::from_ymd_opt(2026, m, day).unwrap();
    InMemoryCatalog::new()
        .with_field(FieldBuilder::new("F1").scheme("S1").build())
        .with_field(FieldBuilder::new("F2").area(6.0).quota(450.0).scheme("S1").build())
        .with_field(FieldBuilder::new("F3").area(8.0).quota(350.0).scheme("S2").build())
        .with_crop(
            CropBuilder::new("RICE")
                .water(600.0)
                .sensitivity(WaterSensitivity::High)
                .base_yield(5.0)
                .growth_days(130)
                .cost(600.0)
                .build(),
        )
        .with_crop(
            CropBuilder::new("MAIZE")
                .water(300.0)
                .sensitivity(WaterSensitivity::Medium)
                .base_yield(4.0)
                .growth_days(110)
                .cost(400.0)
                .build(),
        )
        .with_crop(
            CropBuilder::new("SORGHUM")
                .water(200.0)
                .sensitivity(WaterSensitivity::Low)
                .base_yield(2.5)
                .growth_days(100)
                .cost(250.0)
                .build(),
        )
        .with_price("RICE", d(5, 20), 0.30)
        .with_price("RICE", d(6, 1), 0.32)
        .with_price("MAIZE", d(5, 25), 0.25)
        .with_price("SORGHUM", d(6, 1), 0.22)
        .with_yield(yield_record("F1", "RICE", 2023, 4.6))
        .with_yield(yield_record("F1", "RICE", 2024, 5.1))
        .with_yield(yield_record("F1", "RICE", 2025, 4.9))
        .with_yield(yield_record("F1", "MAIZE", 2024, 3.8))
}
