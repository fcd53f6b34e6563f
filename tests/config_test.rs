// ==========================================
// 配置管理器集成测试
// ==========================================
// 职责: config_kv 覆写 / 解析失败回退 / 非法配置拒绝 / 快照
// ==========================================

mod helpers;

use aca_engine::config::{config_keys, ConfigError, ConfigManager, EngineConfig};
use aca_engine::domain::Criterion;
use aca_engine::{EngineError, WaterQuotaBasis, WaterSensitivity};
use approx::assert_relative_eq;
use helpers::test_db::create_test_db;

fn open_manager() -> (tempfile::NamedTempFile, ConfigManager) {
    let (tmp, db_path) = create_test_db();
    let manager = ConfigManager::new(&db_path).unwrap();
    (tmp, manager)
}

#[test]
fn test_defaults_without_overrides() {
    let (_tmp, manager) = open_manager();
    let cfg = manager.load_engine_config().unwrap();
    assert_eq!(cfg, EngineConfig::default());
    assert_eq!(manager.get_config_snapshot().unwrap(), "{}");
}

#[test]
fn test_overrides_are_applied() {
    let (_tmp, manager) = open_manager();
    manager.set_global(config_keys::MIN_AREA_PER_SELECTED_CROP_HA, "1.5").unwrap();
    manager.set_global(config_keys::MAX_CROPS_SELECTED, "3").unwrap();
    manager.set_global(config_keys::WATER_QUOTA_BASIS, "absolute").unwrap();
    manager.set_global(config_keys::SOLVER_TIME_LIMIT_MS, " 500 ").unwrap();
    manager.set_global(config_keys::DEFAULT_WATER_SENSITIVITY, "HIGH").unwrap();
    manager.set_global(config_keys::RISK_MIN_SAMPLES, "5").unwrap();
    manager
        .set_global(
            config_keys::CRITERIA_WEIGHTS,
            r#"{"soil_suitability": 2, "water_coverage_ratio": 1, "historical_yield": 1,
                "water_sensitivity": 0, "growth_duration": 0}"#,
        )
        .unwrap();

    let cfg = manager.load_engine_config().unwrap();
    assert_relative_eq!(cfg.allocation.min_area_per_selected_crop_ha, 1.5);
    assert_eq!(cfg.allocation.max_crops_selected, Some(3));
    assert_eq!(cfg.allocation.water_quota_basis, WaterQuotaBasis::Absolute);
    assert_eq!(cfg.allocation.solver_time_limit_ms, 500);
    assert_eq!(cfg.features.default_water_sensitivity, WaterSensitivity::High);
    assert_eq!(cfg.risk.min_samples, 5);

    let weights = cfg.scoring.weights.normalized();
    assert_relative_eq!(weights[&Criterion::SoilSuitability], 0.5);
    assert_relative_eq!(weights[&Criterion::GrowthDuration], 0.0);

    // 覆写值再次写入时更新
    manager.set_global(config_keys::MAX_CROPS_SELECTED, "none").unwrap();
    let cfg = manager.load_engine_config().unwrap();
    assert_eq!(cfg.allocation.max_crops_selected, None);
}

#[test]
fn test_unparsable_values_fall_back_to_defaults() {
    let (_tmp, manager) = open_manager();
    manager.set_global(config_keys::SUITABILITY_FLOOR, "half").unwrap();
    manager.set_global(config_keys::WATER_QUOTA_BASIS, "per-acre").unwrap();
    manager.set_global(config_keys::CRITERIA_WEIGHTS, "not json").unwrap();

    let cfg = manager.load_engine_config().unwrap();
    let defaults = EngineConfig::default();
    assert_relative_eq!(cfg.allocation.suitability_floor, defaults.allocation.suitability_floor);
    assert_eq!(cfg.allocation.water_quota_basis, defaults.allocation.water_quota_basis);
    assert_eq!(cfg.scoring.weights, defaults.scoring.weights);
}

#[test]
fn test_invalid_values_are_rejected() {
    let (_tmp, manager) = open_manager();
    manager.set_global(config_keys::SUITABILITY_FLOOR, "1.5").unwrap();
    match manager.load_engine_config() {
        Err(ConfigError::Invalid(EngineError::Validation { field, .. })) => {
            assert_eq!(field, "allocation.suitability_floor")
        }
        other => panic!("Expected Invalid, got {:?}", other),
    }

    let (_tmp, manager) = open_manager();
    manager
        .set_global(config_keys::CRITERIA_WEIGHTS, r#"{"soil_suitability": 1.0}"#)
        .unwrap();
    assert!(matches!(
        manager.load_engine_config(),
        Err(ConfigError::Invalid(EngineError::Validation { .. }))
    ));
}

#[test]
fn test_snapshot_lists_overrides_sorted() {
    let (_tmp, manager) = open_manager();
    manager.set_global(config_keys::SOLVER_NODE_LIMIT, "1000").unwrap();
    manager.set_global(config_keys::ALLOCATION_EPSILON, "0.0001").unwrap();

    assert_eq!(
        manager.get_config_snapshot().unwrap(),
        r#"{"allocation_epsilon":"0.0001","solver_node_limit":"1000"}"#
    );
    assert_eq!(
        manager.get_global_config_value(config_keys::SOLVER_NODE_LIMIT).unwrap().as_deref(),
        Some("1000")
    );
    assert!(manager.get_global_config_value("unknown").unwrap().is_none());
}
