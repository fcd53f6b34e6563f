// ==========================================
// CSV 目录导入集成测试
// ==========================================
// 链路: CSV 目录 -> CatalogImporter -> 内存目录 -> 推荐 API
// ==========================================

mod helpers;

use aca_engine::api::{RecommendationApi, RecommendationRequest};
use aca_engine::engine::RecommendationPipeline;
use aca_engine::importer::{CatalogImporter, ImportError};
use aca_engine::repository::{LockedAreaRepository, PlanRepository};
use aca_engine::{EngineConfig, PlanStatus, WaterSensitivity};
use helpers::test_data_builder::{as_of, SEASON};
use helpers::test_db::{create_test_db, open_test_connection};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const FIELDS: &str = "\
field_id,total_plantable_area_ha,water_quota_mm,soil_ph,soil_ec,scheme_id
F10,12,450,6.8,0.9,S1
F11,,400,7.0,,S1
F12,5,380,abc,,S2
";

const CROPS: &str = "\
crop_id,name,ph_min,ph_max,ec_max,water_sensitivity,base_yield_t_per_ha,growth_duration_days,water_requirement_mm,estimated_cost_per_ha
COTTON,Cotton,5.8,8.0,7.7,medium,2.0,160,550,300
GROUNDNUT,Groundnut,6.0,7.5,3.2,low,1.8,110,350,250
PADDY,Paddy,5.0,7.0,3.0,very-high,5.0,125,1000,600
";

const PRICES: &str = "\
crop_id,price_date,price_per_kg
COTTON,2026-05-01,0.60
GROUNDNUT,2026/05/15,0.55
PADDY,20260520,0.30
PADDY,May 25,0.31
";

const YIELDS: &str = "\
field_id,crop_id,season,year,yield_t_per_ha
F10,GROUNDNUT,kharif,2024,1.9
F10,GROUNDNUT,kharif,2025,2.1
F10,COTTON,kharif,x,2.0
";

fn write_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn full_dir() -> TempDir {
    write_dir(&[
        ("fields.csv", FIELDS),
        ("crops.csv", CROPS),
        ("prices.csv", PRICES),
        ("yields.csv", YIELDS),
    ])
}

#[test]
fn test_import_dir_keeps_good_rows_and_reports_bad_ones() {
    let dir = full_dir();
    let report = CatalogImporter::new().import_dir(dir.path()).unwrap();
    let catalog = &report.catalog;

    let field_ids: Vec<&str> = catalog.fields.iter().map(|f| f.field_id.as_str()).collect();
    assert_eq!(field_ids, vec!["F10", "F12"]);
    assert_eq!(catalog.crops.len(), 3);
    assert_eq!(catalog.prices.len(), 3);
    assert_eq!(catalog.yields.len(), 2);

    // 可选字段解析失败按缺失处理
    let f12 = &catalog.fields[1];
    assert_eq!(f12.soil_ph, None);
    assert_eq!(f12.scheme_id.as_deref(), Some("S2"));
    let paddy = catalog.crops.iter().find(|c| c.crop_id == "PADDY").unwrap();
    assert_eq!(paddy.water_sensitivity, None);
    let groundnut = catalog.crops.iter().find(|c| c.crop_id == "GROUNDNUT").unwrap();
    assert_eq!(groundnut.water_sensitivity, Some(WaterSensitivity::Low));

    // 跳过: F11 (面积缺失), PADDY 日期非法, COTTON 年份非法
    assert_eq!(report.skipped_rows(), 3);
    // 仅记录: F12 soil_ph, PADDY water_sensitivity
    assert_eq!(report.issues.len(), 5);
    let skipped_f11 = report
        .issues
        .iter()
        .find(|i| i.file == "fields.csv" && i.row_skipped)
        .unwrap();
    assert_eq!(skipped_f11.row, 3);
}

#[test]
fn test_optional_files_may_be_absent() {
    let dir = write_dir(&[("fields.csv", FIELDS), ("crops.csv", CROPS)]);
    let report = CatalogImporter::new().import_dir(dir.path()).unwrap();
    assert!(report.catalog.prices.is_empty());
    assert!(report.catalog.yields.is_empty());
    assert_eq!(report.catalog.crops.len(), 3);
}

#[test]
fn test_required_files_and_columns() {
    let dir = write_dir(&[("fields.csv", FIELDS)]);
    match CatalogImporter::new().import_dir(dir.path()) {
        Err(ImportError::FileNotFound(path)) => assert!(path.ends_with("crops.csv")),
        other => panic!("Expected FileNotFound, got {:?}", other.map(|r| r.rows_read)),
    }

    let dir = write_dir(&[
        ("fields.csv", "field_id,total_plantable_area_ha\nF1,10\n"),
        ("crops.csv", CROPS),
    ]);
    match CatalogImporter::new().import_dir(dir.path()) {
        Err(ImportError::MissingColumn { file, column }) => {
            assert_eq!(file, "fields.csv");
            assert_eq!(column, "water_quota_mm");
        }
        other => panic!("Expected MissingColumn, got {:?}", other.map(|r| r.rows_read)),
    }
}

fn api_over(dir: &Path) -> (tempfile::NamedTempFile, RecommendationApi) {
    let report = CatalogImporter::new().import_dir(dir).unwrap();
    let catalog = Arc::new(report.catalog);
    let (tmp, db_path) = create_test_db();
    let conn = open_test_connection(&db_path);
    let api = RecommendationApi::new(
        Arc::new(RecommendationPipeline::new(EngineConfig::default()).unwrap()),
        catalog.clone(),
        catalog.clone(),
        catalog,
        Arc::new(PlanRepository::new(conn.clone())),
        Arc::new(LockedAreaRepository::new(conn)),
    );
    (tmp, api)
}

#[tokio::test]
async fn test_imported_catalog_drives_recommendation() {
    let dir = full_dir();
    let (_tmp, api) = api_over(dir.path());

    let req = RecommendationRequest {
        as_of: Some(as_of()),
        ..RecommendationRequest::new("F10", SEASON)
    };
    let resp = api.recommend(&req).await.unwrap();
    assert_eq!(resp.plan.revision, Some(1));
    assert_ne!(resp.plan.status, PlanStatus::Infeasible);
    assert!(resp.plan.total_area_ha <= 12.0 + 1e-6);
    assert!(resp.plan.total_water_mm_ha <= 450.0 * 12.0 + 1e-6);
    assert_eq!(resp.applied_prices.len(), 3);
    assert!(resp.applied_prices.iter().all(|p| p.stale));

    // 被跳过的田块不可见
    let err = api
        .recommend(&RecommendationRequest::new("F11", SEASON))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), 404);
}
