// ==========================================
// ACA-O 作物面积优化引擎 - 目录 CSV 导入器
// ==========================================
// 输入目录: fields.csv / crops.csv (必需), prices.csv / yields.csv (可选)
// 输出: InMemoryCatalog + 行级问题清单
// 规则:
// - 主键或承重字段缺失/非法: 跳过该行并记录
// - 可选字段非法: 按缺失处理并记录，由特征构建按缺省值降级
// ==========================================

use crate::domain::field::{Crop, Field, Location};
use crate::domain::market::{PriceRecord, YieldRecord};
use crate::domain::types::WaterSensitivity;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{CsvParser, RawRow};
use crate::provider::InMemoryCatalog;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, instrument, warn};

pub const FIELDS_FILE: &str = "fields.csv";
pub const CROPS_FILE: &str = "crops.csv";
pub const PRICES_FILE: &str = "prices.csv";
pub const YIELDS_FILE: &str = "yields.csv";

// ==========================================
// ImportIssue - 行级问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportIssue {
    pub file: String,
    pub row: usize,
    pub message: String,
    pub row_skipped: bool,
}

// ==========================================
// CatalogImportReport - 导入结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CatalogImportReport {
    pub catalog: InMemoryCatalog,
    pub rows_read: usize,
    pub issues: Vec<ImportIssue>,
}

impl CatalogImportReport {
    pub fn skipped_rows(&self) -> usize {
        self.issues.iter().filter(|i| i.row_skipped).count()
    }

    fn skip(&mut self, file: &str, err: ImportError) {
        self.issues.push(ImportIssue {
            file: file.to_string(),
            row: row_of(&err),
            message: err.to_string(),
            row_skipped: true,
        });
    }

    fn note(&mut self, file: &str, err: ImportError) {
        self.issues.push(ImportIssue {
            file: file.to_string(),
            row: row_of(&err),
            message: err.to_string(),
            row_skipped: false,
        });
    }
}

fn row_of(err: &ImportError) -> usize {
    match err {
        ImportError::PrimaryKeyMissing { row, .. }
        | ImportError::TypeConversionError { row, .. }
        | ImportError::DateFormatError { row, .. }
        | ImportError::FieldMappingError { row, .. } => *row,
        _ => 0,
    }
}

// ==========================================
// CatalogImporter
// ==========================================
pub struct CatalogImporter {
    parser: CsvParser,
}

impl Default for CatalogImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogImporter {
    pub fn new() -> Self {
        Self { parser: CsvParser }
    }

    /// 导入整个目录
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn import_dir(&self, dir: &Path) -> ImportResult<CatalogImportReport> {
        let mut report = CatalogImportReport::default();

        let fields = self.parser.parse_file(&dir.join(FIELDS_FILE))?;
        self.map_fields(&fields, &mut report)?;

        let crops = self.parser.parse_file(&dir.join(CROPS_FILE))?;
        self.map_crops(&crops, &mut report)?;

        let prices_path = dir.join(PRICES_FILE);
        if prices_path.exists() {
            let prices = self.parser.parse_file(&prices_path)?;
            self.map_prices(&prices, &mut report)?;
        } else {
            info!(file = PRICES_FILE, "价格文件不存在，跳过");
        }

        let yields_path = dir.join(YIELDS_FILE);
        if yields_path.exists() {
            let yields = self.parser.parse_file(&yields_path)?;
            self.map_yields(&yields, &mut report)?;
        } else {
            info!(file = YIELDS_FILE, "历史产量文件不存在，跳过");
        }

        info!(
            fields = report.catalog.fields.len(),
            crops = report.catalog.crops.len(),
            prices = report.catalog.prices.len(),
            yields = report.catalog.yields.len(),
            issues = report.issues.len(),
            "目录导入完成"
        );
        Ok(report)
    }

    // ===== fields.csv =====
    pub fn map_fields(&self, rows: &[RawRow], report: &mut CatalogImportReport) -> ImportResult<()> {
        require_columns(FIELDS_FILE, rows, &["field_id", "total_plantable_area_ha", "water_quota_mm"])?;
        for row in rows {
            report.rows_read += 1;
            match map_field(row, report) {
                Ok(field) => {
                    if report.catalog.fields.iter().any(|f| f.field_id == field.field_id) {
                        report.skip(
                            FIELDS_FILE,
                            ImportError::FieldMappingError {
                                row: row.row_number,
                                message: format!("田块ID重复: {}", field.field_id),
                            },
                        );
                    } else {
                        report.catalog.fields.push(field);
                    }
                }
                Err(e) if e.is_row_level() => report.skip(FIELDS_FILE, e),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    // ===== crops.csv =====
    pub fn map_crops(&self, rows: &[RawRow], report: &mut CatalogImportReport) -> ImportResult<()> {
        require_columns(CROPS_FILE, rows, &["crop_id"])?;
        for row in rows {
            report.rows_read += 1;
            match map_crop(row, report) {
                Ok(crop) => {
                    if report.catalog.crops.iter().any(|c| c.crop_id == crop.crop_id) {
                        report.skip(
                            CROPS_FILE,
                            ImportError::FieldMappingError {
                                row: row.row_number,
                                message: format!("作物ID重复: {}", crop.crop_id),
                            },
                        );
                    } else {
                        report.catalog.crops.push(crop);
                    }
                }
                Err(e) if e.is_row_level() => report.skip(CROPS_FILE, e),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    // ===== prices.csv =====
    pub fn map_prices(&self, rows: &[RawRow], report: &mut CatalogImportReport) -> ImportResult<()> {
        require_columns(PRICES_FILE, rows, &["crop_id", "price_date", "price_per_kg"])?;
        for row in rows {
            report.rows_read += 1;
            let mapped = (|| -> ImportResult<PriceRecord> {
                let price_per_kg: f64 = required(row, "price_per_kg")?;
                if !price_per_kg.is_finite() || price_per_kg < 0.0 {
                    return Err(ImportError::FieldMappingError {
                        row: row.row_number,
                        message: format!("价格必须为非负数: {}", price_per_kg),
                    });
                }
                Ok(PriceRecord {
                    crop_id: key(row, "crop_id")?,
                    price_date: date(row, "price_date")?,
                    price_per_kg,
                })
            })();
            match mapped {
                Ok(p) => report.catalog.prices.push(p),
                Err(e) if e.is_row_level() => report.skip(PRICES_FILE, e),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    // ===== yields.csv =====
    pub fn map_yields(&self, rows: &[RawRow], report: &mut CatalogImportReport) -> ImportResult<()> {
        require_columns(
            YIELDS_FILE,
            rows,
            &["field_id", "crop_id", "season", "year", "yield_t_per_ha"],
        )?;
        for row in rows {
            report.rows_read += 1;
            let mapped = (|| -> ImportResult<YieldRecord> {
                let yield_t_per_ha: f64 = required(row, "yield_t_per_ha")?;
                if !yield_t_per_ha.is_finite() || yield_t_per_ha < 0.0 {
                    return Err(ImportError::FieldMappingError {
                        row: row.row_number,
                        message: format!("产量必须为非负数: {}", yield_t_per_ha),
                    });
                }
                Ok(YieldRecord {
                    field_id: key(row, "field_id")?,
                    crop_id: key(row, "crop_id")?,
                    season: key(row, "season")?,
                    year: required(row, "year")?,
                    yield_t_per_ha,
                })
            })();
            match mapped {
                Ok(y) => report.catalog.yields.push(y),
                Err(e) if e.is_row_level() => report.skip(YIELDS_FILE, e),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_field(row: &RawRow, report: &mut CatalogImportReport) -> ImportResult<Field> {
    let field_id = key(row, "field_id")?;
    let total_plantable_area_ha: f64 = required(row, "total_plantable_area_ha")?;
    if !total_plantable_area_ha.is_finite() || total_plantable_area_ha <= 0.0 {
        return Err(ImportError::FieldMappingError {
            row: row.row_number,
            message: format!("可种面积必须为正数: {}", total_plantable_area_ha),
        });
    }
    let water_quota_mm: f64 = required(row, "water_quota_mm")?;
    if !water_quota_mm.is_finite() || water_quota_mm < 0.0 {
        return Err(ImportError::FieldMappingError {
            row: row.row_number,
            message: format!("用水配额必须为非负数: {}", water_quota_mm),
        });
    }

    Ok(Field {
        field_id,
        total_plantable_area_ha,
        water_quota_mm,
        soil_type: text(row, "soil_type"),
        soil_ph: optional(row, "soil_ph", FIELDS_FILE, report),
        soil_ec: optional(row, "soil_ec", FIELDS_FILE, report),
        location: Location {
            latitude: optional(row, "latitude", FIELDS_FILE, report),
            longitude: optional(row, "longitude", FIELDS_FILE, report),
            region: text(row, "region"),
        },
        scheme_id: text(row, "scheme_id"),
    })
}

fn map_crop(row: &RawRow, report: &mut CatalogImportReport) -> ImportResult<Crop> {
    let crop_id = key(row, "crop_id")?;

    let water_sensitivity = match row.get("water_sensitivity") {
        None => None,
        Some(raw) => {
            let parsed = WaterSensitivity::parse(raw);
            if parsed.is_none() {
                report.note(
                    CROPS_FILE,
                    ImportError::TypeConversionError {
                        row: row.row_number,
                        field: "water_sensitivity".to_string(),
                        value: raw.to_string(),
                    },
                );
            }
            parsed
        }
    };

    Ok(Crop {
        crop_id,
        name: text(row, "name"),
        ph_min: optional(row, "ph_min", CROPS_FILE, report),
        ph_max: optional(row, "ph_max", CROPS_FILE, report),
        ec_max: optional(row, "ec_max", CROPS_FILE, report),
        water_sensitivity,
        base_yield_t_per_ha: optional(row, "base_yield_t_per_ha", CROPS_FILE, report),
        growth_duration_days: optional(row, "growth_duration_days", CROPS_FILE, report),
        water_requirement_mm: optional(row, "water_requirement_mm", CROPS_FILE, report),
        estimated_cost_per_ha: optional(row, "estimated_cost_per_ha", CROPS_FILE, report),
    })
}

// ==========================================
// 取值辅助
// ==========================================

fn require_columns(file: &str, rows: &[RawRow], columns: &[&str]) -> ImportResult<()> {
    let Some(first) = rows.first() else {
        warn!(file, "文件无数据行");
        return Ok(());
    };
    for column in columns {
        if !first.values.contains_key(*column) {
            return Err(ImportError::MissingColumn {
                file: file.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

fn key(row: &RawRow, column: &str) -> ImportResult<String> {
    row.get(column)
        .map(|v| v.to_string())
        .ok_or_else(|| ImportError::PrimaryKeyMissing {
            row: row.row_number,
            field: column.to_string(),
        })
}

fn text(row: &RawRow, column: &str) -> Option<String> {
    row.get(column).map(|v| v.to_string())
}

fn required<T: FromStr>(row: &RawRow, column: &str) -> ImportResult<T> {
    let raw = row.get(column).ok_or_else(|| ImportError::FieldMappingError {
        row: row.row_number,
        message: format!("必填字段为空: {}", column),
    })?;
    raw.parse::<T>().map_err(|_| ImportError::TypeConversionError {
        row: row.row_number,
        field: column.to_string(),
        value: raw.to_string(),
    })
}

/// 可选字段: 空值为 None；无法解析时记录问题并按缺失处理
fn optional<T: FromStr>(
    row: &RawRow,
    column: &str,
    file: &str,
    report: &mut CatalogImportReport,
) -> Option<T> {
    let raw = row.get(column)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            report.note(
                file,
                ImportError::TypeConversionError {
                    row: row.row_number,
                    field: column.to_string(),
                    value: raw.to_string(),
                },
            );
            None
        }
    }
}

/// 日期: YYYY-MM-DD / YYYY/MM/DD / YYYYMMDD
fn date(row: &RawRow, column: &str) -> ImportResult<NaiveDate> {
    let raw = row.get(column).ok_or_else(|| ImportError::FieldMappingError {
        row: row.row_number,
        message: format!("必填字段为空: {}", column),
    })?;
    ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| ImportError::DateFormatError {
            row: row.row_number,
            field: column.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn rows(csv: &str) -> Vec<RawRow> {
        CsvParser.parse_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_fields_skip_rows_without_area() {
        let importer = CatalogImporter::new();
        let mut report = CatalogImportReport::default();
        let data = "field_id,total_plantable_area_ha,water_quota_mm,soil_ph,scheme_id\n\
                    F1,10,500,6.5,S1\n\
                    F2,,500,,\n\
                    F3,4,300,acidic,\n";
        importer.map_fields(&rows(data), &mut report).unwrap();

        let ids: Vec<&str> = report.catalog.fields.iter().map(|f| f.field_id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "F3"]);
        assert_eq!(report.catalog.fields[0].scheme_id.as_deref(), Some("S1"));
        assert_eq!(report.catalog.fields[1].soil_ph, None);
        assert_eq!(report.skipped_rows(), 1);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].row, 3);
    }

    #[test]
    fn test_crops_keep_optional_gaps() {
        let importer = CatalogImporter::new();
        let mut report = CatalogImportReport::default();
        let data = "crop_id,name,water_sensitivity,water_requirement_mm,growth_duration_days\n\
                    RICE,Rice,high,600,120\n\
                    MAIZE,Maize,,,\n\
                    ,Nameless,low,,\n\
                    RICE,Dup,low,,\n";
        importer.map_crops(&rows(data), &mut report).unwrap();

        assert_eq!(report.catalog.crops.len(), 2);
        let rice = &report.catalog.crops[0];
        assert_eq!(rice.water_sensitivity, Some(WaterSensitivity::High));
        assert_eq!(rice.growth_duration_days, Some(120));
        let maize = &report.catalog.crops[1];
        assert_eq!(maize.water_sensitivity, None);
        assert_eq!(maize.water_requirement_mm, None);
        assert_eq!(report.skipped_rows(), 2);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let importer = CatalogImporter::new();
        let mut report = CatalogImportReport::default();
        let err = importer
            .map_prices(&rows("crop_id,price\nRICE,0.3\n"), &mut report)
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn { .. }));
    }

    #[test]
    fn test_price_dates_accept_several_formats() {
        let importer = CatalogImporter::new();
        let mut report = CatalogImportReport::default();
        let data = "crop_id,price_date,price_per_kg\n\
                    RICE,2026-05-01,0.30\n\
                    RICE,20260520,0.32\n\
                    RICE,05/06/2026,0.35\n";
        importer.map_prices(&rows(data), &mut report).unwrap();

        assert_eq!(report.catalog.prices.len(), 2);
        assert_eq!(
            report.catalog.prices[1].price_date,
            NaiveDate::from_ymd_opt(2026, 5, 20).unwrap()
        );
        assert!(!report.issues[0].message.is_empty());
        assert!(report.issues[0].row_skipped);
    }

    #[test]
    fn test_import_dir_requires_fields_and_crops() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(FIELDS_FILE),
            "field_id,total_plantable_area_ha,water_quota_mm\nF1,10,500\n",
        )
        .unwrap();

        let err = CatalogImporter::new().import_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));

        fs::write(dir.path().join(CROPS_FILE), "crop_id,water_requirement_mm\nRICE,600\n").unwrap();
        fs::write(
            dir.path().join(YIELDS_FILE),
            "field_id,crop_id,season,year,yield_t_per_ha\nF1,RICE,kharif,2024,4.2\nF1,RICE,kharif,bad,4.0\n",
        )
        .unwrap();

        let report = CatalogImporter::new().import_dir(dir.path()).unwrap();
        assert_eq!(report.catalog.fields.len(), 1);
        assert_eq!(report.catalog.crops.len(), 1);
        assert!(report.catalog.prices.is_empty());
        assert_eq!(report.catalog.yields.len(), 1);
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.skipped_rows(), 1);
    }
}
