// ==========================================
// ACA-O 作物面积优化引擎 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表加载引擎配置覆写，生成配置快照
// 存储: config_kv 表 (scope_id='global')
// 规则: 单键缺失或无法解析时回退该键缺省值，整体加载后统一校验
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::db::open_sqlite_connection;
use crate::domain::features::CriteriaWeights;
use crate::domain::types::{WaterQuotaBasis, WaterSensitivity};
use crate::engine::error::EngineError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置存储访问失败: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("配置存储锁获取失败: {0}")]
    Lock(String),

    #[error("配置快照序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置非法: {0}")]
    Invalid(#[from] EngineError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> ConfigResult<std::sync::MutexGuard<Connection>> {
        self.conn.lock().map_err(|e| ConfigError::Lock(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global 配置 (UPSERT)
    pub fn set_global(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析；缺失或无法解析时回退缺省值
    fn read_or<T: FromStr>(&self, key: &str, default: T) -> ConfigResult<T> {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(config_key = key, value = %raw, "配置值无法解析，使用缺省值");
                    Ok(default)
                }
            },
        }
    }

    /// 加载引擎配置: 缺省值 + config_kv 覆写，并校验
    pub fn load_engine_config(&self) -> ConfigResult<EngineConfig> {
        let mut cfg = EngineConfig::default();

        // ===== 评分 =====
        if let Some(raw) = self.get_global_config_value(config_keys::CRITERIA_WEIGHTS)? {
            match serde_json::from_str::<BTreeMap<String, f64>>(&raw) {
                Ok(named) => cfg.scoring.weights = CriteriaWeights::from_named(&named)?,
                Err(e) => warn!(config_key = config_keys::CRITERIA_WEIGHTS, error = %e, "权重配置格式错误，使用缺省权重"),
            }
        }
        cfg.scoring.measured_soil_spread =
            self.read_or(config_keys::MEASURED_SOIL_SPREAD, cfg.scoring.measured_soil_spread)?;
        cfg.scoring.missing_soil_spread =
            self.read_or(config_keys::MISSING_SOIL_SPREAD, cfg.scoring.missing_soil_spread)?;

        // ===== 分配 =====
        let a = &mut cfg.allocation;
        a.min_area_per_selected_crop_ha =
            self.read_or(config_keys::MIN_AREA_PER_SELECTED_CROP_HA, a.min_area_per_selected_crop_ha)?;
        if let Some(raw) = self.get_global_config_value(config_keys::MAX_CROPS_SELECTED)? {
            let raw = raw.trim();
            a.max_crops_selected = if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
                None
            } else {
                match raw.parse::<usize>() {
                    Ok(k) => Some(k),
                    Err(_) => {
                        warn!(config_key = config_keys::MAX_CROPS_SELECTED, value = raw, "配置值无法解析，不限制作物数");
                        None
                    }
                }
            };
        }
        a.suitability_floor = self.read_or(config_keys::SUITABILITY_FLOOR, a.suitability_floor)?;
        if let Some(raw) = self.get_global_config_value(config_keys::WATER_QUOTA_BASIS)? {
            a.water_quota_basis = WaterQuotaBasis::parse(&raw).unwrap_or_else(|| {
                warn!(config_key = config_keys::WATER_QUOTA_BASIS, value = %raw, "未知配额口径，使用缺省值");
                WaterQuotaBasis::default()
            });
        }
        a.solver_time_limit_ms = self.read_or(config_keys::SOLVER_TIME_LIMIT_MS, a.solver_time_limit_ms)?;
        a.solver_node_limit = self.read_or(config_keys::SOLVER_NODE_LIMIT, a.solver_node_limit)?;
        a.epsilon = self.read_or(config_keys::ALLOCATION_EPSILON, a.epsilon)?;

        // ===== 风险 =====
        let r = &mut cfg.risk;
        r.cv_low_max = self.read_or(config_keys::RISK_CV_LOW_MAX, r.cv_low_max)?;
        r.cv_medium_max = self.read_or(config_keys::RISK_CV_MEDIUM_MAX, r.cv_medium_max)?;
        r.min_samples = self.read_or(config_keys::RISK_MIN_SAMPLES, r.min_samples)?;

        // ===== 特征 =====
        let f = &mut cfg.features;
        if let Some(raw) = self.get_global_config_value(config_keys::DEFAULT_WATER_SENSITIVITY)? {
            f.default_water_sensitivity = WaterSensitivity::parse(&raw).unwrap_or_default();
        }
        f.default_growth_duration_days =
            self.read_or(config_keys::DEFAULT_GROWTH_DURATION_DAYS, f.default_growth_duration_days)?;
        f.default_soil_suitability =
            self.read_or(config_keys::DEFAULT_SOIL_SUITABILITY, f.default_soil_suitability)?;
        f.recency_decay = self.read_or(config_keys::YIELD_RECENCY_DECAY, f.recency_decay)?;
        f.ph_tolerance = self.read_or(config_keys::PH_TOLERANCE, f.ph_tolerance)?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// 获取所有 global 配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 保存方案时记录当时的配置覆写
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(serde_json::to_string(&config_map)?)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 评分
    pub const CRITERIA_WEIGHTS: &str = "criteria_weights"; // JSON: {"soil_suitability": 0.25, ...}
    pub const MEASURED_SOIL_SPREAD: &str = "measured_soil_spread";
    pub const MISSING_SOIL_SPREAD: &str = "missing_soil_spread";

    // 分配
    pub const MIN_AREA_PER_SELECTED_CROP_HA: &str = "min_area_per_selected_crop_ha";
    pub const MAX_CROPS_SELECTED: &str = "max_crops_selected";
    pub const SUITABILITY_FLOOR: &str = "suitability_floor";
    pub const WATER_QUOTA_BASIS: &str = "water_quota_basis";
    pub const SOLVER_TIME_LIMIT_MS: &str = "solver_time_limit_ms";
    pub const SOLVER_NODE_LIMIT: &str = "solver_node_limit";
    pub const ALLOCATION_EPSILON: &str = "allocation_epsilon";

    // 风险
    pub const RISK_CV_LOW_MAX: &str = "risk_cv_low_max";
    pub const RISK_CV_MEDIUM_MAX: &str = "risk_cv_medium_max";
    pub const RISK_MIN_SAMPLES: &str = "risk_min_samples";

    // 特征
    pub const DEFAULT_WATER_SENSITIVITY: &str = "default_water_sensitivity";
    pub const DEFAULT_GROWTH_DURATION_DAYS: &str = "default_growth_duration_days";
    pub const DEFAULT_SOIL_SUITABILITY: &str = "default_soil_suitability";
    pub const YIELD_RECENCY_DECAY: &str = "yield_recency_decay";
    pub const PH_TOLERANCE: &str = "ph_tolerance";
}
