// ==========================================
// ACA-O 作物面积优化引擎 - 分配方案数据仓储
// ==========================================
// 存储: allocation_plan (方案 JSON + 索引列)
// 并发: 同一 (field_id, season) 以 revision 做乐观锁，保证单写者
// 红线: Repository 不含业务逻辑；方案只追加，不更新
// ==========================================

use crate::domain::plan::AllocationPlan;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::locked_area_repo::LockedAreaRepository;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// StoredPlan - 带版本号的方案
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPlan {
    pub revision: i64,
    pub plan: AllocationPlan,
    pub config_snapshot_json: Option<String>,
}

// ==========================================
// PlanRepository - 分配方案仓储
// ==========================================
pub struct PlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanRepository {
    /// 创建新的PlanRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 当前最新 revision (无方案时为 0)
    pub fn latest_revision(&self, field_id: &str, season: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::read_revision(&conn, field_id, season)
    }

    fn read_revision(conn: &Connection, field_id: &str, season: &str) -> RepositoryResult<i64> {
        let r: Option<i64> = conn.query_row(
            "SELECT MAX(revision) FROM allocation_plan WHERE field_id = ?1 AND season = ?2",
            params![field_id, season],
            |row| row.get(0),
        )?;
        Ok(r.unwrap_or(0))
    }

    /// 保存新方案
    ///
    /// 使用乐观锁 (revision) 防止同一田块同一季度的并发写入
    ///
    /// # 参数
    /// - `plan`: 新方案
    /// - `expected_revision`: 调用方读取基线时看到的 revision
    /// - `config_snapshot_json`: 生成方案时的配置快照
    ///
    /// # 返回
    /// - `Ok(revision)`: 新方案的 revision
    /// - `Err(RepositoryError::OptimisticLockFailure)`: 期间已有其他写入
    pub fn save_new(
        &self,
        plan: &AllocationPlan,
        expected_revision: i64,
        config_snapshot_json: Option<&str>,
    ) -> RepositoryResult<i64> {
        self.save_with_planted_area(plan, expected_revision, config_snapshot_json, &BTreeMap::new())
    }

    /// 保存新方案，并在同一事务内写入随请求上报的已播种面积
    ///
    /// 乐观锁冲突或写入失败时两者都不落库
    pub fn save_with_planted_area(
        &self,
        plan: &AllocationPlan,
        expected_revision: i64,
        config_snapshot_json: Option<&str>,
        planted_area: &BTreeMap<String, f64>,
    ) -> RepositoryResult<i64> {
        for area in planted_area.values() {
            LockedAreaRepository::check_area(*area)?;
        }
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let actual = Self::read_revision(&tx, &plan.field_id, &plan.season)?;
        if actual != expected_revision {
            return Err(RepositoryError::OptimisticLockFailure {
                field_id: plan.field_id.clone(),
                season: plan.season.clone(),
                expected: expected_revision,
                actual,
            });
        }

        let revision = actual + 1;
        let plan_json = serde_json::to_string(plan)?;
        tx.execute(
            r#"INSERT INTO allocation_plan (
                plan_id, field_id, season, revision, kind, status,
                baseline_plan_id, scheme_id, plan_json, config_snapshot_json, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            params![
                &plan.plan_id,
                &plan.field_id,
                &plan.season,
                revision,
                plan.kind.to_db_str(),
                plan.status.to_string(),
                &plan.baseline_plan_id,
                plan.scheme_id(),
                plan_json,
                config_snapshot_json,
                plan.created_at.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            ],
        )?;
        for (crop_id, area_ha) in planted_area {
            LockedAreaRepository::upsert_with(&tx, &plan.field_id, &plan.season, crop_id, *area_ha)?;
        }
        tx.commit()?;

        debug!(plan_id = %plan.plan_id, revision, planted = planted_area.len(), "方案已保存");
        Ok(revision)
    }

    /// 按ID查询方案
    pub fn find_by_id(&self, plan_id: &str) -> RepositoryResult<Option<StoredPlan>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT revision, plan_json, config_snapshot_json FROM allocation_plan WHERE plan_id = ?1",
                params![plan_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get(2)?)),
            )
            .optional()?;
        row.map(Self::map_stored).transpose()
    }

    /// 查询某田块某季度的最新方案
    pub fn find_latest(&self, field_id: &str, season: &str) -> RepositoryResult<Option<StoredPlan>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"SELECT revision, plan_json, config_snapshot_json FROM allocation_plan
                   WHERE field_id = ?1 AND season = ?2
                   ORDER BY revision DESC LIMIT 1"#,
                params![field_id, season],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get(2)?)),
            )
            .optional()?;
        row.map(Self::map_stored).transpose()
    }

    /// 某季度每个田块的最新方案 (按 field_id 排序)
    pub fn list_latest_by_season(&self, season: &str) -> RepositoryResult<Vec<AllocationPlan>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT p.plan_json FROM allocation_plan p
               JOIN (
                   SELECT field_id, MAX(revision) AS revision
                   FROM allocation_plan WHERE season = ?1 GROUP BY field_id
               ) latest ON p.field_id = latest.field_id AND p.revision = latest.revision
               WHERE p.season = ?1
               ORDER BY p.field_id"#,
        )?;
        let rows = stmt.query_map(params![season], |row| row.get::<_, String>(0))?;

        let mut plans = Vec::new();
        for row in rows {
            plans.push(serde_json::from_str(&row?)?);
        }
        Ok(plans)
    }

    /// 某田块某季度的全部方案 (revision 升序)
    pub fn list_history(&self, field_id: &str, season: &str) -> RepositoryResult<Vec<StoredPlan>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT revision, plan_json, config_snapshot_json FROM allocation_plan
               WHERE field_id = ?1 AND season = ?2 ORDER BY revision"#,
        )?;
        let rows = stmt.query_map(params![field_id, season], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get(2)?))
        })?;

        let mut plans = Vec::new();
        for row in rows {
            plans.push(Self::map_stored(row?)?);
        }
        Ok(plans)
    }

    fn map_stored(row: (i64, String, Option<String>)) -> RepositoryResult<StoredPlan> {
        let (revision, plan_json, config_snapshot_json) = row;
        Ok(StoredPlan {
            revision,
            plan: serde_json::from_str(&plan_json)?,
            config_snapshot_json,
        })
    }
}
