// ==========================================
// ACA-O 作物面积优化引擎 - 已播种面积仓储
// ==========================================
// 存储: planted_area (field_id, season, crop_id) -> area_ha
// 用途: Plan-B 的面积下界
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub struct LockedAreaRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LockedAreaRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入/覆盖某作物的已播种面积
    pub fn upsert(&self, field_id: &str, season: &str, crop_id: &str, area_ha: f64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::upsert_with(&conn, field_id, season, crop_id, area_ha)
    }

    /// 在给定连接 (或事务) 上写入，供方案落库时同事务使用
    pub(crate) fn upsert_with(
        conn: &Connection,
        field_id: &str,
        season: &str,
        crop_id: &str,
        area_ha: f64,
    ) -> RepositoryResult<()> {
        Self::check_area(area_ha)?;
        conn.execute(
            r#"INSERT INTO planted_area (field_id, season, crop_id, area_ha)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(field_id, season, crop_id)
               DO UPDATE SET area_ha = ?4, updated_at = datetime('now')"#,
            params![field_id, season, crop_id, area_ha],
        )?;
        Ok(())
    }

    pub(crate) fn check_area(area_ha: f64) -> RepositoryResult<()> {
        if !area_ha.is_finite() || area_ha < 0.0 {
            return Err(RepositoryError::FieldValueError {
                field: "area_ha".to_string(),
                message: format!("已播种面积必须为非负数, 实际={}", area_ha),
            });
        }
        Ok(())
    }

    /// 某田块某季度的已播种面积 (crop_id -> area_ha)，忽略 0 面积
    pub fn find_by_field_season(&self, field_id: &str, season: &str) -> RepositoryResult<BTreeMap<String, f64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT crop_id, area_ha FROM planted_area WHERE field_id = ?1 AND season = ?2 AND area_ha > 0",
        )?;
        let rows = stmt.query_map(params![field_id, season], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut result = BTreeMap::new();
        for row in rows {
            let (crop_id, area) = row?;
            result.insert(crop_id, area);
        }
        Ok(result)
    }

    pub fn delete(&self, field_id: &str, season: &str, crop_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n = conn.execute(
            "DELETE FROM planted_area WHERE field_id = ?1 AND season = ?2 AND crop_id = ?3",
            params![field_id, season, crop_id],
        )?;
        Ok(n)
    }
}
