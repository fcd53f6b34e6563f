// ==========================================
// ACA-O 作物面积优化引擎 - 命令行入口
// ==========================================
// 用法: aca-engine <scenario.json> [db_path]
// 输入: 目录数据 (内嵌或 CSV 目录) + 推荐请求 + Plan-B 请求 + 供给汇总查询
// 输出: stdout 上的 JSON 结果；日志写 stderr
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use aca_engine::api::{ApiResult, PlanBRequest, RecommendationApi, RecommendationRequest};
use aca_engine::config::ConfigManager;
use aca_engine::db::{init_schema, open_sqlite_connection};
use aca_engine::engine::RecommendationPipeline;
use aca_engine::importer::CatalogImporter;
use aca_engine::logging;
use aca_engine::provider::InMemoryCatalog;
use aca_engine::repository::{LockedAreaRepository, PlanRepository};

/// 情景文件
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    /// 内嵌目录数据
    #[serde(default)]
    catalog: InMemoryCatalog,
    /// CSV 目录 (相对情景文件所在目录)，与内嵌数据合并
    #[serde(default)]
    data_dir: Option<PathBuf>,
    #[serde(default)]
    requests: Vec<RecommendationRequest>,
    #[serde(default)]
    plan_b: Vec<PlanBRequest>,
    #[serde(default)]
    supply: Vec<SupplyQuery>,
}

#[derive(Debug, Deserialize)]
struct SupplyQuery {
    season: String,
    #[serde(default)]
    scheme_id: Option<String>,
}

fn render<T: serde::Serialize>(result: ApiResult<T>) -> Result<Value> {
    Ok(match result {
        Ok(v) => serde_json::to_value(v)?,
        Err(e) => json!({ "error": e.to_body() }),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(scenario_path) = args.next().map(PathBuf::from) else {
        bail!("用法: aca-engine <scenario.json> [db_path]");
    };
    let db_path = args.next().unwrap_or_else(|| ":memory:".to_string());

    tracing::info!(version = aca_engine::VERSION, scenario = %scenario_path.display(), db = %db_path, "启动");

    // 1. 读取情景
    let raw = std::fs::read_to_string(&scenario_path)
        .with_context(|| format!("无法读取情景文件: {}", scenario_path.display()))?;
    let scenario: ScenarioFile = serde_json::from_str(&raw).context("情景文件格式错误")?;

    let mut catalog = scenario.catalog;
    let mut import_issues = Vec::new();
    if let Some(dir) = &scenario.data_dir {
        let dir = match scenario_path.parent() {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir.clone(),
        };
        let report = CatalogImporter::new()
            .import_dir(&dir)
            .with_context(|| format!("CSV 目录导入失败: {}", dir.display()))?;
        import_issues = report.issues;
        catalog.merge(report.catalog);
    }
    let catalog = Arc::new(catalog);

    // 2. 数据库与配置
    let conn = open_sqlite_connection(&db_path).context("无法打开数据库")?;
    init_schema(&conn).context("数据库初始化失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config_manager = ConfigManager::from_connection(conn.clone());
    let config = config_manager.load_engine_config()?;
    let snapshot = config_manager.get_config_snapshot()?;

    // 3. 组装
    let pipeline = Arc::new(RecommendationPipeline::new(config)?);
    let api = RecommendationApi::new(
        pipeline,
        catalog.clone(),
        catalog.clone(),
        catalog,
        Arc::new(PlanRepository::new(conn.clone())),
        Arc::new(LockedAreaRepository::new(conn)),
    )
    .with_config_snapshot(snapshot);

    // 4. 执行: 推荐 (并行) -> Plan-B (顺序) -> 供给汇总
    let mut recommendations = Vec::new();
    for result in api.recommend_batch(&scenario.requests).await {
        recommendations.push(render(result)?);
    }

    let mut plan_b = Vec::new();
    for req in &scenario.plan_b {
        plan_b.push(render(api.plan_b(req).await)?);
    }

    let mut supply = Vec::new();
    for q in &scenario.supply {
        supply.push(render(api.supply(&q.season, q.scheme_id.as_deref()).await)?);
    }

    let output = json!({
        "import_issues": import_issues,
        "recommendations": recommendations,
        "plan_b": plan_b,
        "supply": supply,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
