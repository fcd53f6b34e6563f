// ==========================================
// ACA-O 作物面积优化引擎 - 推荐 API
// ==========================================
// 职责:
// - 通过数据提供方装载输入快照，交给引擎计算
// - 方案落库 (乐观锁保证同一田块季度至多一个写入者)
// - 将各层错误转换为 ApiError
// 说明:
// - 引擎计算在阻塞线程池中执行，批量请求并行
// - 情景模拟 (scenario 非基线) 只返回结果，不落库
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::api::dto::{
    AppliedPrice, PlanBRequest, PlanBResponse, PlanView, RecommendationRequest,
    RecommendationResponse, SupplyResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::RequestValidator;
use crate::domain::field::{Crop, Field};
use crate::domain::market::{PriceQuote, YieldRecord};
use crate::engine::orchestrator::{RecommendationInput, RecommendationPipeline};
use crate::provider::{FieldDataProvider, PriceProvider, YieldHistoryProvider};
use crate::repository::{LockedAreaRepository, PlanRepository};

/// 单次推荐的输入快照
struct LoadedInput {
    field: Field,
    crops: Vec<Crop>,
    prices: BTreeMap<String, PriceQuote>,
    history: Vec<YieldRecord>,
}

pub struct RecommendationApi {
    pipeline: Arc<RecommendationPipeline>,
    fields: Arc<dyn FieldDataProvider>,
    prices: Arc<dyn PriceProvider>,
    yields: Arc<dyn YieldHistoryProvider>,
    plan_repo: Arc<PlanRepository>,
    locked_repo: Arc<LockedAreaRepository>,
    config_snapshot: Option<String>,
}

impl RecommendationApi {
    pub fn new(
        pipeline: Arc<RecommendationPipeline>,
        fields: Arc<dyn FieldDataProvider>,
        prices: Arc<dyn PriceProvider>,
        yields: Arc<dyn YieldHistoryProvider>,
        plan_repo: Arc<PlanRepository>,
        locked_repo: Arc<LockedAreaRepository>,
    ) -> Self {
        Self {
            pipeline,
            fields,
            prices,
            yields,
            plan_repo,
            locked_repo,
            config_snapshot: None,
        }
    }

    /// 方案落库时附带的配置快照 (ConfigManager::get_config_snapshot)
    pub fn with_config_snapshot(mut self, snapshot: String) -> Self {
        self.config_snapshot = Some(snapshot);
        self
    }

    // ==========================================
    // 季初推荐
    // ==========================================
    #[instrument(skip(self, req), fields(field_id = %req.field_id, season = %req.season))]
    pub async fn recommend(&self, req: &RecommendationRequest) -> ApiResult<RecommendationResponse> {
        RequestValidator::validate_recommendation(req)?;

        let as_of = req.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let loaded = self.load_input(&req.field_id, as_of).await?;
        let applied_prices: Vec<AppliedPrice> = loaded.prices.values().map(AppliedPrice::from).collect();

        let pipeline = self.pipeline.clone();
        let season = req.season.clone();
        let scenario = req.scenario.clone().unwrap_or_default();
        let outcome = tokio::task::spawn_blocking(move || {
            let input = RecommendationInput {
                field: &loaded.field,
                season: &season,
                crops: &loaded.crops,
                prices: &loaded.prices,
                history: &loaded.history,
                scenario: &scenario,
            };
            pipeline.recommend(&input)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("计算任务异常终止: {}", e)))??;

        let revision = if req.is_what_if() {
            None
        } else {
            let expected = self.plan_repo.latest_revision(&req.field_id, &req.season)?;
            Some(
                self.plan_repo
                    .save_new(&outcome.plan, expected, self.config_snapshot.as_deref())?,
            )
        };

        info!(
            plan_id = %outcome.plan.plan_id,
            status = %outcome.plan.status,
            selected = outcome.plan.selected().count(),
            revision = ?revision,
            "推荐完成"
        );

        Ok(RecommendationResponse {
            field_id: req.field_id.clone(),
            season: req.season.clone(),
            plan: PlanView::from_plan(&outcome.plan, revision),
            applied_prices,
            ranking: outcome.ranking,
        })
    }

    /// 批量推荐 (各田块并行，结果与请求顺序一致)
    pub async fn recommend_batch(
        &self,
        requests: &[RecommendationRequest],
    ) -> Vec<ApiResult<RecommendationResponse>> {
        join_all(requests.iter().map(|req| self.recommend(req))).await
    }

    // ==========================================
    // Plan-B 季中重算
    // ==========================================
    #[instrument(skip(self, req), fields(field_id = %req.field_id, season = %req.season))]
    pub async fn plan_b(&self, req: &PlanBRequest) -> ApiResult<PlanBResponse> {
        RequestValidator::validate_plan_b(req)?;

        let stored = self
            .plan_repo
            .find_latest(&req.field_id, &req.season)?
            .ok_or_else(|| {
                ApiError::not_found("allocation_plan", format!("{}/{}", req.field_id, req.season))
            })?;

        // 上报的已播种作物必须在作物目录中
        let crops = self.fields.list_crops().await?;
        let planted = req.planted_area_ha.clone().unwrap_or_default();
        if let Some(unknown) = planted
            .keys()
            .find(|id| !crops.iter().any(|c| &c.crop_id == *id))
        {
            return Err(ApiError::not_found("crop", unknown.clone()));
        }

        // 已落库的已播种面积 + 本次上报 (内存合并，重算成功后才写入)
        let mut locked = self
            .locked_repo
            .find_by_field_season(&req.field_id, &req.season)?;
        for (crop_id, area) in &planted {
            if *area > 0.0 {
                locked.insert(crop_id.clone(), *area);
            } else {
                locked.remove(crop_id);
            }
        }

        let pipeline = self.pipeline.clone();
        let prior = stored.plan;
        let quota = req.updated_quota_mm;
        let prices = req.updated_prices.clone();
        let plan = tokio::task::spawn_blocking(move || {
            pipeline.replan(&prior, &locked, quota, prices.as_ref(), &crops)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("计算任务异常终止: {}", e)))??;

        // 方案与已播种面积同一事务落库；期间若已有其他写入，按冲突返回
        let revision = self.plan_repo.save_with_planted_area(
            &plan,
            stored.revision,
            self.config_snapshot.as_deref(),
            &planted,
        )?;

        if plan.is_over_quota() {
            warn!(plan_id = %plan.plan_id, "已播种面积超出新配额");
        }
        info!(plan_id = %plan.plan_id, revision, "Plan-B 完成");

        Ok(PlanBResponse {
            field_id: req.field_id.clone(),
            season: req.season.clone(),
            message: plan.message.clone().unwrap_or_default(),
            adjusted_plan: PlanView::from_plan(&plan, Some(revision)),
        })
    }

    // ==========================================
    // 供给汇总
    // ==========================================
    #[instrument(skip(self))]
    pub async fn supply(&self, season: &str, scheme_id: Option<&str>) -> ApiResult<SupplyResponse> {
        RequestValidator::validate_season(season)?;
        let plans = self.plan_repo.list_latest_by_season(season)?;
        let items = self.pipeline.aggregate(&plans, season, scheme_id);
        Ok(SupplyResponse {
            season: season.to_string(),
            scheme_id: scheme_id.map(|s| s.to_string()),
            items,
        })
    }

    /// 记录已播种面积
    pub fn record_planted_area(
        &self,
        field_id: &str,
        season: &str,
        crop_id: &str,
        area_ha: f64,
    ) -> ApiResult<()> {
        self.locked_repo.upsert(field_id, season, crop_id, area_ha)?;
        Ok(())
    }

    // ==========================================
    // 输入装载
    // ==========================================
    async fn load_input(&self, field_id: &str, as_of: NaiveDate) -> ApiResult<LoadedInput> {
        let field = self
            .fields
            .get_field(field_id)
            .await?
            .ok_or_else(|| ApiError::not_found("field", field_id))?;
        let crops = self.fields.list_crops().await?;

        let quotes = join_all(
            crops
                .iter()
                .map(|c| self.prices.price_on_or_before(&c.crop_id, as_of)),
        )
        .await;
        let mut prices = BTreeMap::new();
        for (crop, quote) in crops.iter().zip(quotes) {
            if let Some(q) = quote? {
                prices.insert(crop.crop_id.clone(), q);
            }
        }

        let history = self.yields.yields_for_field(field_id).await?;

        Ok(LoadedInput {
            field,
            crops,
            prices,
            history,
        })
    }
}
