// ==========================================
// ACA-O 作物面积优化引擎 - 引擎编排器
// ==========================================
// 主流程: 特征构建 -> 适宜度评分 -> 面积分配
// Plan-B: 基线方案 -> 季中重算
// 红线: 纯计算，不访问存储，不持有可变共享状态
// ==========================================

use crate::config::EngineConfig;
use crate::domain::features::SuitabilityScore;
use crate::domain::field::{Crop, Field};
use crate::domain::market::{PriceQuote, YieldRecord};
use crate::domain::plan::AllocationPlan;
use crate::domain::scenario::Scenario;
use crate::domain::supply::SupplySummaryItem;
use crate::domain::types::PlanKind;
use crate::engine::allocation::{AllocationOptimizer, AllocationProblem};
use crate::engine::error::EngineResult;
use crate::engine::feature_builder::FeatureBuilder;
use crate::engine::replan::PlanBReOptimizer;
use crate::engine::solver::MipSolver;
use crate::engine::suitability::SuitabilityScorer;
use crate::engine::supply::SupplyAggregator;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

// ==========================================
// RecommendationInput - 单田块单季度输入快照
// ==========================================
#[derive(Debug, Clone)]
pub struct RecommendationInput<'a> {
    pub field: &'a Field,
    pub season: &'a str,
    pub crops: &'a [Crop],
    pub prices: &'a BTreeMap<String, PriceQuote>,
    pub history: &'a [YieldRecord],
    pub scenario: &'a Scenario,
}

// ==========================================
// RecommendationOutcome - 推荐结果
// ==========================================
#[derive(Debug, Clone)]
pub struct RecommendationOutcome {
    pub plan: AllocationPlan,
    /// 按评分降序
    pub ranking: Vec<SuitabilityScore>,
}

// ==========================================
// RecommendationPipeline
// ==========================================
pub struct RecommendationPipeline {
    config: EngineConfig,
    builder: FeatureBuilder,
    scorer: SuitabilityScorer,
    optimizer: Arc<AllocationOptimizer>,
    replanner: PlanBReOptimizer,
}

impl RecommendationPipeline {
    /// 创建编排器 (内置分支定界求解器)
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let optimizer = AllocationOptimizer::new(config.allocation.clone(), config.risk.clone());
        Self::assemble(config, optimizer)
    }

    /// 指定求解后端
    pub fn with_solver(config: EngineConfig, solver: Arc<dyn MipSolver>) -> EngineResult<Self> {
        let optimizer =
            AllocationOptimizer::with_solver(config.allocation.clone(), config.risk.clone(), solver);
        Self::assemble(config, optimizer)
    }

    fn assemble(config: EngineConfig, optimizer: AllocationOptimizer) -> EngineResult<Self> {
        config.validate()?;
        let optimizer = Arc::new(optimizer);
        Ok(Self {
            builder: FeatureBuilder::new(&config),
            scorer: SuitabilityScorer::new(),
            replanner: PlanBReOptimizer::new(optimizer.clone(), config.scoring.weights.clone()),
            optimizer,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 季初推荐
    #[instrument(skip_all, fields(field_id = %input.field.field_id, season = %input.season))]
    pub fn recommend(&self, input: &RecommendationInput<'_>) -> EngineResult<RecommendationOutcome> {
        // 1. 特征构建
        let features = self.builder.build(
            input.field,
            input.crops,
            input.prices,
            input.history,
            input.scenario,
        )?;

        // 2. 适宜度评分 (与候选顺序一致)
        let scores = self
            .scorer
            .score(&features.crop_features, &self.config.scoring.weights)?;
        let mut candidates = features.candidates;
        for (c, s) in candidates.iter_mut().zip(&scores) {
            c.suitability_score = s.score;
        }
        let profits: BTreeMap<String, f64> = candidates
            .iter()
            .map(|c| (c.crop_id.clone(), c.expected_profit_per_ha()))
            .collect();
        let ranking = SuitabilityScorer::rank_with_profit(&scores, &profits, None);
        debug!(top = ?ranking.first().map(|s| &s.crop_id), "评分完成");

        // 3. 面积分配
        let locked = BTreeMap::new();
        let problem = AllocationProblem {
            field: &features.field,
            season: input.season,
            candidates: &candidates,
            min_area_per_selected_crop_ha: self.config.allocation.min_area_per_selected_crop_ha,
            max_crops_selected: self.config.allocation.max_crops_selected,
            locked_area: &locked,
            water_budget_mm_ha: features.water_budget_mm_ha,
            kind: PlanKind::Recommendation,
            baseline_plan_id: None,
        };
        let mut plan = self.optimizer.solve(&problem)?;

        // 降级告警在前
        let mut warnings = features.warnings;
        warnings.append(&mut plan.warnings);
        plan.warnings = warnings;

        Ok(RecommendationOutcome { plan, ranking })
    }

    /// 季中重算
    ///
    /// `crops` 为作物目录，计划外已播种作物据此补全需水与单产
    pub fn replan(
        &self,
        prior: &AllocationPlan,
        locked_area: &BTreeMap<String, f64>,
        updated_quota_mm: Option<f64>,
        updated_prices: Option<&BTreeMap<String, f64>>,
        crops: &[Crop],
    ) -> EngineResult<AllocationPlan> {
        self.replanner
            .replan_with_crops(prior, locked_area, updated_quota_mm, updated_prices, crops)
    }

    /// 供给汇总
    pub fn aggregate(
        &self,
        plans: &[AllocationPlan],
        season: &str,
        scheme_id: Option<&str>,
    ) -> Vec<SupplySummaryItem> {
        SupplyAggregator::aggregate(plans, season, scheme_id)
    }
}
