// ==========================================
// ACA-O 作物面积优化引擎 - 供给汇总
// ==========================================
// 职责: 把多个田块方案归约为作物级面积 / 产量合计
// 规则:
// - 只统计指定季度、面积 > 0 的分配
// - 指定灌区时按方案快照中的田块所属灌区过滤
// - 结果按总面积降序、作物ID升序
// 红线: 纯函数，无副作用，可并发调用
// ==========================================

use crate::domain::plan::AllocationPlan;
use crate::domain::supply::SupplySummaryItem;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

#[derive(Default)]
struct Acc {
    area: f64,
    production: f64,
    fields: BTreeSet<String>,
}

pub struct SupplyAggregator;

impl SupplyAggregator {
    #[instrument(skip(plans), fields(plans = plans.len()))]
    pub fn aggregate(
        plans: &[AllocationPlan],
        season: &str,
        scheme_id: Option<&str>,
    ) -> Vec<SupplySummaryItem> {
        let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();

        for plan in plans {
            if plan.season != season {
                continue;
            }
            if scheme_id.is_some() && plan.scheme_id() != scheme_id {
                continue;
            }
            for a in plan.selected() {
                let acc = groups.entry(a.crop_id.as_str()).or_default();
                acc.area += a.area_ha;
                acc.production += a.expected_production_t();
                acc.fields.insert(plan.field_id.clone());
            }
        }

        let items: Vec<SupplySummaryItem> = groups
            .into_iter()
            .map(|(crop_id, acc)| SupplySummaryItem {
                crop_id: crop_id.to_string(),
                season: season.to_string(),
                scheme_id: scheme_id.map(|s| s.to_string()),
                total_area_ha: acc.area,
                total_expected_production_tonnes: acc.production,
                field_count: acc.fields.len(),
            })
            .collect();

        debug!(items = items.len(), "供给汇总完成");
        Self::sorted(items)
    }

    /// 合并两份 (田块不相交的) 汇总结果
    pub fn merge(left: &[SupplySummaryItem], right: &[SupplySummaryItem]) -> Vec<SupplySummaryItem> {
        let mut merged: BTreeMap<String, SupplySummaryItem> = BTreeMap::new();
        for item in left.iter().chain(right) {
            match merged.get_mut(&item.crop_id) {
                Some(existing) => {
                    existing.total_area_ha += item.total_area_ha;
                    existing.total_expected_production_tonnes += item.total_expected_production_tonnes;
                    existing.field_count += item.field_count;
                }
                None => {
                    merged.insert(item.crop_id.clone(), item.clone());
                }
            }
        }
        Self::sorted(merged.into_values().collect())
    }

    fn sorted(mut items: Vec<SupplySummaryItem>) -> Vec<SupplySummaryItem> {
        items.sort_by(|a, b| {
            b.total_area_ha
                .total_cmp(&a.total_area_ha)
                .then_with(|| a.crop_id.cmp(&b.crop_id))
        });
        items
    }
}
