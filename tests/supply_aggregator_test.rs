// ==========================================
// 供给汇总集成测试
// ==========================================

mod helpers;

use aca_engine::config::{AllocationConfig, RiskConfig};
use aca_engine::engine::AllocationOptimizer;
use aca_engine::{AllocationPlan, Field, SupplyAggregator, SupplySummaryItem};
use approx::assert_relative_eq;
use helpers::test_data_builder::{candidate, rice_maize, FieldBuilder, SEASON};

fn plan_for(field: &Field, season: &str, max_crops: Option<usize>) -> AllocationPlan {
    AllocationOptimizer::new(AllocationConfig::default(), RiskConfig::default())
        .allocate(field, season, &rice_maize(), 0.5, max_crops)
        .unwrap()
}

fn fleet() -> Vec<AllocationPlan> {
    vec![
        plan_for(&FieldBuilder::new("F1").scheme("S1").build(), SEASON, None),
        plan_for(
            &FieldBuilder::new("F2").area(6.0).quota(450.0).scheme("S1").build(),
            SEASON,
            None,
        ),
        plan_for(
            &FieldBuilder::new("F3").area(8.0).quota(350.0).scheme("S2").build(),
            SEASON,
            Some(1),
        ),
    ]
}

fn item<'a>(items: &'a [SupplySummaryItem], crop_id: &str) -> &'a SupplySummaryItem {
    items.iter().find(|i| i.crop_id == crop_id).unwrap()
}

#[test]
fn test_totals_match_sum_of_field_allocations() {
    let plans = fleet();
    let items = SupplyAggregator::aggregate(&plans, SEASON, None);

    for crop_id in ["RICE", "MAIZE"] {
        let expected_area: f64 = plans.iter().map(|p| p.area_of(crop_id)).sum();
        let expected_fields = plans.iter().filter(|p| p.area_of(crop_id) > 0.0).count();
        let summary = item(&items, crop_id);
        assert_relative_eq!(summary.total_area_ha, expected_area, epsilon = 1e-9);
        // 候选单产均为 1 t/ha
        assert_relative_eq!(summary.total_expected_production_tonnes, expected_area, epsilon = 1e-9);
        assert_eq!(summary.field_count, expected_fields);
        assert_eq!(summary.season, SEASON);
    }

    // 面积降序
    for pair in items.windows(2) {
        assert!(pair[0].total_area_ha >= pair[1].total_area_ha);
    }
}

#[test]
fn test_split_and_merge_equals_whole() {
    let plans = fleet();
    let whole = SupplyAggregator::aggregate(&plans, SEASON, None);
    let left = SupplyAggregator::aggregate(&plans[..1], SEASON, None);
    let right = SupplyAggregator::aggregate(&plans[1..], SEASON, None);
    let merged = SupplyAggregator::merge(&left, &right);

    assert_eq!(whole.len(), merged.len());
    for (a, b) in whole.iter().zip(&merged) {
        assert_eq!(a.crop_id, b.crop_id);
        assert_relative_eq!(a.total_area_ha, b.total_area_ha, epsilon = 1e-9);
        assert_relative_eq!(
            a.total_expected_production_tonnes,
            b.total_expected_production_tonnes,
            epsilon = 1e-9
        );
        assert_eq!(a.field_count, b.field_count);
    }
}

#[test]
fn test_scheme_filter_uses_field_scheme() {
    let plans = fleet();
    let s2 = SupplyAggregator::aggregate(&plans, SEASON, Some("S2"));

    // F3 只种一种作物
    assert_eq!(s2.len(), 1);
    assert_eq!(s2[0].field_count, 1);
    assert_eq!(s2[0].scheme_id.as_deref(), Some("S2"));
    assert_relative_eq!(s2[0].total_area_ha, plans[2].total_area_ha(), epsilon = 1e-9);

    assert!(SupplyAggregator::aggregate(&plans, SEASON, Some("S9")).is_empty());
}

#[test]
fn test_other_seasons_and_unselected_crops_excluded() {
    let mut plans = fleet();
    plans.push(plan_for(&FieldBuilder::new("F4").build(), "rabi-2026", None));

    let items = SupplyAggregator::aggregate(&plans, SEASON, None);
    let fields: usize = items.iter().map(|i| i.field_count).max().unwrap();
    assert!(fields <= 3);

    // 只有未被选中的作物: 不出现在汇总中
    let field = FieldBuilder::new("F5").build();
    let mut losing = vec![candidate("OKRA", 0.9, 0.0, 100.0)];
    losing[0].estimated_cost_per_ha = 50.0;
    let idle = AllocationOptimizer::new(AllocationConfig::default(), RiskConfig::default())
        .allocate(&field, SEASON, &losing, 0.5, None)
        .unwrap();
    assert_eq!(idle.allocations.len(), 1);
    assert!(SupplyAggregator::aggregate(&[idle], SEASON, None).is_empty());

    assert!(SupplyAggregator::aggregate(&[], SEASON, None).is_empty());
}
