// ==========================================
// 适宜度评分集成测试
// ==========================================
// 职责: 模糊 TOPSIS 评分的值域、确定性、准则方向与权重响应
// ==========================================

use aca_engine::domain::{CriteriaWeights, Criterion, CropFeatureVector, CropFeatures};
use aca_engine::engine::SuitabilityScorer;
use aca_engine::{EngineError, TriangularFuzzyNumber, WaterSensitivity};
use approx::assert_relative_eq;
use std::collections::BTreeMap;

fn crop(id: &str, v: CropFeatureVector) -> CropFeatures {
    CropFeatures {
        crop_id: id.to_string(),
        features: v,
    }
}

fn weights(pairs: &[(Criterion, f64)]) -> CriteriaWeights {
    let map: BTreeMap<Criterion, f64> = Criterion::ALL
        .into_iter()
        .map(|c| {
            let w = pairs.iter().find(|(k, _)| *k == c).map(|(_, w)| *w).unwrap_or(0.0);
            (c, w)
        })
        .collect();
    CriteriaWeights::from_map(map).unwrap()
}

fn mixed_set() -> Vec<CropFeatures> {
    vec![
        crop(
            "RICE",
            CropFeatureVector {
                soil_suitability: TriangularFuzzyNumber::new(0.75, 0.8, 0.85),
                water_coverage_ratio: TriangularFuzzyNumber::crisp(0.83),
                historical_yield_t_ha: TriangularFuzzyNumber::new(4.5, 4.9, 5.3),
                water_sensitivity: WaterSensitivity::High,
                growth_duration_days: TriangularFuzzyNumber::crisp(130.0),
            },
        ),
        crop(
            "MAIZE",
            CropFeatureVector::crisp(0.7, 1.0, 3.8, WaterSensitivity::Medium, 110),
        ),
        crop(
            "SORGHUM",
            CropFeatureVector {
                soil_suitability: TriangularFuzzyNumber::new(0.25, 0.5, 0.75),
                water_coverage_ratio: TriangularFuzzyNumber::crisp(1.0),
                historical_yield_t_ha: TriangularFuzzyNumber::crisp(2.5),
                water_sensitivity: WaterSensitivity::Low,
                growth_duration_days: TriangularFuzzyNumber::new(75.0, 100.0, 125.0),
            },
        ),
        crop(
            "PULSES",
            CropFeatureVector::crisp(0.0, 0.4, 0.0, WaterSensitivity::Low, 90),
        ),
    ]
}

#[test]
fn test_identical_crops_all_score_half() {
    let scorer = SuitabilityScorer::new();
    let v = CropFeatureVector::crisp(0.6, 0.9, 3.0, WaterSensitivity::Medium, 120);
    let features = vec![crop("A", v.clone()), crop("B", v.clone()), crop("C", v)];

    let scores = scorer.score(&features, &CriteriaWeights::default()).unwrap();
    assert_eq!(scores.len(), 3);
    for s in &scores {
        assert_relative_eq!(s.score, 0.5, epsilon = 1e-12);
    }
}

#[test]
fn test_scores_bounded_and_deterministic() {
    let scorer = SuitabilityScorer::new();
    let features = mixed_set();
    let w = CriteriaWeights::default();

    let first = scorer.score(&features, &w).unwrap();
    let second = scorer.score(&features, &w).unwrap();
    assert_eq!(first, second);

    // 输出顺序与输入一致
    let ids: Vec<&str> = first.iter().map(|s| s.crop_id.as_str()).collect();
    assert_eq!(ids, vec!["RICE", "MAIZE", "SORGHUM", "PULSES"]);
    for s in &first {
        assert!((0.0..=1.0).contains(&s.score), "{} out of range: {}", s.crop_id, s.score);
    }
}

#[test]
fn test_weights_steer_ranking() {
    let scorer = SuitabilityScorer::new();
    let features = vec![
        crop("SOIL_STRONG", CropFeatureVector::crisp(0.9, 0.3, 3.0, WaterSensitivity::Medium, 120)),
        crop("WATER_STRONG", CropFeatureVector::crisp(0.3, 0.9, 3.0, WaterSensitivity::Medium, 120)),
    ];

    let soil_only = scorer
        .score(&features, &weights(&[(Criterion::SoilSuitability, 1.0)]))
        .unwrap();
    assert!(soil_only[0].score > soil_only[1].score);

    let water_only = scorer
        .score(&features, &weights(&[(Criterion::WaterCoverageRatio, 1.0)]))
        .unwrap();
    assert!(water_only[1].score > water_only[0].score);
}

#[test]
fn test_cost_type_criteria_are_inverted() {
    let scorer = SuitabilityScorer::new();

    // 耐旱作物优于需水敏感作物
    let features = vec![
        crop("HIGH", CropFeatureVector::crisp(0.5, 0.5, 3.0, WaterSensitivity::High, 120)),
        crop("LOW", CropFeatureVector::crisp(0.5, 0.5, 3.0, WaterSensitivity::Low, 120)),
    ];
    let scores = scorer.score(&features, &CriteriaWeights::default()).unwrap();
    assert!(scores[1].score > scores[0].score);

    // 生育期短者优先
    let features = vec![
        crop("LONG", CropFeatureVector::crisp(0.5, 0.5, 3.0, WaterSensitivity::Medium, 150)),
        crop("SHORT", CropFeatureVector::crisp(0.5, 0.5, 3.0, WaterSensitivity::Medium, 90)),
    ];
    let scores = scorer.score(&features, &CriteriaWeights::default()).unwrap();
    assert!(scores[1].score > scores[0].score);
}

#[test]
fn test_rank_with_profit_breaks_ties() {
    let scorer = SuitabilityScorer::new();
    let v = CropFeatureVector::crisp(0.6, 0.9, 3.0, WaterSensitivity::Medium, 120);
    let features = vec![crop("A", v.clone()), crop("B", v.clone()), crop("C", v)];
    let scores = scorer.score(&features, &CriteriaWeights::default()).unwrap();

    let mut profit = BTreeMap::new();
    profit.insert("A".to_string(), 100.0);
    profit.insert("B".to_string(), 300.0);
    profit.insert("C".to_string(), 200.0);

    let ranked = SuitabilityScorer::rank_with_profit(&scores, &profit, Some(2));
    let ids: Vec<&str> = ranked.iter().map(|s| s.crop_id.as_str()).collect();
    assert_eq!(ids, vec!["B", "C"]);

    let by_id = SuitabilityScorer::rank(&scores, None);
    let ids: Vec<&str> = by_id.iter().map(|s| s.crop_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
}

#[test]
fn test_out_of_range_feature_rejected() {
    let scorer = SuitabilityScorer::new();
    let features = vec![crop(
        "BAD",
        CropFeatureVector::crisp(1.4, 0.5, 3.0, WaterSensitivity::Medium, 120),
    )];
    match scorer.score(&features, &CriteriaWeights::default()) {
        Err(EngineError::Validation { field, .. }) => {
            assert_eq!(field, "features.BAD.soil_suitability")
        }
        other => panic!("Expected Validation, got {:?}", other),
    }
}

#[test]
fn test_empty_input_scores_nothing() {
    let scorer = SuitabilityScorer::new();
    let scores = scorer.score(&[], &CriteriaWeights::default()).unwrap();
    assert!(scores.is_empty());
}
