// ==========================================
// ACA-O 作物面积优化引擎 - 适宜度评分引擎
// ==========================================
// 算法: 模糊 TOPSIS (三角模糊数)
// 输入: 各作物特征向量 + 准则权重
// 输出: 每个作物 [0,1] 的适宜度评分
// 红线:
// - 全链路保持三角模糊数，只在贴近度计算完成后去模糊化
// - 所有作物在全部准则上完全相同时，评分一律为 0.5
// ==========================================

use crate::domain::features::{CriteriaWeights, Criterion, CropFeatureVector, CropFeatures, SuitabilityScore};
use crate::domain::fuzzy::TriangularFuzzyNumber;
use crate::domain::types::WaterSensitivity;
use crate::engine::error::{EngineError, EngineResult};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, instrument};

/// 退化情形 / 无定义分量的评分
const NEUTRAL_SCORE: f64 = 0.5;

// ==========================================
// SuitabilityScorer
// ==========================================
#[derive(Debug, Clone)]
pub struct SuitabilityScorer {
    eps: f64,
}

impl Default for SuitabilityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SuitabilityScorer {
    pub fn new() -> Self {
        Self { eps: 1e-12 }
    }

    /// 计算适宜度评分，输出顺序与输入一致
    ///
    /// # 参数
    /// - `features`: 作物特征向量 (作物ID不可重复)
    /// - `weights`: 准则权重 (内部归一化)
    #[instrument(skip(self, features, weights), fields(crops = features.len()))]
    pub fn score(
        &self,
        features: &[CropFeatures],
        weights: &CriteriaWeights,
    ) -> EngineResult<Vec<SuitabilityScore>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        for f in features {
            if !seen.insert(f.crop_id.as_str()) {
                return Err(EngineError::validation(
                    format!("features.{}", f.crop_id),
                    "作物ID重复",
                ));
            }
            f.features.validate(&f.crop_id)?;
        }

        // 1. 决策矩阵 (行=作物，列=准则，均为效益型)
        let matrix: Vec<Vec<TriangularFuzzyNumber>> = features
            .iter()
            .map(|f| Self::benefit_row(&f.features))
            .collect();

        // 2. 向量归一化 + 加权
        let normalized_weights = weights.normalized();
        let weighted = self.weighted_normalized(&matrix, &normalized_weights);

        // 3. 模糊正/负理想解
        let columns = Criterion::ALL.len();
        let mut positive = weighted[0].clone();
        let mut negative = weighted[0].clone();
        for row in weighted.iter().skip(1) {
            for j in 0..columns {
                positive[j] = positive[j].vertex_max(&row[j]);
                negative[j] = negative[j].vertex_min(&row[j]);
            }
        }

        let degenerate = positive
            .iter()
            .zip(&negative)
            .all(|(p, n)| p.approx_eq(n, self.eps));
        if degenerate {
            debug!("正负理想解重合，全部评分取 0.5");
            return Ok(features
                .iter()
                .map(|f| SuitabilityScore {
                    crop_id: f.crop_id.clone(),
                    score: NEUTRAL_SCORE,
                    closeness: TriangularFuzzyNumber::crisp(NEUTRAL_SCORE),
                })
                .collect());
        }

        // 4. 距离 + 贴近度
        let scores = features
            .iter()
            .zip(&weighted)
            .map(|(f, row)| {
                let d_pos = Self::distance(row, &positive);
                let d_neg = Self::distance(row, &negative);
                let closeness = d_neg.div(&(d_pos + d_neg), NEUTRAL_SCORE, self.eps);
                let score = closeness.centroid().clamp(0.0, 1.0);
                SuitabilityScore {
                    crop_id: f.crop_id.clone(),
                    score,
                    closeness,
                }
            })
            .collect();

        Ok(scores)
    }

    /// 按评分降序排序，平分按作物ID升序；可截取前 N 个
    pub fn rank(scores: &[SuitabilityScore], top_n: Option<usize>) -> Vec<SuitabilityScore> {
        let mut ranked = scores.to_vec();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.crop_id.cmp(&b.crop_id))
        });
        if let Some(n) = top_n {
            ranked.truncate(n);
        }
        ranked
    }

    /// 按评分降序排序，平分时按预期收益降序，再按作物ID升序
    pub fn rank_with_profit(
        scores: &[SuitabilityScore],
        expected_profit: &BTreeMap<String, f64>,
        top_n: Option<usize>,
    ) -> Vec<SuitabilityScore> {
        let profit = |id: &str| expected_profit.get(id).copied().unwrap_or(f64::NEG_INFINITY);
        let mut ranked = scores.to_vec();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| {
                    profit(&b.crop_id)
                        .partial_cmp(&profit(&a.crop_id))
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.crop_id.cmp(&b.crop_id))
        });
        if let Some(n) = top_n {
            ranked.truncate(n);
        }
        ranked
    }

    // ==========================================
    // 内部计算
    // ==========================================

    /// 需水敏感度的效益型模糊值 (越耐旱越好)
    pub fn inverse_water_sensitivity(sensitivity: WaterSensitivity) -> TriangularFuzzyNumber {
        match sensitivity {
            WaterSensitivity::Low => TriangularFuzzyNumber::new(0.7, 1.0, 1.0),
            WaterSensitivity::Medium => TriangularFuzzyNumber::new(0.3, 0.5, 0.7),
            WaterSensitivity::High => TriangularFuzzyNumber::new(0.0, 0.0, 0.3),
        }
    }

    /// 列顺序与 Criterion::ALL 一致
    fn benefit_row(v: &CropFeatureVector) -> Vec<TriangularFuzzyNumber> {
        Criterion::ALL
            .iter()
            .map(|c| match c {
                Criterion::SoilSuitability => v.soil_suitability,
                Criterion::WaterCoverageRatio => v.water_coverage_ratio,
                Criterion::HistoricalYield => v.historical_yield_t_ha,
                Criterion::WaterSensitivity => Self::inverse_water_sensitivity(v.water_sensitivity),
                Criterion::GrowthDuration => v.growth_duration_days.reciprocal(),
            })
            .collect()
    }

    /// r_ij = x_ij / sqrt(Σ u_ij²)，再乘以权重
    fn weighted_normalized(
        &self,
        matrix: &[Vec<TriangularFuzzyNumber>],
        weights: &BTreeMap<Criterion, f64>,
    ) -> Vec<Vec<TriangularFuzzyNumber>> {
        let norms: Vec<f64> = (0..Criterion::ALL.len())
            .map(|j| matrix.iter().map(|row| row[j].upper.powi(2)).sum::<f64>().sqrt())
            .collect();

        matrix
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, x)| {
                        let w = weights.get(&Criterion::ALL[j]).copied().unwrap_or(0.0);
                        // 全零列归一化后仍为零
                        if norms[j] <= self.eps {
                            TriangularFuzzyNumber::crisp(0.0)
                        } else {
                            x.scale(w / norms[j])
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// 逐顶点欧氏距离，结果为三角模糊数
    fn distance(row: &[TriangularFuzzyNumber], ideal: &[TriangularFuzzyNumber]) -> TriangularFuzzyNumber {
        let mut acc = [0.0_f64; 3];
        for (x, i) in row.iter().zip(ideal) {
            let sq = x.vertex_sq_diff(i);
            for k in 0..3 {
                acc[k] += sq[k];
            }
        }
        TriangularFuzzyNumber::new(acc[0].sqrt(), acc[1].sqrt(), acc[2].sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crop(id: &str, soil: f64, water: f64, yld: f64, sens: WaterSensitivity, days: u32) -> CropFeatures {
        CropFeatures {
            crop_id: id.to_string(),
            features: CropFeatureVector::crisp(soil, water, yld, sens, days),
        }
    }

    #[test]
    fn test_identical_crops_score_half() {
        let features = vec![
            crop("A", 0.7, 0.8, 4.0, WaterSensitivity::Medium, 120),
            crop("B", 0.7, 0.8, 4.0, WaterSensitivity::Medium, 120),
            crop("C", 0.7, 0.8, 4.0, WaterSensitivity::Medium, 120),
        ];
        let scores = SuitabilityScorer::new()
            .score(&features, &CriteriaWeights::default())
            .unwrap();
        assert!(scores.iter().all(|s| s.score == 0.5));
    }

    #[test]
    fn test_single_crop_is_degenerate() {
        let features = vec![crop("A", 0.9, 1.0, 6.0, WaterSensitivity::Low, 90)];
        let scores = SuitabilityScorer::new()
            .score(&features, &CriteriaWeights::default())
            .unwrap();
        assert_eq!(scores[0].score, 0.5);
    }

    #[test]
    fn test_dominant_crop_scores_one() {
        let features = vec![
            crop("BEST", 0.9, 1.0, 6.0, WaterSensitivity::Low, 90),
            crop("WORST", 0.2, 0.3, 2.0, WaterSensitivity::High, 150),
        ];
        let scores = SuitabilityScorer::new()
            .score(&features, &CriteriaWeights::default())
            .unwrap();
        assert!((scores[0].score - 1.0).abs() < 1e-9);
        assert!(scores[1].score.abs() < 1e-9);
    }

    #[test]
    fn test_scores_bounded_and_deterministic() {
        let features = vec![
            crop("A", 0.9, 0.6, 5.0, WaterSensitivity::High, 130),
            crop("B", 0.5, 1.0, 3.0, WaterSensitivity::Low, 100),
            crop("C", 0.7, 0.8, 4.0, WaterSensitivity::Medium, 110),
        ];
        let scorer = SuitabilityScorer::new();
        let a = scorer.score(&features, &CriteriaWeights::default()).unwrap();
        let b = scorer.score(&features, &CriteriaWeights::default()).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|s| (0.0..=1.0).contains(&s.score)));
    }

    #[test]
    fn test_weight_scale_invariance() {
        let features = vec![
            crop("A", 0.9, 0.6, 5.0, WaterSensitivity::High, 130),
            crop("B", 0.5, 1.0, 3.0, WaterSensitivity::Low, 100),
        ];
        let doubled: BTreeMap<String, f64> = BTreeMap::<String, f64>::from(CriteriaWeights::default())
            .into_iter()
            .map(|(k, v)| (k, v * 2.0))
            .collect();
        let doubled = CriteriaWeights::from_named(&doubled).unwrap();
        let scorer = SuitabilityScorer::new();
        let a = scorer.score(&features, &CriteriaWeights::default()).unwrap();
        let b = scorer.score(&features, &doubled).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x.score - y.score).abs() < 1e-12);
        }
    }

    #[test]
    fn test_duplicate_crop_rejected() {
        let features = vec![
            crop("A", 0.9, 0.6, 5.0, WaterSensitivity::High, 130),
            crop("A", 0.5, 1.0, 3.0, WaterSensitivity::Low, 100),
        ];
        let result = SuitabilityScorer::new().score(&features, &CriteriaWeights::default());
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_rank_ties_by_crop_id() {
        let s = |id: &str, score: f64| SuitabilityScore {
            crop_id: id.to_string(),
            score,
            closeness: TriangularFuzzyNumber::crisp(score),
        };
        let scores = vec![s("C", 0.5), s("A", 0.5), s("B", 0.9)];
        let ranked = SuitabilityScorer::rank(&scores, None);
        let ids: Vec<_> = ranked.iter().map(|s| s.crop_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
        assert_eq!(SuitabilityScorer::rank(&scores, Some(1)).len(), 1);

        let profit: BTreeMap<String, f64> =
            [("A".to_string(), 10.0), ("C".to_string(), 50.0)].into_iter().collect();
        let ranked = SuitabilityScorer::rank_with_profit(&scores, &profit, None);
        let ids: Vec<_> = ranked.iter().map(|s| s.crop_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C", "A"]);
    }
}
