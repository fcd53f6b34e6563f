// ==========================================
// ACA-O 作物面积优化引擎 - 请求校验器
// ==========================================
// 职责: 边界层的格式/取值校验，携带字段路径返回
// 说明: 引擎内部仍会校验一次，这里只拦截明显的调用错误
// ==========================================

use crate::api::dto::{PlanBRequest, RecommendationRequest};
use crate::api::error::{ApiError, ApiResult};
use std::collections::BTreeMap;

pub struct RequestValidator;

impl RequestValidator {
    pub fn validate_recommendation(req: &RecommendationRequest) -> ApiResult<()> {
        Self::require_id("field_id", &req.field_id)?;
        Self::require_id("season", &req.season)?;
        if let Some(scenario) = &req.scenario {
            if let Some(q) = scenario.water_quota_mm {
                Self::non_negative("scenario.water_quota_mm", q)?;
            }
            if let Some(f) = scenario.price_factor {
                Self::non_negative("scenario.price_factor", f)?;
            }
        }
        Ok(())
    }

    pub fn validate_plan_b(req: &PlanBRequest) -> ApiResult<()> {
        Self::require_id("field_id", &req.field_id)?;
        Self::require_id("season", &req.season)?;
        if let Some(q) = req.updated_quota_mm {
            Self::non_negative("updated_quota_mm", q)?;
        }
        if let Some(prices) = &req.updated_prices {
            Self::non_negative_map("updated_prices", prices)?;
        }
        if let Some(planted) = &req.planted_area_ha {
            Self::non_negative_map("planted_area_ha", planted)?;
        }
        Ok(())
    }

    pub fn validate_season(season: &str) -> ApiResult<()> {
        Self::require_id("season", season)
    }

    fn require_id(field: &str, value: &str) -> ApiResult<()> {
        if value.trim().is_empty() {
            return Err(ApiError::validation(field, "不能为空"));
        }
        Ok(())
    }

    fn non_negative(field: &str, value: f64) -> ApiResult<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(ApiError::validation(
                field,
                format!("必须为非负有限数, 实际={}", value),
            ));
        }
        Ok(())
    }

    fn non_negative_map(field: &str, values: &BTreeMap<String, f64>) -> ApiResult<()> {
        for (crop_id, v) in values {
            if crop_id.trim().is_empty() {
                return Err(ApiError::validation(field, "作物ID不能为空"));
            }
            Self::non_negative(&format!("{}.{}", field, crop_id), *v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scenario::Scenario;

    #[test]
    fn test_recommendation_request_rejects_negative_scenario() {
        let mut req = RecommendationRequest::new("F1", "kharif-2026");
        assert!(RequestValidator::validate_recommendation(&req).is_ok());

        req.scenario = Some(Scenario {
            water_quota_mm: Some(-1.0),
            price_factor: None,
        });
        match RequestValidator::validate_recommendation(&req) {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, "scenario.water_quota_mm"),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_b_request_reports_crop_path() {
        let mut prices = BTreeMap::new();
        prices.insert("RICE".to_string(), 0.3);
        prices.insert("MAIZE".to_string(), f64::NAN);
        let req = PlanBRequest {
            field_id: "F1".to_string(),
            season: "kharif-2026".to_string(),
            updated_prices: Some(prices),
            ..Default::default()
        };
        match RequestValidator::validate_plan_b(&req) {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, "updated_prices.MAIZE"),
            other => panic!("Expected Validation, got {:?}", other),
        }

        let empty = PlanBRequest {
            field_id: " ".to_string(),
            season: "kharif-2026".to_string(),
            ..Default::default()
        };
        assert!(RequestValidator::validate_plan_b(&empty).is_err());
    }
}
