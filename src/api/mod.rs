// ==========================================
// ACA-O 作物面积优化引擎 - API 层
// ==========================================
// 职责: 请求/响应边界，装载输入、调用引擎、持久化方案、渲染错误
// ==========================================

pub mod dto;
pub mod error;
pub mod recommendation_api;
pub mod validator;

// 重导出核心类型
pub use dto::{
    AppliedPrice, CropOption, PlanBRequest, PlanBResponse, PlanView, RecommendationRequest,
    RecommendationResponse, SupplyResponse,
};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use recommendation_api::RecommendationApi;
pub use validator::RequestValidator;
