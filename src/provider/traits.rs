// ==========================================
// ACA-O 作物面积优化引擎 - 数据提供方 Trait
// ==========================================
// 实现者: InMemoryCatalog（测试 / 命令行 / CSV 导入）
// ==========================================

use crate::domain::field::{Crop, Field};
use crate::domain::market::{PriceQuote, YieldRecord};
use crate::provider::error::ProviderResult;
use async_trait::async_trait;
use chrono::NaiveDate;

// ==========================================
// FieldDataProvider - 田块与农艺数据
// ==========================================
#[async_trait]
pub trait FieldDataProvider: Send + Sync {
    /// 按ID读取田块，不存在返回 None
    async fn get_field(&self, field_id: &str) -> ProviderResult<Option<Field>>;

    /// 作物目录
    async fn list_crops(&self) -> ProviderResult<Vec<Crop>>;
}

// ==========================================
// PriceProvider - 价格
// ==========================================
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// 请求日期当天或之前最近一条价格
    ///
    /// # 返回
    /// - Some(quote): applied_date 标明实际使用的日期
    /// - None: 该日期之前无任何记录
    async fn price_on_or_before(
        &self,
        crop_id: &str,
        date: NaiveDate,
    ) -> ProviderResult<Option<PriceQuote>>;
}

// ==========================================
// YieldHistoryProvider - 历史产量
// ==========================================
#[async_trait]
pub trait YieldHistoryProvider: Send + Sync {
    /// 田块的全部历史产量记录
    async fn yields_for_field(&self, field_id: &str) -> ProviderResult<Vec<YieldRecord>>;
}
