// ==========================================
// ACA-O 作物面积优化引擎 - 内存数据目录
// ==========================================
// 用途: 测试、命令行与 CSV 导入结果的承载
// ==========================================

use crate::domain::field::{Crop, Field};
use crate::domain::market::{PriceQuote, PriceRecord, YieldRecord};
use crate::provider::error::ProviderResult;
use crate::provider::traits::{FieldDataProvider, PriceProvider, YieldHistoryProvider};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub crops: Vec<Crop>,
    #[serde(default)]
    pub prices: Vec<PriceRecord>,
    #[serde(default)]
    pub yields: Vec<YieldRecord>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_crop(mut self, crop: Crop) -> Self {
        self.crops.push(crop);
        self
    }

    pub fn with_price(mut self, crop_id: &str, price_date: NaiveDate, price_per_kg: f64) -> Self {
        self.prices.push(PriceRecord {
            crop_id: crop_id.to_string(),
            price_date,
            price_per_kg,
        });
        self
    }

    pub fn with_yield(mut self, record: YieldRecord) -> Self {
        self.yields.push(record);
        self
    }

    /// 合并另一份目录 (同ID田块/作物以后者为准)
    pub fn merge(&mut self, other: InMemoryCatalog) {
        for f in other.fields {
            self.fields.retain(|x| x.field_id != f.field_id);
            self.fields.push(f);
        }
        for c in other.crops {
            self.crops.retain(|x| x.crop_id != c.crop_id);
            self.crops.push(c);
        }
        self.prices.extend(other.prices);
        self.yields.extend(other.yields);
    }

    /// 按作物分组、日期升序的价格序列
    fn price_series(&self, crop_id: &str) -> BTreeMap<NaiveDate, f64> {
        self.prices
            .iter()
            .filter(|p| p.crop_id == crop_id)
            .map(|p| (p.price_date, p.price_per_kg))
            .collect()
    }
}

#[async_trait]
impl FieldDataProvider for InMemoryCatalog {
    async fn get_field(&self, field_id: &str) -> ProviderResult<Option<Field>> {
        Ok(self.fields.iter().find(|f| f.field_id == field_id).cloned())
    }

    async fn list_crops(&self) -> ProviderResult<Vec<Crop>> {
        Ok(self.crops.clone())
    }
}

#[async_trait]
impl PriceProvider for InMemoryCatalog {
    async fn price_on_or_before(
        &self,
        crop_id: &str,
        date: NaiveDate,
    ) -> ProviderResult<Option<PriceQuote>> {
        let series = self.price_series(crop_id);
        Ok(series
            .range(..=date)
            .next_back()
            .map(|(applied, price)| PriceQuote {
                crop_id: crop_id.to_string(),
                price_per_kg: *price,
                requested_date: date,
                applied_date: *applied,
            }))
    }
}

#[async_trait]
impl YieldHistoryProvider for InMemoryCatalog {
    async fn yields_for_field(&self, field_id: &str) -> ProviderResult<Vec<YieldRecord>> {
        Ok(self
            .yields
            .iter()
            .filter(|y| y.field_id == field_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_price_falls_back_to_latest_prior_record() {
        let catalog = InMemoryCatalog::new()
            .with_price("RICE", d(5, 1), 0.30)
            .with_price("RICE", d(5, 20), 0.32)
            .with_price("RICE", d(6, 10), 0.35);

        let q = catalog.price_on_or_before("RICE", d(6, 1)).await.unwrap().unwrap();
        assert_eq!(q.price_per_kg, 0.32);
        assert_eq!(q.applied_date, d(5, 20));
        assert!(q.is_stale());

        let exact = catalog.price_on_or_before("RICE", d(6, 10)).await.unwrap().unwrap();
        assert!(!exact.is_stale());

        assert!(catalog.price_on_or_before("RICE", d(4, 1)).await.unwrap().is_none());
        assert!(catalog.price_on_or_before("MAIZE", d(6, 1)).await.unwrap().is_none());
    }
}
