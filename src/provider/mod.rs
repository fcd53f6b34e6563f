// ==========================================
// ACA-O 作物面积优化引擎 - 上游数据提供方
// ==========================================
// 职责: 定义田块/作物、价格、历史产量的读取接口（只读）
// 红线: 引擎不回写上游数据
// ==========================================

pub mod error;
pub mod in_memory;
pub mod traits;

pub use error::{ProviderError, ProviderResult};
pub use in_memory::InMemoryCatalog;
pub use traits::{FieldDataProvider, PriceProvider, YieldHistoryProvider};
