//! 外部协作方：搜索后端（Tavily / Mock）与完整度校验工具

pub mod completeness;
pub mod mock_search;
pub mod search;
pub mod tavily;

pub use completeness::{CompletenessTool, ValidationTool};
pub use mock_search::MockSearchProvider;
pub use search::{build_query, clean_content, SearchError, SearchProvider, Snippet};
pub use tavily::TavilySearchProvider;
