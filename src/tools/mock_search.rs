//! 内存搜索后端：按 (对象, 维度) 返回预置片段，可指定某些组合失败（测试与离线演示用）

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::tools::search::{SearchError, SearchProvider, Snippet};

#[derive(Debug, Default)]
pub struct MockSearchProvider {
    data: HashMap<(String, String), Vec<Snippet>>,
    failing: HashSet<(String, String)>,
    failing_subjects: HashSet<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, subject: &str, aspect: &str, snippets: Vec<Snippet>) -> Self {
        self.data
            .insert((subject.to_string(), aspect.to_string()), snippets);
        self
    }

    /// 该组合的每次调用都失败
    pub fn failing(mut self, subject: &str, aspect: &str) -> Self {
        self.failing
            .insert((subject.to_string(), aspect.to_string()));
        self
    }

    /// 该对象的所有维度都失败
    pub fn failing_subject(mut self, subject: &str) -> Self {
        self.failing_subjects.insert(subject.to_string());
        self
    }

    /// 每次调用前的人为延迟
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, subject: &str, aspect: &str) -> Result<Vec<Snippet>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let key = (subject.to_string(), aspect.to_string());
        if self.failing_subjects.contains(subject) || self.failing.contains(&key) {
            return Err(SearchError::Request(format!(
                "mock failure for {subject}/{aspect}"
            )));
        }
        Ok(self.data.get(&key).cloned().unwrap_or_default())
    }
}
