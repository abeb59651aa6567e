//! 编排器：根据状态与最近决策历史选择下一步
//!
//! 每次 decide 只做三件事：迭代计数 +1、选出 Task、把 Task 写入 current_task 与收敛历史（截断到窗口大小）。
//! 收敛判定沿用「最近 N 次决策相同即收敛」，连续两次 research 也会被当作收敛。

use crate::config::AppConfig;
use crate::core::{RunState, Task};

/// 编排器参数
#[derive(Debug, Clone)]
pub struct Orchestrator {
    /// 期望调研的 CRM 数量
    target_count: usize,
    max_iterations: u32,
    convergence_window: usize,
    validation_threshold: f64,
}

impl Orchestrator {
    pub fn new(
        target_count: usize,
        max_iterations: u32,
        convergence_window: usize,
        validation_threshold: f64,
    ) -> Self {
        Self {
            target_count,
            max_iterations,
            convergence_window: convergence_window.max(1),
            validation_threshold,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.run.crms.len(),
            cfg.run.max_iterations,
            cfg.run.convergence_window,
            cfg.run.validation_threshold,
        )
    }

    /// 最近 window 次决策完全相同
    pub fn is_converged(&self, state: &RunState) -> bool {
        let history = &state.convergence_history;
        if history.len() < self.convergence_window {
            return false;
        }
        let mut tail = history.iter().skip(history.len() - self.convergence_window);
        match tail.next() {
            Some(first) => tail.all(|t| t == first),
            None => false,
        }
    }

    fn choose(&self, state: &RunState) -> Task {
        if self.is_converged(state) {
            tracing::info!(iteration = state.iteration_count, "system converged, completing");
            return Task::Complete;
        }
        if state.iteration_count >= self.max_iterations {
            tracing::warn!(max = self.max_iterations, "max iterations reached");
            return Task::Complete;
        }
        if state.records.len() < self.target_count {
            return Task::Research;
        }
        if state.final_comparison.is_none() {
            return Task::Analyze;
        }
        match state.validation_results.last() {
            Some(report) if report.mean_score() < self.validation_threshold => {
                tracing::info!(
                    mean = report.mean_score(),
                    threshold = self.validation_threshold,
                    "validation below threshold, re-researching"
                );
                Task::Research
            }
            Some(_) => Task::Complete,
            None => Task::Validate,
        }
    }

    /// 做出一次决策并记录到状态中
    pub fn decide(&self, state: &mut RunState) -> Task {
        state.iteration_count += 1;
        tracing::info!(
            iteration = state.iteration_count,
            run_id = %state.run_id,
            "orchestrator deciding"
        );

        let task = self.choose(state);
        state.current_task = Some(task);
        state.convergence_history.push_back(task);
        while state.convergence_history.len() > self.convergence_window {
            state.convergence_history.pop_front();
        }
        tracing::debug!(task = %task, history = ?state.convergence_history, "orchestrator decided");
        task
    }
}
