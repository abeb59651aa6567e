//! 主控循环：orchestrator → {research | analyze | validate} → orchestrator，直到 complete
//!
//! 每个阶段按值接收 RunState 并返回新的 RunState；循环本身串行，同一时刻只有一个阶段在运行。

use crate::agents::{AnalysisAgent, ResearchAgent, ValidatorAgent};
use crate::core::{Orchestrator, RunState, Task};

pub struct Workflow {
    orchestrator: Orchestrator,
    research: ResearchAgent,
    analysis: AnalysisAgent,
    validator: ValidatorAgent,
}

impl Workflow {
    pub fn new(
        orchestrator: Orchestrator,
        research: ResearchAgent,
        analysis: AnalysisAgent,
        validator: ValidatorAgent,
    ) -> Self {
        Self {
            orchestrator,
            research,
            analysis,
            validator,
        }
    }

    /// 执行一个阶段
    pub async fn step(&self, task: Task, state: RunState) -> RunState {
        match task {
            Task::Research => self.research.run(state).await,
            Task::Analyze => self.analysis.run(state).await,
            Task::Validate => self.validator.run(state).await,
            Task::Complete => state,
        }
    }

    /// 运行到收敛或迭代上限
    pub async fn run(&self, mut state: RunState) -> RunState {
        tracing::info!(run_id = %state.run_id, "workflow started");
        loop {
            let task = self.orchestrator.decide(&mut state);
            if task == Task::Complete {
                break;
            }
            tracing::info!(task = %task, iteration = state.iteration_count, "dispatching");
            state = self.step(task, state).await;
        }
        tracing::info!(
            run_id = %state.run_id,
            iterations = state.iteration_count,
            records = state.records.len(),
            errors = state.error_log.len(),
            "workflow complete"
        );
        state
    }
}
