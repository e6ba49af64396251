//! Research Orchestrator
//!
//! The entry point that wires everything together: plan, score, quick pass,
//! rebalance, then the sequential full pass under the time-state machine,
//! and finally report assembly. The orchestrator exclusively owns the plan,
//! state, stats, and result maps; concurrent workers only ever receive
//! read-only views and return values.
//!
//! A wall-clock timer set to the budget feeds the cooperative cancel token
//! and is cleared on normal termination. Cancellation stops new LLM/search
//! calls, attempts a final aborted progress event, and closes the sink.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::ai::provider::SharedProvider;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::progress::{ProgressUpdate, SafeSink};
use crate::report::{SynthesisApi, assemble_report};
use crate::research::{
    Deadline, ResearchContext, ResearchState, ResearchStats, create_plan, improve_component,
    rebalance, research_component, run_config_with_recommendations, run_quick_pass,
    score_components, should_continue_component,
};
use crate::search::SharedSearch;
use crate::types::plan::FeedbackResponse;
use crate::types::{ApiTestResult, FathomError, ResearchOutput, Result, TimeStats};

// =============================================================================
// Options
// =============================================================================

/// Caller inputs for one research run.
#[derive(Debug, Clone)]
pub struct ResearchOptions {
    /// Free-text research query
    pub query: String,
    /// Sub-queries per depth iteration (1..=5)
    pub breadth: u32,
    /// Refinement rounds per sub-question (1..=3)
    pub depth: u32,
    /// Wall-clock budget in minutes
    pub max_duration_minutes: u64,
    /// Caller-supplied depth multipliers, overriding computed ones
    pub component_depth_multipliers: HashMap<String, f64>,
    /// Prior learnings seeding the accumulators
    pub learnings: Vec<String>,
    /// Prior visited URLs seeding the accumulators
    pub visited_urls: Vec<String>,
    /// Answered clarifying questions for the planner
    pub feedback_responses: Vec<FeedbackResponse>,
    /// Run the synthesis smoke test and return immediately
    pub test_anthropic_mode: bool,
}

impl ResearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            breadth: 3,
            depth: 2,
            max_duration_minutes: 30,
            component_depth_multipliers: HashMap::new(),
            learnings: Vec::new(),
            visited_urls: Vec::new(),
            feedback_responses: Vec::new(),
            test_anthropic_mode: false,
        }
    }

    /// Caller-input validation. Failures here are fatal.
    fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(FathomError::Config("query must not be empty".to_string()));
        }
        if !(1..=5).contains(&self.breadth) {
            return Err(FathomError::Config(format!(
                "breadth must be between 1 and 5, got {}",
                self.breadth
            )));
        }
        if !(1..=3).contains(&self.depth) {
            return Err(FathomError::Config(format!(
                "depth must be between 1 and 3, got {}",
                self.depth
            )));
        }
        if self.max_duration_minutes == 0 {
            return Err(FathomError::Config(
                "max_duration_minutes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives a full research run.
pub struct Orchestrator {
    llm: SharedProvider,
    search: SharedSearch,
    synthesis: Option<Arc<dyn SynthesisApi>>,
    sink: SafeSink,
    cancel: CancelToken,
    config: Config,
}

impl Orchestrator {
    pub fn new(
        llm: SharedProvider,
        search: SharedSearch,
        synthesis: Option<Arc<dyn SynthesisApi>>,
        sink: SafeSink,
        config: Config,
    ) -> Self {
        Self {
            llm,
            search,
            synthesis,
            sink,
            cancel: CancelToken::new(),
            config,
        }
    }

    /// Token observed at every suspension point; wire it to the client
    /// disconnect signal to abort cooperatively.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the full research pipeline.
    ///
    /// Cancellation (budget or disconnect) yields `Ok` with partial
    /// results; only invalid caller input or a missing capability is an
    /// `Err`.
    pub async fn run(&self, options: ResearchOptions) -> Result<ResearchOutput> {
        options.validate()?;

        let mut output = ResearchOutput::default();
        for learning in &options.learnings {
            output.push_learning(learning);
        }
        for url in &options.visited_urls {
            output.push_url(url);
        }

        if options.test_anthropic_mode {
            return Ok(self.run_api_test(output).await);
        }

        let budget = Duration::from_secs(options.max_duration_minutes * 60);
        let deadline = Deadline::new(budget);

        // Budget timer feeding the cancel token; cleared on normal exit
        let timer_cancel = self.cancel.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            timer_cancel.cancel();
        });

        let result = self.run_inner(&options, deadline, &mut output).await;
        timer.abort();

        match result {
            Ok(()) => {
                self.sink
                    .emit(ProgressUpdate::Result {
                        content: format!(
                            "Research complete: {} components, {} learnings, {} sources",
                            output.time_stats.completed_components.len(),
                            output.learnings.len(),
                            output.visited_urls.len()
                        ),
                    })
                    .await;
                self.sink.close().await;
                Ok(output)
            }
            Err(FathomError::Cancelled(operation)) => {
                warn!(operation = %operation, "research aborted");
                self.sink
                    .emit(ProgressUpdate::error(format!(
                        "Research aborted during {}",
                        operation
                    )))
                    .await;
                self.sink.close().await;
                Ok(output)
            }
            Err(e) => {
                self.sink
                    .emit(ProgressUpdate::error(format!("Research failed: {}", e)))
                    .await;
                self.sink.close().await;
                Err(e)
            }
        }
    }

    /// Synthesis smoke test: one call, no planning or searching.
    async fn run_api_test(&self, mut output: ResearchOutput) -> ResearchOutput {
        match &self.synthesis {
            Some(api) => {
                let test = api.smoke_test().await;
                if test.success {
                    output.report = Some(test.message.clone());
                }
                output.api_test_result = Some(test);
            }
            None => {
                output.api_test_result = Some(ApiTestResult {
                    success: false,
                    message: "synthesis API key not configured".to_string(),
                });
            }
        }
        output
    }

    async fn run_inner(
        &self,
        options: &ResearchOptions,
        deadline: Deadline,
        output: &mut ResearchOutput,
    ) -> Result<()> {
        let mut research_config = self.config.research.clone();
        research_config.breadth = options.breadth;
        research_config.depth = options.depth;
        research_config.max_duration_minutes = options.max_duration_minutes;

        let ctx = ResearchContext::new(
            self.llm.clone(),
            self.search.clone(),
            self.sink.clone(),
            self.cancel.clone(),
            &research_config,
            &self.config.search,
        );

        // ---------------------------------------------------------------------
        // Plan + importance
        // ---------------------------------------------------------------------
        self.sink
            .progress(format!("Planning research for: {}", options.query))
            .await;
        self.cancel.check("planning")?;

        let mut plan = create_plan(
            self.llm.as_ref(),
            &options.query,
            &options.feedback_responses,
        )
        .await;
        self.sink
            .emit(ProgressUpdate::PlanRevision {
                content: format!("Research plan created: {} components", plan.components.len()),
                plan: plan.clone(),
            })
            .await;

        self.cancel.check("importance scoring")?;
        let scores = score_components(self.llm.as_ref(), &plan).await;

        // ---------------------------------------------------------------------
        // Quick pass
        // ---------------------------------------------------------------------
        self.cancel.check("quick pass")?;
        let quick = run_quick_pass(&ctx, deadline, &plan, &output.learnings).await;

        let mut stats = ResearchStats::new();
        for iteration_ms in &quick.iteration_times {
            stats.record_iteration(*iteration_ms);
        }
        let mut quick_results = quick.results;
        for result in quick_results.values() {
            for learning in &result.learnings {
                output.push_learning(learning);
            }
            for url in &result.visited_urls {
                output.push_url(url);
            }
        }

        // ---------------------------------------------------------------------
        // Rebalance
        // ---------------------------------------------------------------------
        let multipliers = rebalance(&mut plan, &scores, &options.component_depth_multipliers);
        self.sink
            .emit(ProgressUpdate::PlanRevision {
                content: "Plan rebalanced by importance".to_string(),
                plan: plan.clone(),
            })
            .await;
        output.research_plan = Some(plan.clone());

        // ---------------------------------------------------------------------
        // Full pass
        // ---------------------------------------------------------------------
        let mut state = ResearchState::init(&plan, deadline);
        let mut skipped: Vec<String> = Vec::new();

        while let Some(name) = state.in_progress.clone() {
            self.cancel.check("component loop")?;
            state.tick();

            let Some(component) = plan.component(&name).cloned() else {
                state.skip(&name);
                continue;
            };

            self.sink
                .emit(ProgressUpdate::ComponentTiming {
                    content: format!("Starting component: {}", name),
                    component: name.clone(),
                    elapsed_ms: state.elapsed_ms,
                    remaining_ms: state.remaining_ms,
                })
                .await;

            let decision =
                should_continue_component(self.llm.as_ref(), &state, &stats, &component).await;
            self.sink
                .emit(ProgressUpdate::TimeDecision {
                    content: decision.reasoning.clone(),
                    component: name.clone(),
                    continued: decision.should_continue,
                })
                .await;

            if !decision.should_continue {
                info!(component = %name, "component skipped by scheduler");
                state.skip(&name);
                skipped.push(name);
                continue;
            }

            let run = run_config_with_recommendations(
                research_config.breadth,
                research_config.depth,
                multipliers.get(&name).copied().unwrap_or(1.0),
                decision.minimal,
                (decision.recommended_breadth, decision.recommended_depth),
            );
            let seed = quick_results.remove(&name);

            match research_component(
                &ctx,
                deadline,
                &component,
                &run,
                &plan.main_objective,
                seed,
                &mut stats,
            )
            .await
            {
                Ok(mut result) => {
                    improve_component(
                        &ctx,
                        deadline,
                        &component,
                        &plan.main_objective,
                        &mut result,
                        &mut stats,
                    )
                    .await;

                    for learning in &result.learnings {
                        output.push_learning(learning);
                    }
                    for url in &result.visited_urls {
                        output.push_url(url);
                    }
                    self.sink
                        .emit(ProgressUpdate::MidComponentResults {
                            content: format!("Component complete: {}", name),
                            component: name.clone(),
                            learnings: result.learnings.len(),
                            urls: result.visited_urls.len(),
                        })
                        .await;

                    state.complete(&name, result.time_spent_ms);
                    stats.record_component(result.time_spent_ms);
                    output.component_results.insert(name, result);
                }
                Err(FathomError::Cancelled(operation)) => {
                    return Err(FathomError::Cancelled(operation));
                }
                Err(e) => {
                    // Component failed; research continues with the next one
                    warn!(component = %name, error = %e, "component research failed");
                    self.sink
                        .emit(ProgressUpdate::error(format!(
                            "Component {} failed: {}",
                            name, e
                        )))
                        .await;
                    state.skip(&name);
                    skipped.push(name);
                }
            }
        }

        output.time_stats = TimeStats {
            total_time_ms: deadline.elapsed_ms(),
            component_times: state.component_times.clone(),
            completed_components: state.completed.clone(),
            skipped_components: skipped,
            average_iteration_time_ms: stats.average_iteration_time_ms(),
        };

        // ---------------------------------------------------------------------
        // Report (from completed components only)
        // ---------------------------------------------------------------------
        self.cancel.check("report assembly")?;
        let report = assemble_report(
            &ctx,
            self.synthesis.as_ref(),
            &plan,
            &output.component_results,
            &state.completed,
            &output.visited_urls,
        )
        .await;
        output.report = Some(report);

        Ok(())
    }
}

// =============================================================================
// Scenario Tests
// =============================================================================
