//! Time-State Machine
//!
//! Tracks where the run stands against its wall-clock budget: which
//! components are done, in progress, or still queued, and how long
//! iterations have been taking. Updated by the orchestrator before every
//! scheduling decision; never shared with concurrent workers.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::constants::time;
use crate::types::ResearchPlan;

// =============================================================================
// Deadline
// =============================================================================

/// Wall-clock budget anchored at run start. Cheap to copy; both the state
/// machine and the deep-research loop read remaining time through it.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    /// Milliseconds since the run started
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Milliseconds left: `max(0, budget - elapsed)`
    pub fn remaining_ms(&self) -> u64 {
        let budget_ms = self.budget.as_millis() as u64;
        budget_ms.saturating_sub(self.elapsed_ms())
    }

    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.remaining_ms())
    }

    /// Whether fewer than `margin_ms` remain
    pub fn is_nearly_exhausted(&self, margin_ms: u64) -> bool {
        self.remaining_ms() < margin_ms
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

// =============================================================================
// Research State
// =============================================================================

/// Scheduling state for the full pass.
///
/// `completed ∪ remaining ∪ {in_progress}` always partitions the plan's
/// sequencing (a skipped component leaves the partition entirely and is
/// recorded by the orchestrator).
#[derive(Debug, Clone)]
pub struct ResearchState {
    deadline: Deadline,
    /// Elapsed milliseconds at the last tick
    pub elapsed_ms: u64,
    /// Remaining milliseconds at the last tick
    pub remaining_ms: u64,
    /// Components researched to completion, in completion order
    pub completed: Vec<String>,
    /// Component currently being researched
    pub in_progress: Option<String>,
    /// Components still queued (head = in_progress)
    pub remaining: Vec<String>,
    /// Per-component research time, milliseconds
    pub component_times: HashMap<String, u64>,
}

impl ResearchState {
    /// Start tracking a plan against a budget. `in_progress` points at the
    /// head of the sequencing.
    pub fn init(plan: &ResearchPlan, deadline: Deadline) -> Self {
        let remaining = plan.sequencing.clone();
        Self {
            deadline,
            elapsed_ms: deadline.elapsed_ms(),
            remaining_ms: deadline.remaining_ms(),
            completed: Vec::new(),
            in_progress: remaining.first().cloned(),
            remaining,
            component_times: HashMap::new(),
        }
    }

    /// Refresh the time snapshot. Idempotent up to monotonic time fields.
    pub fn tick(&mut self) {
        self.elapsed_ms = self.deadline.elapsed_ms();
        self.remaining_ms = self.deadline.remaining_ms();
    }

    /// Mark `name` complete: record its time, drop it from the queue, and
    /// advance `in_progress` to the new queue head.
    pub fn complete(&mut self, name: &str, spent_ms: u64) {
        self.remaining.retain(|n| n != name);
        if !self.completed.iter().any(|n| n == name) {
            self.completed.push(name.to_string());
        }
        self.component_times.insert(name.to_string(), spent_ms);
        self.in_progress = self.remaining.first().cloned();
        self.tick();
    }

    /// Drop `name` from the queue without completing it (scheduler skip).
    pub fn skip(&mut self, name: &str) {
        self.remaining.retain(|n| n != name);
        self.in_progress = self.remaining.first().cloned();
        self.tick();
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Number of components still queued
    pub fn remaining_count(&self) -> usize {
        self.remaining.len()
    }
}

// =============================================================================
// Research Stats
// =============================================================================

/// Rolling iteration/component timing averages for the run.
#[derive(Debug, Clone, Default)]
pub struct ResearchStats {
    /// Every deep-research iteration time, in completion order
    pub iteration_times: Vec<u64>,
    /// Sum of `iteration_times`
    pub total_iterations_time: u64,
    /// Count of completed iterations
    pub completed_iterations: u32,
    /// Completed component times
    component_times: Vec<u64>,
}

impl ResearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_iteration(&mut self, elapsed_ms: u64) {
        self.iteration_times.push(elapsed_ms);
        self.total_iterations_time += elapsed_ms;
        self.completed_iterations += 1;
    }

    pub fn record_component(&mut self, elapsed_ms: u64) {
        self.component_times.push(elapsed_ms);
    }

    /// Mean iteration time, 0 before the first iteration completes
    pub fn average_iteration_time_ms(&self) -> u64 {
        if self.completed_iterations == 0 {
            0
        } else {
            self.total_iterations_time / self.completed_iterations as u64
        }
    }

    /// Mean completed-component time, 0 before the first completes
    pub fn average_component_time_ms(&self) -> u64 {
        if self.component_times.is_empty() {
            0
        } else {
            self.component_times.iter().sum::<u64>() / self.component_times.len() as u64
        }
    }

    /// Scheduling estimate: mean of the last few iterations, falling back
    /// to the overall average, falling back to a fixed default.
    pub fn recent_iteration_time_ms(&self) -> u64 {
        let window = time::RECENT_ITERATION_WINDOW;
        if self.iteration_times.len() >= window {
            let recent = &self.iteration_times[self.iteration_times.len() - window..];
            return recent.iter().sum::<u64>() / window as u64;
        }
        let average = self.average_iteration_time_ms();
        if average > 0 {
            average
        } else {
            time::DEFAULT_ITERATION_ESTIMATE_MS
        }
    }
}
