//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Research loop constants
pub mod research {
    /// Breadth of the initial concurrent quick pass
    pub const QUICK_PASS_BREADTH: u32 = 2;

    /// Depth of the initial concurrent quick pass
    pub const QUICK_PASS_DEPTH: u32 = 1;

    /// Component-level saturation exit threshold (coverage percent)
    pub const SATURATION_COMPONENT_THRESHOLD: u8 = 75;

    /// Mid-depth saturation exit threshold (coverage percent)
    pub const SATURATION_MID_DEPTH_THRESHOLD: u8 = 65;

    /// Fraction of planned iterations below which the saturation
    /// evaluator short-circuits to "not saturated"
    pub const MINIMAL_ITERATION_GATE: f64 = 0.10;

    /// Maximum words kept when simplifying a failed search query
    pub const FALLBACK_QUERY_MAX_WORDS: usize = 4;

    /// Maximum learnings extracted per summarizer call
    pub const MAX_LEARNINGS_PER_SUMMARY: usize = 5;

    /// Learnings window fed to the sub-query generator
    pub const SUBQUERY_LEARNINGS_WINDOW: usize = 7;

    /// Follow-up queries the quality evaluator may schedule
    pub const MAX_QUALITY_FOLLOW_UPS: usize = 2;

    /// Depth multiplier bounds applied by the rebalancer
    pub const MULTIPLIER_MIN: f64 = 0.5;
    pub const MULTIPLIER_MAX: f64 = 2.0;
}

/// Time-state machine and scheduling constants (milliseconds unless noted)
pub mod time {
    /// Remaining budget above which a component always continues
    pub const COMFORT_REMAINING_MS: u64 = 5 * 60 * 1000;

    /// Remaining time below which a component's sub-question loop breaks
    pub const COMPONENT_BREAK_MS: u64 = 20 * 1000;

    /// Per-question time below which breadth/depth collapse to 1/1
    pub const DEGRADE_MINIMAL_MS: u64 = 30 * 1000;

    /// Per-question time below which breadth halves and depth pins to 1
    pub const DEGRADE_HALF_MS: u64 = 60 * 1000;

    /// Remaining budget below which the quality evaluator is skipped
    pub const QUALITY_MIN_REMAINING_MS: u64 = 3 * 60 * 1000;

    /// Iteration-time estimate used before any iteration has completed
    pub const DEFAULT_ITERATION_ESTIMATE_MS: u64 = 60 * 1000;

    /// Window of recent iterations averaged for scheduling estimates
    pub const RECENT_ITERATION_WINDOW: usize = 3;

    /// Sub-question count cap used when estimating component time
    pub const ESTIMATE_SUBQUESTION_CAP: usize = 3;
}

/// Token and content trimming constants
pub mod tokens {
    /// Tokenizer context window budget for assembled search content
    pub const CONTEXT_WINDOW: usize = 120_000;

    /// Minimum chunk removed per trim step
    pub const MIN_TRIM_CHUNK: usize = 140;

    /// Per-page content cap in characters before token trimming
    pub const CONTENT_TRIM_CHARS: usize = 25_000;

    /// Bodies at or below this length count as empty search results
    pub const MIN_USEFUL_CONTENT_CHARS: usize = 100;

    /// Bodies below this length trigger the local analysis short-circuit
    pub const MIN_ANALYZABLE_CONTENT_CHARS: usize = 50;
}

/// HTTP/Network constants
pub mod network {
    /// Search request timeout (seconds)
    pub const SEARCH_TIMEOUT_SECS: u64 = 15;

    /// Maximum pages requested per search call
    pub const SEARCH_RESULT_LIMIT: usize = 5;

    /// LLM request timeout (seconds)
    pub const LLM_TIMEOUT_SECS: u64 = 120;

    /// Synthesis (streaming) request timeout (seconds)
    pub const SYNTHESIS_TIMEOUT_SECS: u64 = 300;
}

/// Report assembly constants
pub mod report {
    /// Character size of markdown chunks streamed to the progress sink
    pub const STREAM_CHUNK_CHARS: usize = 2048;

    /// Learnings included per component in the synthesis bundle
    pub const MAX_LEARNINGS_PER_SECTION: usize = 20;
}
