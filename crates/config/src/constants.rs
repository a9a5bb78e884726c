//! Centralized defaults
//!
//! Single source of truth for endpoints, timeouts and tunables referenced by
//! both the settings defaults and the crates that fall back to them.

/// Upstream endpoints
pub mod endpoints {
    /// Local Ollama server
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";

    /// Groq OpenAI-compatible API
    pub const GROQ_DEFAULT: &str = "https://api.groq.com/openai/v1";

    /// OpenAI API
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// DuckDuckGo Instant Answer API
    pub const DUCKDUCKGO_DEFAULT: &str = "https://api.duckduckgo.com/";

    /// Wikipedia MediaWiki API
    pub const WIKIPEDIA_DEFAULT: &str = "https://en.wikipedia.org";

    /// Stack Exchange API
    pub const STACKEXCHANGE_DEFAULT: &str = "https://api.stackexchange.com/2.3";

    /// wttr.in weather service
    pub const WTTR_DEFAULT: &str = "https://wttr.in";
}

/// Timeout defaults (milliseconds)
pub mod timeouts {
    /// Retriever call
    pub const RETRIEVAL_MS: u64 = 5_000;

    /// One generator attempt
    pub const LLM_REQUEST_MS: u64 = 30_000;

    /// One web provider search
    pub const WEB_PROVIDER_MS: u64 = 10_000;

    /// Whole `/api/ask` request; must cover the worst-case escalation path
    pub const HTTP_REQUEST_SECS: u64 = 300;
}

/// Confidence assessment defaults
pub mod assessment {
    pub const RELEVANCE_THRESHOLD: f32 = 0.55;
    pub const MIN_CONFIDENCE: f32 = 0.45;
    /// Weight of the top score in the floor combination; the mean gets the rest
    pub const TOP_WEIGHT: f32 = 0.5;
    pub const CORROBORATION_DELTA: f32 = 0.1;
    pub const HIGH_CONFIDENCE_CEILING: f32 = 0.85;
}

/// Retrieval defaults
pub mod retrieval {
    pub const DEFAULT_TOP_K: usize = 5;
    pub const MAX_TOP_K: usize = 50;
    pub const DEFAULT_KNOWLEDGE_PATH: &str = "knowledge";
}

/// Generation defaults
pub mod generation {
    pub const TEMPERATURE: f32 = 0.1;
    pub const MAX_TOKENS: u32 = 2048;
    pub const MAX_RETRIES: u32 = 2;
    /// First retry delay; doubles on every further retry
    pub const INITIAL_BACKOFF_MS: u64 = 250;

    pub const OLLAMA_MODEL: &str = "llama3.1:8b";
    pub const GROQ_MODEL: &str = "llama-3.1-8b-instant";
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";
}

/// Web search defaults
pub mod web {
    pub const MAX_RESULTS: usize = 5;
    pub const USER_AGENT: &str = concat!("docqa/", env!("CARGO_PKG_VERSION"));
    /// Web context excerpt cut-off, in characters
    pub const MAX_EXCERPT_CHARS: usize = 500;
}

/// User-visible text
pub mod messages {
    pub const FALLBACK_NOTICE: &str =
        "The information was not found in the knowledge base. Searching the web for an answer...";

    pub const NO_ANSWER: &str =
        "I could not find an answer to your question in the knowledge base or on the web.";

    /// Phrases a generator uses when the supplied context did not contain the answer
    pub const INSUFFICIENT_MARKERS: &[&str] = &[
        r"don'?t have.*information",
        r"does not contain.*information",
        r"not mentioned in.*context",
        r"context does not.*enough",
        r"unable to provide",
        r"cannot answer",
        r"no information about",
        r"not included in.*context",
        r"unfortunately.*context",
    ];
}
