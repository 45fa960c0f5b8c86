//! Query safety gate.
//!
//! Decides whether a raw SQL string may run against the database. The shipped
//! gate is a keyword blocklist, not a SQL parser: it does not see through
//! comments, string literals, statement separators or encoded keywords, and it
//! matches prohibited keywords as plain substrings, so identifiers such as
//! `UPDATED_AT` or `created` are rejected too.

/// Keywords whose presence anywhere in a query rejects it.
pub const PROHIBITED_KEYWORDS: [&str; 6] = ["DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "CREATE"];

pub const SELECT_ONLY_REASON: &str = "Only SELECT queries are allowed";

/// The allow/reject decision for one SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl SafetyVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Classifies SQL before it reaches the executor.
pub trait QueryGate: Send + Sync {
    fn classify(&self, sql: &str) -> SafetyVerdict;
}

/// Case-insensitive prefix check plus substring blocklist.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordBlocklist;

impl KeywordBlocklist {
    pub fn new() -> Self {
        Self
    }

    fn prohibited_reason() -> String {
        format!(
            "Query not allowed. Prohibited keywords: {}",
            PROHIBITED_KEYWORDS.join(", ")
        )
    }
}

impl QueryGate for KeywordBlocklist {
    fn classify(&self, sql: &str) -> SafetyVerdict {
        let normalized = sql.trim().to_uppercase();

        if !normalized.starts_with("SELECT") {
            return SafetyVerdict::reject(SELECT_ONLY_REASON);
        }

        if PROHIBITED_KEYWORDS
            .iter()
            .any(|keyword| normalized.contains(keyword))
        {
            // The reason lists the whole blocklist, not the keyword that hit.
            return SafetyVerdict::reject(Self::prohibited_reason());
        }

        SafetyVerdict::allow()
    }
}
