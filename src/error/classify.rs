//! Failure classification.
//!
//! Maps any [`SkaldError`] to a fixed category plus a human-readable
//! message. Type-level checks run first; a pluggable layer of text
//! heuristics handles failures that only announce themselves in their
//! message ("token limit exceeded", "stream corrupted", ...).

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::SkaldError;

/// Broad failure category. Every classification lands on exactly one of these.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    FileNotFound,
    FileExists,
    Permission,
    Connection,
    Timeout,
    Memory,
    ResourceExhaustion,
    System,
    Authentication,
    Authorization,
    RateLimit,
    Server,
    Client,
    TokenLimit,
    Token,
    StreamInterrupted,
    StreamCorruption,
    Streaming,
    Validation,
    Dependency,
    Cancelled,
    Data,
    Ssl,
    Unknown,
}

impl ErrorCategory {
    /// Whether failures in this category are worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Connection
                | Self::Timeout
                | Self::RateLimit
                | Self::Server
                | Self::StreamCorruption
                | Self::Streaming
                | Self::ResourceExhaustion
                | Self::System
        )
    }

    /// Fixed user-facing message for this category.
    pub fn template(self) -> &'static str {
        match self {
            Self::FileNotFound => "Requested file was not found.",
            Self::FileExists => "File already exists.",
            Self::Permission => "Permission denied. Please check your access rights.",
            Self::Connection => {
                "Network connection failed. Please check your internet connection and try again."
            }
            Self::Timeout => {
                "Request timed out. The service may be experiencing high load. Please try again."
            }
            Self::Memory => {
                "Insufficient memory available. Try reducing the request size or closing other applications."
            }
            Self::ResourceExhaustion => "System resource limit reached. Please try again in a moment.",
            Self::System => "System error occurred. Please try again.",
            Self::Authentication => "Authentication failed. Please check your API credentials.",
            Self::Authorization => "Access forbidden. You don't have permission for this operation.",
            Self::RateLimit => "Rate limit exceeded. Please wait before making another request.",
            Self::Server => "Server error occurred. Please try again later.",
            Self::Client => "Request error. Please check your request.",
            Self::TokenLimit => "Token limit exceeded. Please try with a shorter message.",
            Self::Token => "Token-related error occurred.",
            Self::StreamInterrupted => "Stream was interrupted. You can try sending the message again.",
            Self::StreamCorruption => "Stream data was corrupted. Retrying automatically.",
            Self::Streaming => "Streaming error occurred. Falling back to standard response.",
            Self::Validation => "Invalid input provided. Please check your request and try again.",
            Self::Dependency => "Required dependency is missing. Please check your installation.",
            Self::Cancelled => "Operation was cancelled.",
            Self::Data => "Data parsing error occurred. The response format may be unexpected.",
            Self::Ssl => "SSL/TLS error occurred. Please check your connection security settings.",
            Self::Unknown => "An unexpected error occurred.",
        }
    }
}

/// Outcome of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub category: ErrorCategory,
    pub message: String,
}

impl Classified {
    fn of(category: ErrorCategory) -> Self {
        Self {
            category,
            message: category.template().to_string(),
        }
    }
}

/// Text predicate used by the heuristic layer.
#[derive(Debug, Clone)]
pub enum TextMatcher {
    /// All substrings must be present.
    AllOf(Vec<String>),
    /// At least one substring must be present.
    AnyOf(Vec<String>),
    /// Regular expression match.
    Pattern(Regex),
}

impl TextMatcher {
    pub fn all_of(needles: &[&str]) -> Self {
        Self::AllOf(needles.iter().map(|s| s.to_string()).collect())
    }

    pub fn any_of(needles: &[&str]) -> Self {
        Self::AnyOf(needles.iter().map(|s| s.to_string()).collect())
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            Self::AllOf(needles) => needles.iter().all(|n| text.contains(n.as_str())),
            Self::AnyOf(needles) => needles.iter().any(|n| text.contains(n.as_str())),
            Self::Pattern(re) => re.is_match(text),
        }
    }
}

/// One message-sniffing rule: if `matcher` hits, the failure belongs to `category`.
#[derive(Debug, Clone)]
pub struct HeuristicRule {
    pub matcher: TextMatcher,
    pub category: ErrorCategory,
}

impl HeuristicRule {
    pub fn new(matcher: TextMatcher, category: ErrorCategory) -> Self {
        Self { matcher, category }
    }
}

/// Total classifier over [`SkaldError`].
///
/// Precedence: filesystem kinds, connection, timeout, memory/resource,
/// HTTP status, heuristic rules (in rule order), validation, dependency,
/// cancellation, data, unknown. Earlier rules win; the overlaps are
/// intentional (filesystem kinds are subtypes of generic IO errors).
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<HeuristicRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with extra rules evaluated ahead of the defaults.
    pub fn with_rules(extra: Vec<HeuristicRule>) -> Self {
        let mut rules = extra;
        rules.extend(default_rules());
        Self { rules }
    }

    /// Classify a failure. Total: every error maps to some category.
    pub fn classify(&self, error: &SkaldError) -> Classified {
        // Filesystem and OS-level kinds carry the most specific signal.
        if let SkaldError::Io(io) = error {
            return classify_io(io);
        }

        match error {
            SkaldError::Network(e) => {
                if e.is_connect() {
                    return Classified::of(ErrorCategory::Connection);
                }
                if e.is_timeout() {
                    return Classified::of(ErrorCategory::Timeout);
                }
                if let Some(status) = e.status() {
                    if let Some(classified) = from_status(status.as_u16()) {
                        return classified;
                    }
                }
            }
            SkaldError::Timeout(_) => return Classified::of(ErrorCategory::Timeout),
            SkaldError::Api { status, .. } => {
                if let Some(classified) = from_status(*status) {
                    return classified;
                }
            }
            SkaldError::RateLimited { .. } => return Classified::of(ErrorCategory::RateLimit),
            SkaldError::Authentication(_) => {
                return Classified::of(ErrorCategory::Authentication)
            }
            SkaldError::RetriesExhausted { category, .. } => {
                return Classified {
                    category: *category,
                    message: error.to_string(),
                }
            }
            _ => {}
        }

        // Message sniffing. Deliberately behind the type-based checks:
        // fragile, but the only signal some backends give us.
        let text = error.to_string().to_lowercase();
        for rule in &self.rules {
            if rule.matcher.matches(&text) {
                return Classified::of(rule.category);
            }
        }

        match error {
            SkaldError::InvalidArgument(_) | SkaldError::Configuration(_) => {
                return Classified::of(ErrorCategory::Validation)
            }
            SkaldError::Dependency(_) => return Classified::of(ErrorCategory::Dependency),
            SkaldError::Cancelled => return Classified::of(ErrorCategory::Cancelled),
            SkaldError::Serialization(_) => return Classified::of(ErrorCategory::Data),
            _ => {}
        }

        if text.contains("json") {
            return Classified::of(ErrorCategory::Data);
        }

        Classified {
            category: ErrorCategory::Unknown,
            message: format!("An unexpected error occurred: {error}"),
        }
    }
}

fn classify_io(io: &std::io::Error) -> Classified {
    use std::io::ErrorKind;

    match io.kind() {
        ErrorKind::NotFound => Classified::of(ErrorCategory::FileNotFound),
        ErrorKind::AlreadyExists => Classified::of(ErrorCategory::FileExists),
        ErrorKind::PermissionDenied => Classified::of(ErrorCategory::Permission),
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected => Classified::of(ErrorCategory::Connection),
        ErrorKind::TimedOut => Classified::of(ErrorCategory::Timeout),
        ErrorKind::OutOfMemory => Classified::of(ErrorCategory::Memory),
        _ => {
            if io.to_string().to_lowercase().contains("too many open files") {
                Classified::of(ErrorCategory::ResourceExhaustion)
            } else {
                Classified::of(ErrorCategory::System)
            }
        }
    }
}

fn from_status(status: u16) -> Option<Classified> {
    let classified = match status {
        401 => Classified::of(ErrorCategory::Authentication),
        403 => Classified::of(ErrorCategory::Authorization),
        429 => Classified::of(ErrorCategory::RateLimit),
        500..=599 => Classified::of(ErrorCategory::Server),
        400..=499 => Classified {
            category: ErrorCategory::Client,
            message: format!("Request error (HTTP {status}). Please check your request."),
        },
        _ => return None,
    };
    Some(classified)
}

fn default_rules() -> Vec<HeuristicRule> {
    vec![
        HeuristicRule::new(
            TextMatcher::all_of(&["token", "limit"]),
            ErrorCategory::TokenLimit,
        ),
        HeuristicRule::new(
            TextMatcher::all_of(&["token", "exceeded"]),
            ErrorCategory::TokenLimit,
        ),
        HeuristicRule::new(TextMatcher::any_of(&["token"]), ErrorCategory::Token),
        HeuristicRule::new(
            TextMatcher::all_of(&["stream", "interrupted"]),
            ErrorCategory::StreamInterrupted,
        ),
        HeuristicRule::new(
            TextMatcher::all_of(&["stream", "cancelled"]),
            ErrorCategory::StreamInterrupted,
        ),
        HeuristicRule::new(
            TextMatcher::all_of(&["stream", "corrupted"]),
            ErrorCategory::StreamCorruption,
        ),
        HeuristicRule::new(TextMatcher::any_of(&["stream"]), ErrorCategory::Streaming),
        HeuristicRule::new(
            TextMatcher::any_of(&["ssl", "certificate"]),
            ErrorCategory::Ssl,
        ),
    ]
}
