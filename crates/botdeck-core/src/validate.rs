// ── Configuration validation ──
//
// Pre-save checks mirroring what the bot enforces at startup: required
// identity fields, numeric ranges, and settings that depend on each other.

use serde::Serialize;
use serde_json::Value;

use crate::env::{EnvVars, SECRET_KEYS};
use crate::merge::{BotConfig, kind_of};

/// Errors block a strict save; warnings never do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Whether a save runs the validator first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Refuse to save when the report has errors.
    #[default]
    Strict,
    /// Save as-is.
    Skip,
}

const REQUIRED: [(&str, &str); 3] = [
    ("bot.qq_number", "bot account"),
    ("bot.admin_qq", "admin account"),
    ("bot.target_group", "target group"),
];

#[derive(Clone, Copy)]
enum Kind {
    Number,
    Integer,
}

/// `(path, kind, min, max)`; an absent max means unbounded.
const RANGES: [(&str, Kind, f64, Option<f64>); 7] = [
    ("ai.temperature", Kind::Number, 0.0, Some(1.0)),
    ("ai.max_tokens", Kind::Integer, 1.0, Some(4000.0)),
    ("smart_reply.trigger_rate", Kind::Number, 0.0, Some(1.0)),
    ("conversation.max_messages", Kind::Integer, 1.0, Some(100.0)),
    ("conversation.timeout_minutes", Kind::Integer, 1.0, None),
    ("memory.vector_db.search_results", Kind::Integer, 1.0, Some(20.0)),
    ("memory.vector_db.similarity_threshold", Kind::Number, 0.0, Some(1.0)),
];

pub fn validate(config: &BotConfig, env: &EnvVars) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (path, label) in REQUIRED {
        match config.get_path(path) {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            None | Some(Value::Null) => {
                report.errors.push(format!("missing {label} ({path})"));
            }
            Some(Value::String(_)) => {
                report.errors.push(format!("{label} must not be empty ({path})"));
            }
            Some(other) => report.errors.push(format!(
                "{label} must be a string ({path} is {})",
                kind_of(other)
            )),
        }
    }

    for (path, kind, min, max) in RANGES {
        let Some(value) = config.get_path(path).filter(|v| !v.is_null()) else {
            continue;
        };
        let number = match (kind, value) {
            (Kind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => n.as_f64(),
            (Kind::Number, Value::Number(n)) => n.as_f64(),
            (Kind::Integer, _) => {
                report.errors.push(format!(
                    "{path} must be an integer (found {})",
                    kind_of(value)
                ));
                continue;
            }
            (Kind::Number, _) => {
                report.errors.push(format!(
                    "{path} must be a number (found {})",
                    kind_of(value)
                ));
                continue;
            }
        };
        let Some(n) = number else { continue };
        match max {
            Some(max) if !(min..=max).contains(&n) => report
                .errors
                .push(format!("{path} must be between {min} and {max} (got {value})")),
            None if n < min => report
                .errors
                .push(format!("{path} must be at least {min} (got {value})")),
            _ => {}
        }
    }

    if truthy(config.get_path("memory.vector_db.enabled"))
        && !truthy(config.get_path("memory.vector_db.persist_dir"))
    {
        report
            .warnings
            .push("vector store enabled without persist_dir; the bot will use its default".into());
    }
    if truthy(config.get_path("dialogue_intelligence.proactive.enabled"))
        && !truthy(config.get_path("dialogue_intelligence.proactive.check_interval"))
    {
        report.warnings.push(
            "proactive chat enabled without check_interval; the bot will use its default".into(),
        );
    }

    if !SECRET_KEYS.iter().any(|key| env.is_set(key)) {
        report.warnings.push(format!(
            "no AI API key configured ({})",
            SECRET_KEYS.join(" or ")
        ));
    }

    report
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f.abs() > f64::EPSILON),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
