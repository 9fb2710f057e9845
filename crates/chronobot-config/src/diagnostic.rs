// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with "did you mean" suggestions.
//!
//! Figment reports unknown and mistyped keys without any hint of what was
//! meant. These helpers convert each figment error into a [`ConfigError`]
//! carrying the offending key, a source span when the key can be located in a
//! TOML file, and the closest valid key by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a key to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(chronobot::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is close enough.
        suggestion: Option<String>,
        /// Comma-separated keys accepted in the same section.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(chronobot::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(chronobot::config::missing_key),
        help("add `{key} = <value>` to your chronobot.toml or set {env_hint}")
    )]
    MissingKey {
        /// Dotted key path, e.g. `telegram.bot_token`.
        key: String,
        /// Environment variable(s) that can supply the value.
        env_hint: String,
    },

    /// A schedule time could not be parsed.
    #[error("invalid time `{value}` for `{key}`")]
    #[diagnostic(code(chronobot::config::invalid_time), help("expected {expected}"))]
    InvalidTime {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// A value is well-typed but out of range.
    #[error("validation error: {message}")]
    #[diagnostic(code(chronobot::config::validation))]
    Validation { message: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(chronobot::config::other))]
    Other(String),
}

impl ConfigError {
    /// A missing key that can also be supplied through `CHRONOBOT_<KEY>`.
    pub fn missing(key: &str) -> Self {
        Self::MissingKey {
            key: key.to_string(),
            env_hint: env_var_for(key),
        }
    }
}

/// `telegram.bot_token` -> `CHRONOBOT_TELEGRAM_BOT_TOKEN`.
fn env_var_for(key: &str) -> String {
    format!("CHRONOBOT_{}", key.replace('.', "_").to_uppercase())
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// A single figment error may chain several; each becomes its own entry.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let valid_keys: Vec<&str> = expected.to_vec();
                let (span, src) = locate_key(&error, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, &valid_keys),
                    valid_keys: valid_keys.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => {
                let mut path: Vec<String> = error.path.clone();
                path.push(field.to_string());
                ConfigError::missing(&path.join("."))
            }
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Find the span of `field` in whichever TOML file produced the error.
fn locate_key(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline sources carry no file metadata; fall back to the only source.
    let source = match origin {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    let Some((name, content)) = source else {
        return (None, None);
    };

    match find_key_offset(content, &error.path, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Find the byte offset of `field` in TOML `content`, searching after the
/// header of the first path segment (`[bot]`, `[[schedule.jobs]]`, ...).
/// Top-level fields are searched from the start.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        None => 0,
        Some(section) => {
            let header = content.lines().scan(0usize, |pos, line| {
                let line_start = *pos;
                *pos += line.len() + 1;
                Some((line_start, line))
            });
            header
                .filter(|(_, line)| {
                    let name = line.trim().trim_start_matches('[').trim_end_matches(']');
                    line.trim_start().starts_with('[')
                        && (name == section || name.starts_with(&format!("{section}.")))
                })
                .map(|(line_start, line)| line_start + line.len())
                .next()?
        }
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(after) = trimmed.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Suggest the valid key closest to `unknown`, if any clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (*key, strsim::jaro_winkler(unknown, key)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
