// SPDX-License-Identifier: GPL-3.0-or-later

//! Custom-format scoring: user-defined regex rules contributing signed
//! points to a release's total score.
//!
//! Rules are compiled once per evaluation batch. A malformed pattern, an
//! empty specification set, or a missing custom-format blob all degrade to
//! "contributes nothing" rather than an error.

use grabarr_domain::{CustomFormat, FormatSpecification};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

pub const CUSTOM_FORMATS_KEY: &str = "custom_formats";

struct CompiledSpecification {
    pattern: Regex,
    negate: bool,
}

pub struct CompiledFormat {
    name: String,
    score: i64,
    specifications: Vec<CompiledSpecification>,
}

/// Compile the participating (required) specifications of each format.
/// Specifications that fail to compile are dropped; a format left with no
/// participating specification never matches.
pub fn compile_formats(formats: &[CustomFormat]) -> Vec<CompiledFormat> {
    formats
        .iter()
        .map(|format| CompiledFormat {
            name: format.name.clone(),
            score: format.score,
            specifications: format
                .specifications
                .iter()
                .filter(|specification| specification.required)
                .filter_map(|specification| compile_specification(&format.name, specification))
                .collect(),
        })
        .collect()
}

fn compile_specification(
    format_name: &str,
    specification: &FormatSpecification,
) -> Option<CompiledSpecification> {
    let is_resolution = specification
        .implementation
        .as_deref()
        .is_some_and(|implementation| implementation.to_lowercase().contains("resolution"));

    let source = if is_resolution {
        let digits: String = specification
            .pattern
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        if digits.is_empty() {
            debug!(
                target: "custom_formats",
                format = format_name,
                "resolution specification without digits, skipping"
            );
            return None;
        }
        format!(r"(?i)\b{}p?\b", digits)
    } else {
        format!("(?i){}", specification.pattern)
    };

    match Regex::new(&source) {
        Ok(pattern) => Some(CompiledSpecification {
            pattern,
            negate: specification.negate,
        }),
        Err(error) => {
            debug!(
                target: "custom_formats",
                format = format_name,
                pattern = %specification.pattern,
                error = %error,
                "invalid specification pattern, skipping"
            );
            None
        }
    }
}

/// Sum the scores of every matching format and render a human-readable
/// breakdown, `"-"` when nothing contributed.
pub fn score_title(title: &str, formats: &[CompiledFormat]) -> (i64, String) {
    let mut total = 0;
    let mut parts = Vec::new();

    for format in formats {
        if !format_matches(title, format) {
            continue;
        }
        total += format.score;
        if format.score >= 0 {
            parts.push(format!("{} +{}", format.name, format.score));
        } else {
            parts.push(format!("{} {}", format.name, format.score));
        }
    }

    let breakdown = if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    };

    (total, breakdown)
}

fn format_matches(title: &str, format: &CompiledFormat) -> bool {
    if format.specifications.is_empty() {
        return false;
    }

    let mut positive_hit = false;
    for specification in &format.specifications {
        let hit = specification.pattern.is_match(title);
        if specification.negate {
            if hit {
                return false;
            }
        } else if hit {
            positive_hit = true;
        }
    }

    positive_hit
}

/// Decode the stored custom-format blob, tolerating malformed entries and
/// shapes. Anything unreadable contributes no formats.
pub fn formats_from_blob(blob: Option<&Value>) -> Vec<CustomFormat> {
    let Some(blob) = blob else {
        return Vec::new();
    };

    let list = match blob {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("formats").and_then(Value::as_array) {
            Some(items) => items.as_slice(),
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    list.iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(format) => Some(format),
            Err(error) => {
                debug!(target: "custom_formats", error = %error, "skipping malformed custom format");
                None
            }
        })
        .collect()
}
