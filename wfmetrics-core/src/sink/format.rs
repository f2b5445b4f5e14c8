//! Wavefront data format
//!
//! `"<name>" <value> [<timestamp>] source="<source>" ["<key>"="<value>" ...]`

use crate::error::EmitError;
use crate::settings::Tags;

/// Marks a metric name as a delta counter.
pub const DELTA_PREFIX: char = '\u{2206}';

/// Replaces every character Wavefront does not accept in a metric name with `-`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' | '~' => c,
            DELTA_PREFIX => c,
            _ => '-',
        })
        .collect()
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn validate(name: &str, source: &str) -> Result<(), EmitError> {
    if name.trim().is_empty() {
        return Err(EmitError::InvalidPoint("metric name is empty".to_string()));
    }
    if source.trim().is_empty() {
        return Err(EmitError::InvalidPoint("source is empty".to_string()));
    }
    Ok(())
}

fn push_tail(line: &mut String, source: &str, tags: &Tags) {
    line.push_str(&format!(" source=\"{}\"", escape(source)));
    for (key, value) in tags {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        line.push_str(&format!(" \"{}\"=\"{}\"", escape(key), escape(value)));
    }
}

pub fn format_metric(
    name: &str,
    value: f64,
    timestamp: i64,
    source: &str,
    tags: &Tags,
) -> Result<String, EmitError> {
    validate(name, source)?;
    let mut line = format!("\"{}\" {} {}", sanitize_name(name), value, timestamp);
    push_tail(&mut line, source, tags);
    Ok(line)
}

pub fn format_delta_counter(
    name: &str,
    delta: f64,
    source: &str,
    tags: &Tags,
) -> Result<String, EmitError> {
    validate(name, source)?;
    if delta <= 0.0 {
        return Err(EmitError::InvalidPoint(
            "delta counter value must be positive".to_string(),
        ));
    }
    let name = sanitize_name(name);
    let name = if name.starts_with(DELTA_PREFIX) {
        name
    } else {
        format!("{DELTA_PREFIX}{name}")
    };
    let mut line = format!("\"{}\" {}", name, delta);
    push_tail(&mut line, source, tags);
    Ok(line)
}
