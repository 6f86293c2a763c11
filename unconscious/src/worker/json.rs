//! Recovery of a structured payload from unstructured engine output
//!
//! Engines tend to wrap their JSON in prose or in a result envelope. One left-to-right
//! pass collects every balanced `{...}` span (brace characters inside JSON strings don't
//! count), then spans are tried in start order and the first that parses as a JSON
//! object is taken.
//!
//! Known fragility: a well-formed object that precedes the real payload wins. Spans that
//! are not valid JSON (`{like this}`) are skipped.

use serde_json::{Map, Value};
use unconscious_sdk::{TaskPayload, TaskType};

use crate::error::TaskError;

/// Returns the first balanced `{...}` span in `text` that parses as a JSON object
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let mut spans = balanced_spans(text.as_bytes());
    spans.sort_unstable_by_key(|&(open, _)| open);

    spans.into_iter().find_map(|(open, close)| {
        match serde_json::from_str::<Value>(&text[open..=close]) {
            Ok(Value::Object(object)) => Some(object),
            _ => None,
        }
    })
}

/// `(open, close)` byte offsets of every balanced brace pair, in closing order
///
/// Quotes only open a string while some brace is open, so quotes in the prose between
/// objects are ignored. An unclosed `{` never yields a span.
fn balanced_spans(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(idx),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, idx));
                }
            }
            _ => {}
        }
    }

    spans
}

/// The engine's `--output-format json` wrapper: `{"type": "result", "result": "<text>"}`
fn is_result_envelope(object: &Map<String, Value>) -> bool {
    object.get("type").and_then(Value::as_str) == Some("result")
        && object.get("result").map_or(false, Value::is_string)
}

/// Turn raw stdout into the typed payload for `task_type`
///
/// A missing discriminator is filled in with `task_type`; a discriminator naming another
/// type is rejected.
pub fn recover_payload(stdout: &str, task_type: TaskType) -> Result<TaskPayload, TaskError> {
    let mut object = extract_json_object(stdout)
        .ok_or_else(|| TaskError::parse("no JSON object in engine output"))?;

    if is_result_envelope(&object) {
        let text = object
            .get("result")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if object.get("is_error").and_then(Value::as_bool) == Some(true) {
            return Err(TaskError::parse(format!("engine reported an error: {}", text)));
        }

        object = extract_json_object(&text)
            .ok_or_else(|| TaskError::parse("no JSON object in engine result text"))?;
    }

    match object.get("type") {
        None | Some(Value::Null) => {}
        Some(Value::String(found)) if found == task_type.as_str() => {}
        Some(other) => {
            return Err(TaskError::parse(format!(
                "payload type {} does not match task type {}",
                other, task_type
            )));
        }
    }

    TaskPayload::from_object(task_type, object).map_err(|e| TaskError::parse(e.to_string()))
}
