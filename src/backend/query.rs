//! Path queries over normalized outputs
//!
//! Expressions use a small yq-like syntax: `.vpc_id`, `.subnets[0]`,
//! `.tags.Name` and `."key.with.dots"`. A bare `.` selects the whole map.

use serde_json::Value;

use super::error::{BackendError, BackendResult};
use super::NormalizedOutputs;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Look up one value in the outputs map
///
/// A missing leading `.` is added. Paths that do not resolve yield `Value::Null`.
pub fn get_backend_variable(outputs: &NormalizedOutputs, expression: &str) -> BackendResult<Value> {
    let expression = expression.trim();
    let normalized = if expression.starts_with('.') {
        expression.to_string()
    } else {
        format!(".{expression}")
    };

    let segments = parse(&normalized)?;
    let Some((first, rest)) = segments.split_first() else {
        return Ok(Value::Object(outputs.clone()));
    };

    let mut current = match first {
        Segment::Key(key) => match outputs.get(key) {
            Some(value) => value,
            None => return Ok(Value::Null),
        },
        Segment::Index(_) => return Ok(Value::Null),
    };

    for segment in rest {
        let next = match segment {
            Segment::Key(key) => current.get(key.as_str()),
            Segment::Index(index) => current.get(*index),
        };
        match next {
            Some(value) => current = value,
            None => return Ok(Value::Null),
        }
    }

    Ok(current.clone())
}

fn parse(expression: &str) -> BackendResult<Vec<Segment>> {
    let invalid = |message: &str| BackendError::InvalidQuery {
        expression: expression.to_string(),
        message: message.to_string(),
    };

    let chars: Vec<char> = expression.chars().collect();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                i += 1;
                if i >= chars.len() {
                    if segments.is_empty() {
                        break;
                    }
                    return Err(invalid("trailing '.'"));
                }
                if chars[i] == '"' {
                    let start = i + 1;
                    let end = chars[start..]
                        .iter()
                        .position(|c| *c == '"')
                        .map(|offset| start + offset)
                        .ok_or_else(|| invalid("unterminated quoted key"))?;
                    segments.push(Segment::Key(chars[start..end].iter().collect()));
                    i = end + 1;
                } else if chars[i] == '[' {
                    continue;
                } else {
                    let start = i;
                    while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                        i += 1;
                    }
                    if start == i {
                        return Err(invalid("empty key"));
                    }
                    segments.push(Segment::Key(chars[start..i].iter().collect()));
                }
            }
            '[' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|offset| start + offset)
                    .ok_or_else(|| invalid("unterminated index"))?;
                let raw: String = chars[start..end].iter().collect();
                let index = raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("index must be a non-negative integer"))?;
                segments.push(Segment::Index(index));
                i = end + 1;
            }
            _ => return Err(invalid("expected '.' or '['")),
        }
    }

    Ok(segments)
}
