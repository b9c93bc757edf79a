
use serde_json::Value;
use tracing::debug;

pub type JsonMap = serde_json::Map<String, Value>;

/// Parse strategies, tried in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Strict JSON
    Json,
    /// A JSON string literal whose contents are the object (double-encoded)
    Unquoted,
    /// Python dict literal: single quotes, `True`/`False`/`None`, trailing commas
    PythonLiteral,
}

pub const PARSE_STRATEGIES: [ParseStrategy; 3] = [
    ParseStrategy::Json,
    ParseStrategy::Unquoted,
    ParseStrategy::PythonLiteral,
];

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed {
        map: JsonMap,
        strategy: ParseStrategy,
    },
    /// Blank input, a non-object value, or every strategy failed
    Empty,
}

impl ParseOutcome {
    #[inline]
    pub fn into_map(self) -> JsonMap {
        match self {
            Self::Parsed { map, .. } => map,
            Self::Empty => JsonMap::new(),
        }
    }

    #[inline]
    pub fn strategy(&self) -> Option<ParseStrategy> {
        match self {
            Self::Parsed { strategy, .. } => Some(*strategy),
            Self::Empty => None,
        }
    }
}

impl ParseStrategy {
    fn attempt(self, input: &str) -> Option<Value> {
        match self {
            Self::Json => serde_json::from_str(input).ok(),
            Self::Unquoted => match serde_json::from_str::<Value>(input).ok()? {
                Value::String(inner) => serde_json::from_str(&inner).ok(),
                _ => None,
            },
            Self::PythonLiteral => {
                let rewritten = python_literal_to_json(input)?;
                serde_json::from_str(&rewritten).ok()
            }
        }
    }
}

/// Best-effort parse of a JSON-bearing cell into a mapping
#[inline]
pub fn parse_mapping(input: Option<&str>) -> ParseOutcome {
    let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return ParseOutcome::Empty;
    };

    if ["null", "none", "nan"]
        .iter()
        .any(|blank| input.eq_ignore_ascii_case(blank))
    {
        return ParseOutcome::Empty;
    }

    for strategy in PARSE_STRATEGIES {
        match strategy.attempt(input) {
            Some(Value::Object(map)) => return ParseOutcome::Parsed { map, strategy },
            // A bare string may be double-encoded; the next strategy unwraps it
            Some(Value::String(_)) | None => {}
            Some(_) => {
                debug!("{:?} parsed a non-object value, ignoring", strategy);
                return ParseOutcome::Empty;
            }
        }
    }

    debug!("No parse strategy accepted input of length {}", input.len());
    ParseOutcome::Empty
}

/// Parse or fall back to an empty map; never fails
#[inline]
pub fn safe_parse(input: Option<&str>) -> JsonMap {
    parse_mapping(input).into_map()
}

/// Rewrite a Python literal into JSON text. Returns `None` on unbalanced quotes.
fn python_literal_to_json(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len() + 8);
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let quote = c;
                out.push('"');
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            let escaped = chars.next()?;
                            if escaped == '\'' {
                                out.push('\'');
                            } else {
                                out.push('\\');
                                out.push(escaped);
                            }
                        }
                        '"' if quote == '\'' => out.push_str("\\\""),
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        c => out.push(c),
                    }
                }
                if !closed {
                    return None;
                }
                out.push('"');
            }
            ',' => {
                // Drop trailing commas before a closing bracket
                let next = chars.clone().find(|w| !w.is_whitespace());
                if !matches!(next, Some('}' | ']' | ')')) {
                    out.push(',');
                }
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    "None" => out.push_str("null"),
                    other => out.push_str(other),
                }
            }
            '(' => out.push('['),
            ')' => out.push(']'),
            c => out.push(c),
        }
    }

    Some(out)
}
