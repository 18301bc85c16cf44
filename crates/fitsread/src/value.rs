//! Typed keyword values and the value/comment field of a header card.

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS character string (content between single quotes).
    String(String),
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Logical(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value as `f64`; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::String(s) => write!(f, "'{s}'"),
            Value::Logical(b) => f.write_str(if *b { "T" } else { "F" }),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:E}"),
        }
    }
}

/// Split a value field at the first `/` that is not inside a quoted string.
///
/// Returns `(value_part, comment_part)`; the comment does not include the
/// slash. Quote state toggles on every `'`, so the doubled quote used to
/// escape `'` inside a FITS string leaves the state unchanged.
pub fn split_value_comment(field: &[u8]) -> (&[u8], Option<&[u8]>) {
    let mut in_string = false;
    for (i, &b) in field.iter().enumerate() {
        match b {
            b'\'' => in_string = !in_string,
            b'/' if !in_string => return (&field[..i], Some(&field[i + 1..])),
            _ => {}
        }
    }
    (field, None)
}

fn to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse a quoted string value: the content between the first and the last
/// quote, with doubled quotes collapsed and trailing blanks removed.
///
/// A single stray quote is not a string.
fn parse_string(text: &[u8]) -> Option<Value> {
    let first = text.iter().position(|&b| b == b'\'')?;
    let last = text.iter().rposition(|&b| b == b'\'')?;
    if first == last {
        return None;
    }
    let inner = to_text(&text[first + 1..last]).replace("''", "'");
    Some(Value::String(String::from(inner.trim_end())))
}

/// Parse a float string, handling FITS `D` exponent notation.
fn parse_float_str(s: &str) -> Option<f64> {
    let normalized = s.replace('D', "E").replace('d', "e");
    normalized.parse::<f64>().ok()
}

/// Parse the value/comment field of a card (columns 11-80).
///
/// Returns the typed value, if any, and the trimmed comment, if any. Text
/// that is neither a string, a logical, an integer, nor a float yields no
/// value.
pub fn parse_value(field: &[u8]) -> (Option<Value>, Option<String>) {
    let (value_part, comment_part) = split_value_comment(field);
    let comment = comment_part
        .map(|c| String::from(to_text(c).trim()))
        .filter(|c| !c.is_empty());

    if let Some(string) = parse_string(value_part) {
        return (Some(string), comment);
    }

    let text = to_text(value_part);
    let text = text.trim();
    let value = match text {
        "" => None,
        "T" => Some(Value::Logical(true)),
        "F" => Some(Value::Logical(false)),
        _ => text
            .parse::<i64>()
            .ok()
            .map(Value::Integer)
            .or_else(|| parse_float_str(text).map(Value::Float)),
    };
    (value, comment)
}

/// Render a value as it appears in a card's value field.
///
/// Numeric and logical values are right-justified in 20 columns (columns
/// 11-30 of the card). Strings are quoted, inner quotes doubled, and padded
/// to at least 8 characters between the quotes.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let escaped = s.replace('\'', "''");
            format!("'{escaped:<8}'")
        }
        Value::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        Value::Integer(n) => format!("{n:>20}"),
        Value::Float(f) => format!("{:>20}", format!("{f:E}")),
    }
}
