use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The logical kinds of identifier that link records across tables and
/// stores. Each table maps a kind to one of its own columns through a
/// [`ColumnResolver`](crate::ColumnResolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    InstructionRef,
    ProspectId,
    Passcode,
    Email,
    DealId,
    MatterId,
    ClientId,
}

impl KeyKind {
    pub const ALL: [KeyKind; 7] = [
        KeyKind::InstructionRef,
        KeyKind::ProspectId,
        KeyKind::Passcode,
        KeyKind::Email,
        KeyKind::DealId,
        KeyKind::MatterId,
        KeyKind::ClientId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::InstructionRef => "InstructionRef",
            KeyKind::ProspectId => "ProspectId",
            KeyKind::Passcode => "Passcode",
            KeyKind::Email => "Email",
            KeyKind::DealId => "DealId",
            KeyKind::MatterId => "MatterId",
            KeyKind::ClientId => "ClientId",
        }
    }

    /// Kinds whose values are integers in every store.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            KeyKind::ProspectId | KeyKind::Passcode | KeyKind::DealId | KeyKind::ClientId
        )
    }

    /// Normalize a raw column value into a key value of this kind.
    ///
    /// Returns `None` when the value is empty or does not have the shape
    /// the kind requires (a non-integer for a numeric kind, an email
    /// without `@`, and so on).
    pub fn normalize(&self, raw: &Value) -> Option<KeyValue> {
        match raw {
            Value::String(s) => self.normalize_str(s),
            Value::Number(n) if self.is_numeric() => {
                if let Some(i) = n.as_i64() {
                    return Some(KeyValue::Int(i));
                }
                let f = n.as_f64()?;
                (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(KeyValue::Int(f as i64))
            }
            Value::Number(n) => self.normalize_str(&n.to_string()),
            _ => None,
        }
    }

    /// Normalize a textual value into a key value of this kind.
    pub fn normalize_str(&self, raw: &str) -> Option<KeyValue> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match self {
            k if k.is_numeric() => trimmed.parse::<i64>().ok().map(KeyValue::Int),
            KeyKind::Email => {
                let lowered = trimmed.to_lowercase();
                looks_like_email(&lowered).then_some(KeyValue::Text(lowered))
            }
            KeyKind::InstructionRef => Some(KeyValue::Text(trimmed.to_uppercase())),
            _ => Some(KeyValue::Text(trimmed.to_string())),
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyKind {
    type Err = KeyParseError;

    /// Accepts `ProspectId`, `prospect_id`, `prospect-id` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        KeyKind::ALL
            .into_iter()
            .find(|k| k.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| KeyParseError::UnknownKind(s.to_string()))
    }
}

/// A normalized key value. Numeric kinds always hold `Int`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl KeyValue {
    pub fn to_json(&self) -> Value {
        match self {
            KeyValue::Int(i) => Value::from(*i),
            KeyValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Loose comparison against a raw column value, used when a column is
    /// addressed by name rather than by kind: integers match numbers or
    /// numeric strings, text matches trimmed strings exactly.
    pub fn matches_raw(&self, raw: &Value) -> bool {
        match (self, raw) {
            (KeyValue::Int(i), Value::Number(n)) => n.as_i64() == Some(*i),
            (KeyValue::Int(i), Value::String(s)) => s.trim().parse::<i64>().ok() == Some(*i),
            (KeyValue::Text(t), Value::String(s)) => s.trim() == t,
            (KeyValue::Text(t), Value::Number(n)) => n.to_string() == *t,
            _ => false,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(i) => write!(f, "{}", i),
            KeyValue::Text(s) => f.write_str(s),
        }
    }
}

/// A typed, normalized identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    pub kind: KeyKind,
    pub value: KeyValue,
}

impl Key {
    /// Build a key from raw text, normalizing for the kind.
    pub fn new(kind: KeyKind, raw: &str) -> Option<Key> {
        kind.normalize_str(raw).map(|value| Key { kind, value })
    }

    /// Build a key from a raw column value, normalizing for the kind.
    pub fn from_value(kind: KeyKind, raw: &Value) -> Option<Key> {
        kind.normalize(raw).map(|value| Key { kind, value })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

impl FromStr for Key {
    type Err = KeyParseError;

    /// Parses `Kind:value`, e.g. `DealId:9001`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| KeyParseError::MissingSeparator(s.to_string()))?;
        let kind: KeyKind = kind.parse()?;
        Key::new(kind, value).ok_or_else(|| KeyParseError::InvalidValue {
            kind,
            value: value.to_string(),
        })
    }
}

/// Errors from parsing key kinds and `Kind:value` keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("unknown key kind '{0}'")]
    UnknownKind(String),
    #[error("expected 'Kind:value', got '{0}'")]
    MissingSeparator(String),
    #[error("'{value}' is not a valid {kind}")]
    InvalidValue { kind: KeyKind, value: String },
}

fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_kinds_parse_integers() {
        assert_eq!(KeyKind::ProspectId.normalize(&json!(500)), Some(KeyValue::Int(500)));
        assert_eq!(KeyKind::ProspectId.normalize(&json!(" 500 ")), Some(KeyValue::Int(500)));
        assert_eq!(KeyKind::DealId.normalize(&json!(9001.0)), Some(KeyValue::Int(9001)));
        assert_eq!(KeyKind::DealId.normalize(&json!(90.5)), None);
        assert_eq!(KeyKind::Passcode.normalize(&json!("abc")), None);
    }

    #[test]
    fn email_is_case_folded_and_shape_checked() {
        assert_eq!(
            KeyKind::Email.normalize(&json!("  A@X.Com ")),
            Some(KeyValue::Text("a@x.com".to_string()))
        );
        assert_eq!(KeyKind::Email.normalize(&json!("N/A")), None);
        assert_eq!(KeyKind::Email.normalize(&json!("a@localhost")), None);
        assert_eq!(KeyKind::Email.normalize(&json!("a b@x.com")), None);
    }

    #[test]
    fn instruction_ref_upper_cased() {
        assert_eq!(
            Key::new(KeyKind::InstructionRef, "hlx-500-12"),
            Some(Key {
                kind: KeyKind::InstructionRef,
                value: KeyValue::Text("HLX-500-12".to_string())
            })
        );
    }

    #[test]
    fn null_and_blank_produce_no_key() {
        assert_eq!(KeyKind::MatterId.normalize(&Value::Null), None);
        assert_eq!(KeyKind::MatterId.normalize(&json!("   ")), None);
        assert_eq!(KeyKind::MatterId.normalize(&json!(true)), None);
    }

    #[test]
    fn kind_from_str_is_tolerant() {
        assert_eq!("prospect_id".parse::<KeyKind>(), Ok(KeyKind::ProspectId));
        assert_eq!("DEALID".parse::<KeyKind>(), Ok(KeyKind::DealId));
        assert_eq!("instruction-ref".parse::<KeyKind>(), Ok(KeyKind::InstructionRef));
        assert!("colour".parse::<KeyKind>().is_err());
    }

    #[test]
    fn key_from_str_round_trips_display() {
        let key: Key = "DealId:9001".parse().unwrap();
        assert_eq!(key.kind, KeyKind::DealId);
        assert_eq!(key.value, KeyValue::Int(9001));
        assert_eq!(key.to_string(), "DealId:9001");

        assert_eq!(
            "DealId".parse::<Key>(),
            Err(KeyParseError::MissingSeparator("DealId".to_string()))
        );
        assert!(matches!(
            "DealId:abc".parse::<Key>(),
            Err(KeyParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn matches_raw_is_loose_on_numbers() {
        assert!(KeyValue::Int(42).matches_raw(&json!(42)));
        assert!(KeyValue::Int(42).matches_raw(&json!("42")));
        assert!(KeyValue::Text("42".to_string()).matches_raw(&json!(42)));
        assert!(KeyValue::Text("abc".to_string()).matches_raw(&json!(" abc ")));
        assert!(!KeyValue::Text("abc".to_string()).matches_raw(&json!("ABC")));
        assert!(!KeyValue::Int(42).matches_raw(&Value::Null));
    }
}
