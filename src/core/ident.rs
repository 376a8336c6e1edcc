//! Purpose: Represent ids that may arrive as JSON numbers or as strings.
//! Exports: `LooseId`.
//! Role: Backs the ownership gate; form input and decoded JSON must agree.
//! Invariants: Equality is numeric: `"5"`, `5`, and `5.0` are the same id.
//! Invariants: A value with no numeric reading is equal to nothing, itself included.
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Debug)]
pub enum LooseId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseId {
    pub fn numeric(&self) -> Option<f64> {
        let value = match self {
            LooseId::Int(value) => *value as f64,
            LooseId::Float(value) => *value,
            LooseId::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
        };
        value.is_finite().then_some(value)
    }

    /// Integer reading used to build item paths.
    pub fn as_i64(&self) -> Option<i64> {
        let value = self.numeric()?;
        (value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64)
            .then_some(value as i64)
    }

    pub fn numeric_eq(&self, other: &LooseId) -> bool {
        match (self.numeric(), other.numeric()) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }
}

impl PartialEq for LooseId {
    fn eq(&self, other: &Self) -> bool {
        self.numeric_eq(other)
    }
}

impl From<i64> for LooseId {
    fn from(value: i64) -> Self {
        LooseId::Int(value)
    }
}

impl From<&str> for LooseId {
    fn from(value: &str) -> Self {
        LooseId::Text(value.to_string())
    }
}

impl From<String> for LooseId {
    fn from(value: String) -> Self {
        LooseId::Text(value)
    }
}

impl fmt::Display for LooseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LooseId::Int(value) => write!(f, "{value}"),
            LooseId::Float(value) => write!(f, "{value}"),
            LooseId::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for LooseId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(value) => LooseId::Int(value),
            RawId::Float(value) => LooseId::Float(value),
            RawId::Text(text) => LooseId::Text(text),
        })
    }
}

impl Serialize for LooseId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            LooseId::Int(value) => serializer.serialize_i64(*value),
            LooseId::Float(value) => serializer.serialize_f64(*value),
            LooseId::Text(text) => serializer.serialize_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LooseId;

    #[test]
    fn string_and_number_compare_equal() {
        assert_eq!(LooseId::from("5"), LooseId::from(5));
        assert_eq!(LooseId::Float(5.0), LooseId::from(5));
        assert_eq!(LooseId::from(" 5 "), LooseId::from(5));
        assert_ne!(LooseId::from("6"), LooseId::from(5));
    }

    #[test]
    fn non_numeric_ids_never_match() {
        let id = LooseId::from("abc");
        assert_ne!(id, id.clone());
        assert_ne!(LooseId::from(""), LooseId::from(0));
    }

    #[test]
    fn deserializes_both_shapes() {
        let ids: Vec<LooseId> = serde_json::from_str(r#"[7, "7", 7.0]"#).expect("ids");
        assert!(ids.iter().all(|id| id.as_i64() == Some(7)));
    }

    #[test]
    fn fractional_ids_have_no_integer_reading() {
        assert_eq!(LooseId::Float(1.5).as_i64(), None);
    }
}
