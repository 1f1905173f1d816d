use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping of field name to field, preserving catalog order.
pub type FieldMap = IndexMap<String, Field>;

/// The declared type of a catalog field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Number,
    String,
    FormattedText,
}

impl FieldType {
    /// Returns the tag string used by the serialization layer.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::FormattedText => "formattedtext",
        }
    }
}

/// A typed leaf value. The raw value is always kept in its textual form so
/// that replacing it never disturbs the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub raw: String,
}

impl FieldValue {
    pub fn new(field_type: FieldType, raw: impl Into<String>) -> Self {
        Self {
            field_type,
            raw: raw.into(),
        }
    }

    pub fn number(raw: impl Into<String>) -> Self {
        Self::new(FieldType::Number, raw)
    }

    pub fn string(raw: impl Into<String>) -> Self {
        Self::new(FieldType::String, raw)
    }

    /// Parses the raw value as an integer. Fractional numbers are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        let trimmed = self.raw.trim();
        trimmed
            .parse::<i64>()
            .ok()
            .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
    }
}

/// A catalog field: either a typed leaf or a nested group of fields
/// (e.g. an NPC's weapon list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    Value(FieldValue),
    Group(FieldMap),
}

impl Field {
    pub fn as_value(&self) -> Option<&FieldValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&FieldMap> {
        match self {
            Self::Value(_) => None,
            Self::Group(g) => Some(g),
        }
    }
}

/// An author-supplied override value from a customization record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverrideValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for OverrideValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for OverrideValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for OverrideValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_tags() {
        assert_eq!(FieldType::Number.tag(), "number");
        assert_eq!(FieldType::String.tag(), "string");
        assert_eq!(FieldType::FormattedText.tag(), "formattedtext");
    }

    #[test]
    fn numeric_parsing() {
        assert_eq!(FieldValue::number("150").as_i64(), Some(150));
        assert_eq!(FieldValue::number(" 7 ").as_i64(), Some(7));
        assert_eq!(FieldValue::number("2.5").as_i64(), Some(2));
        assert_eq!(FieldValue::string("Animist").as_i64(), None);
    }

    #[test]
    fn override_display() {
        assert_eq!(OverrideValue::Int(150).to_string(), "150");
        assert_eq!(OverrideValue::Text("Brave".to_string()).to_string(), "Brave");
        assert_eq!(OverrideValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn override_values_from_ron() {
        let parsed: IndexMap<String, OverrideValue> =
            ron::from_str(r#"{ "hits": 150, "race": "Dunadan", "haste": true }"#).unwrap();
        assert_eq!(parsed["hits"], OverrideValue::Int(150));
        assert_eq!(parsed["race"], OverrideValue::Text("Dunadan".to_string()));
        assert_eq!(parsed["haste"], OverrideValue::Bool(true));
    }

    #[test]
    fn field_group_from_ron() {
        let field: Field = ron::from_str(
            r#"Group({ "name": Value((type: String, raw: "Dagger")), "count": Value((type: Number, raw: "1")) })"#,
        )
        .unwrap();
        let group = field.as_group().unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group["name"].as_value().unwrap().raw, "Dagger");
        assert!(field.as_value().is_none());
    }
}
