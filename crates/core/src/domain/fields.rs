use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::text::parse_count;

/// Scalar answer or derived value stored under a field key.
///
/// Deserialization is untagged: `null` is [`FieldValue::Empty`], JSON booleans
/// and integers map to their variants, `YYYY-MM-DD` strings become dates and
/// any other string stays text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Empty,
    Flag(bool),
    Number(i64),
    Date(NaiveDate),
    Text(String),
    Rows(Vec<Vec<String>>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Whole-number view of the value, parsing numeric text.
    pub fn as_count(&self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => parse_count(text),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Text(text) => f.write_str(text),
            Self::Rows(rows) => {
                let joined =
                    rows.iter().map(|row| row.join(" ")).collect::<Vec<_>>().join("\n");
                f.write_str(&joined)
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Empty, Self::Number)
    }
}

/// Raw answers of one form submission, keyed by localized label.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionFields {
    fields: BTreeMap<String, FieldValue>,
}

impl SubmissionFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Returns the value only when it carries an answer.
    pub fn answered(&self, key: &str) -> Option<&FieldValue> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for SubmissionFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }
}

/// Submission answers plus every derived field, as handed to the document writer.
///
/// Only the transformation builds values of this type; it is a superset of
/// the submission it was derived from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotationFields {
    fields: BTreeMap<String, FieldValue>,
}

impl QuotationFields {
    pub(crate) fn from_submission(input: &SubmissionFields) -> Self {
        Self { fields: input.fields.clone() }
    }

    pub(crate) fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Boolean field, `false` when absent or not a flag.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(FieldValue::as_flag).unwrap_or(false)
    }

    pub fn count(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(FieldValue::as_count)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl From<QuotationFields> for SubmissionFields {
    fn from(value: QuotationFields) -> Self {
        Self { fields: value.fields }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{FieldValue, SubmissionFields};

    #[test]
    fn untagged_json_values_map_to_expected_variants() {
        let fields: SubmissionFields = serde_json::from_str(
            r#"{
                "試験種別": "先進",
                "FPI (First Patient In)": "2023-01-15",
                "目標症例数": 222,
                "flag": true,
                "返信先メールアドレス": null
            }"#,
        )
        .expect("valid submission json");

        assert_eq!(fields.get("試験種別"), Some(&FieldValue::Text("先進".to_owned())));
        assert_eq!(
            fields.get("FPI (First Patient In)"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2023, 1, 15).expect("date")))
        );
        assert_eq!(fields.get("目標症例数"), Some(&FieldValue::Number(222)));
        assert_eq!(fields.get("flag"), Some(&FieldValue::Flag(true)));
        assert_eq!(fields.get("返信先メールアドレス"), Some(&FieldValue::Empty));
    }

    #[test]
    fn answered_skips_blank_values() {
        let fields = SubmissionFields::new()
            .with("施設数", FieldValue::Empty)
            .with("治療期間", "  ")
            .with("目標症例数", 10);

        assert!(fields.contains_key("施設数"));
        assert!(fields.answered("施設数").is_none());
        assert!(fields.answered("治療期間").is_none());
        assert_eq!(fields.answered("目標症例数"), Some(&FieldValue::Number(10)));
    }

    #[test]
    fn count_view_parses_numeric_text() {
        assert_eq!(FieldValue::from("４４").as_count(), Some(44));
        assert_eq!(FieldValue::Number(3500).as_count(), Some(3500));
        assert_eq!(FieldValue::Flag(true).as_count(), None);
    }

    #[test]
    fn dates_serialize_as_iso_strings() {
        let value = FieldValue::Date(NaiveDate::from_ymd_opt(2025, 12, 31).expect("date"));
        assert_eq!(serde_json::to_string(&value).expect("serialize"), "\"2025-12-31\"");
        assert_eq!(serde_json::to_string(&FieldValue::Empty).expect("serialize"), "null");
    }
}
