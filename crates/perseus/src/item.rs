//! Assessment items as they arrive from the authoring store.

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A single question attached to an exercise.
///
/// `item_type` is kept as the raw string the authoring store holds; it is
/// resolved into [`ItemType`] when the item is rendered so that an unknown
/// type only fails the item that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentItem {
    pub assessment_id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub hints: Vec<Hint>,
    #[serde(default)]
    pub raw_data: String,
    #[serde(default)]
    pub randomize: bool,
    /// Position within the exercise.
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub files: Vec<ItemFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: AnswerValue,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub order: Option<OrderKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    pub hint: String,
    #[serde(default)]
    pub order: Option<OrderKey>,
}

/// Answer payload. Numeric answers survive as numbers so that `0` is never
/// mistaken for an empty answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(Number),
    Text(String),
}
impl AnswerValue {
    /// Blank text is empty; every number, zero included, is not.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}
impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

/// Sort key carried by answers and hints. Legacy data mixes numbers and
/// strings, so two keys are only comparable when they are the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderKey {
    Number(Number),
    Text(String),
}
impl OrderKey {
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}
impl From<i64> for OrderKey {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

/// Image attached to an item rather than referenced from its markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFile {
    pub checksum: String,
    pub file_format: String,
    pub preset: ItemFilePreset,
    #[serde(default)]
    pub original_filename: String,
}
impl ItemFile {
    /// Name of the blob in content storage.
    pub fn storage_filename(&self) -> String {
        format!("{}.{}", self.checksum, self.file_format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFilePreset {
    ExerciseImage,
    ExerciseGraphie,
    #[serde(other)]
    Other,
}

/// Renderable assessment item types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    MultipleSelection,
    /// Also covers legacy `true_false` items.
    SingleSelection,
    InputQuestion,
    PerseusQuestion,
}
impl ItemType {
    pub const ALL: [ItemType; 4] = [
        Self::MultipleSelection,
        Self::SingleSelection,
        Self::InputQuestion,
        Self::PerseusQuestion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleSelection => "multiple_selection",
            Self::SingleSelection => "single_selection",
            Self::InputQuestion => "input_question",
            Self::PerseusQuestion => "perseus_question",
        }
    }

    /// Embedded template used to render items of this type.
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::MultipleSelection => "perseus/multiple_selection.json",
            Self::SingleSelection => "perseus/single_selection.json",
            Self::InputQuestion => "perseus/input_question.json",
            Self::PerseusQuestion => "perseus/perseus_question.json",
        }
    }

    /// Widget the question text must reference, if any.
    pub(crate) fn widget_marker(&self) -> Option<&'static str> {
        match self {
            Self::MultipleSelection | Self::SingleSelection => Some("\n\n[[☃ radio 1]]"),
            Self::InputQuestion => Some("\n\n[[☃ numeric-input 1]]"),
            Self::PerseusQuestion => None,
        }
    }

    /// Mapping value recorded in `exercise.json`. Unknown types pass through
    /// untouched; only `true_false` is folded into single selection.
    pub fn mapping_name(raw: &str) -> &str {
        match raw {
            "true_false" => Self::SingleSelection.as_str(),
            other => other,
        }
    }
}
impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_selection" => Ok(Self::MultipleSelection),
            "single_selection" | "true_false" => Ok(Self::SingleSelection),
            "input_question" => Ok(Self::InputQuestion),
            "perseus_question" => Ok(Self::PerseusQuestion),
            other => exn::bail!(ErrorKind::UnsupportedItemType(other.to_string())),
        }
    }
}
impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Items in exercise order. The sort is stable, so items sharing an order
/// keep the sequence the store returned them in.
pub fn ordered(items: &[AssessmentItem]) -> Vec<&AssessmentItem> {
    let mut ordered: Vec<&AssessmentItem> = items.iter().collect();
    ordered.sort_by_key(|item| item.order);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("multiple_selection", ItemType::MultipleSelection)]
    #[case("single_selection", ItemType::SingleSelection)]
    #[case("true_false", ItemType::SingleSelection)]
    #[case("input_question", ItemType::InputQuestion)]
    #[case("perseus_question", ItemType::PerseusQuestion)]
    fn test_item_type_parsing(#[case] raw: &str, #[case] expected: ItemType) {
        assert_eq!(raw.parse::<ItemType>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_item_type_is_rejected() {
        let err = "free_response".parse::<ItemType>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedItemType(t) if t == "free_response"));
    }

    #[test]
    fn test_mapping_name_folds_true_false_only() {
        assert_eq!(ItemType::mapping_name("true_false"), "single_selection");
        assert_eq!(ItemType::mapping_name("input_question"), "input_question");
        assert_eq!(ItemType::mapping_name("free_response"), "free_response");
    }

    #[test]
    fn test_answer_values_deserialize_untagged() {
        let answers: Vec<Answer> = serde_json::from_str(
            r#"[{"answer": 0, "correct": true}, {"answer": "", "correct": false, "order": "b"}]"#,
        )
        .unwrap();
        assert_eq!(answers[0].answer, AnswerValue::from(0i64));
        assert!(!answers[0].answer.is_empty());
        assert!(answers[1].answer.is_empty());
        assert_eq!(answers[1].order, Some(OrderKey::Text("b".to_string())));
    }

    #[test]
    fn test_order_keys_of_different_kinds_are_incomparable() {
        let number = OrderKey::from(1i64);
        let text = OrderKey::Text("1".to_string());
        assert_eq!(number.compare(&OrderKey::from(2i64)), Some(Ordering::Less));
        assert_eq!(number.compare(&text), None);
    }

    #[test]
    fn test_unknown_file_preset_is_other() {
        let file: ItemFile =
            serde_json::from_str(r#"{"checksum": "ab", "file_format": "png", "preset": "document"}"#).unwrap();
        assert_eq!(file.preset, ItemFilePreset::Other);
        assert_eq!(file.storage_filename(), "ab.png");
    }
}
