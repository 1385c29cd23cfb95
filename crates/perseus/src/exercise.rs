//! Exercise-level settings and the `exercise.json` document.

use crate::error::{ErrorKind, Result};
use crate::item::{AssessmentItem, ItemType, ordered};
use crate::mastery::{LegacyMasteryType, MasteryModel};
use exn::ResultExt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Mastery and randomization settings authored on an exercise node.
///
/// Unrecognised keys are kept in `extra` and copied into `exercise.json`
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSettings {
    #[serde(default, deserialize_with = "lenient::mastery_model", skip_serializing_if = "Option::is_none")]
    pub mastery_model: Option<LegacyMasteryType>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub m: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub randomize: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Everything derived from an exercise's settings and items.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseConfig {
    pub mastery: MasteryModel,
    pub randomize: bool,
    /// Assessment ids in exercise order.
    pub assessment_ids: Vec<String>,
    pub assessment_mapping: BTreeMap<String, String>,
    pub extra: Map<String, Value>,
}
impl ExerciseConfig {
    pub fn derive(settings: &ExerciseSettings, items: &[AssessmentItem]) -> Result<Self> {
        let items = ordered(items);
        let mastery = MasteryModel::resolve(settings.mastery_model, items.len(), settings.n, settings.m)?;
        let assessment_ids = items.iter().map(|item| item.assessment_id.clone()).collect();
        let assessment_mapping = items
            .iter()
            .map(|item| (item.assessment_id.clone(), ItemType::mapping_name(&item.item_type).to_string()))
            .collect();
        Ok(Self {
            mastery,
            randomize: settings.randomize.unwrap_or(true),
            assessment_ids,
            assessment_mapping,
            extra: settings.extra.clone(),
        })
    }

    /// The `exercise.json` document. Derived keys win over authored extras.
    pub fn to_document(&self) -> BTreeMap<String, Value> {
        let mut document: BTreeMap<String, Value> =
            self.extra.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        document.insert("mastery_model".into(), MasteryModel::TYPE.into());
        document.insert("legacy_mastery_model".into(), self.mastery.legacy.as_str().into());
        document.insert("randomize".into(), self.randomize.into());
        document.insert("n".into(), self.mastery.n.into());
        document.insert("m".into(), self.mastery.m.into());
        document.insert("all_assessment_items".into(), self.assessment_ids.clone().into());
        document.insert(
            "assessment_mapping".into(),
            Value::Object(self.assessment_mapping.iter().map(|(k, v)| (k.clone(), v.clone().into())).collect()),
        );
        document
    }

    /// `exercise.json` with sorted keys and four-space indentation.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        self.to_document()
            .serialize(&mut serializer)
            .or_raise(|| ErrorKind::Serialize("exercise.json"))?;
        String::from_utf8(buffer).or_raise(|| ErrorKind::Serialize("exercise.json"))
    }
}

/// Legacy exercises store counts as strings and blank mastery models.
mod lenient {
    use super::*;
    use serde::de::Error;

    pub(super) fn mastery_model<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<LegacyMasteryType>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| D::Error::custom(format!("unknown mastery model: {raw}"))),
        }
    }

    pub(super) fn count<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u32>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(n) => u32::try_from(n).map(Some).map_err(D::Error::custom),
                None => Err(D::Error::custom(format!("expected a non-negative integer, got {n}"))),
            },
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("expected an integer, got {other}"))),
        }
    }
}
