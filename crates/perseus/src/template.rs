//! Perseus JSON templates.
//!
//! The templates are embedded into the binary with [`rust-embed`](rust_embed)
//! and rendered with [upon]. Values are inserted through the `json`
//! formatter (`{{ hints|json }}`), which writes any template value as a JSON
//! literal so the templates never have to quote or escape by hand.
//!
//! | Template                          | Context                                             |
//! |-----------------------------------|-----------------------------------------------------|
//! | `perseus/exercise.json`           | `exercise` (pre-serialized document)                |
//! | `perseus/multiple_selection.json` | `question`, `question_images`, `choices`, `hints`, `randomize` |
//! | `perseus/single_selection.json`   | as above                                            |
//! | `perseus/input_question.json`     | `question`, `question_images`, `answers`, `hints`   |
//! | `perseus/perseus_question.json`   | `raw_data`                                          |

use crate::consts::{CONTENT_STORAGE_PLACEHOLDER, PERSEUS_IMG_DIR};
use crate::error::{ErrorKind, Result};
use crate::exercise::ExerciseConfig;
use crate::item::{AnswerValue, AssessmentItem, ItemType};
use crate::normalize::{EmbeddedImage, ImageSize, normalize_answers, normalize_hints, normalize_text};
use exn::{OptionExt, ResultExt};
use rust_embed::Embed;
use serde::Serialize;
use serde_json::Number;
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;
use upon::{Engine, Template};

const EXERCISE_TEMPLATE: &str = "perseus/exercise.json";

#[derive(Embed)]
#[folder = "templates/"]
struct Builtins;
impl Builtins {
    fn load(name: &'static str) -> Result<String> {
        let data = Self::get(name).map(|f| f.data).ok_or_raise(|| ErrorKind::Template(name))?;
        String::from_utf8(data.into_owned()).or_raise(|| ErrorKind::Template(name))
    }
}

/// A rendered `<assessment-id>.json` and the images it references.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedItem {
    pub item_type: ItemType,
    pub json: String,
    pub embeds: Vec<EmbeddedImage>,
}

/// Compiled Perseus templates.
pub struct Templates {
    engine: Engine<'static>,
    exercise: Template<'static>,
    items: HashMap<ItemType, Template<'static>>,
}
impl Templates {
    /// Compile the embedded templates. Fails fast on a broken template.
    pub fn builtin() -> Result<Self> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let exercise = Self::compile(&engine, EXERCISE_TEMPLATE)?;
        let mut items = HashMap::with_capacity(ItemType::ALL.len());
        for item_type in ItemType::ALL {
            items.insert(item_type, Self::compile(&engine, item_type.template_name())?);
        }
        Ok(Self { engine, exercise, items })
    }

    fn compile(engine: &Engine<'static>, name: &'static str) -> Result<Template<'static>> {
        engine.compile(Builtins::load(name)?).or_raise(|| ErrorKind::Template(name))
    }

    pub fn render_exercise(&self, config: &ExerciseConfig) -> Result<String> {
        let context = ExerciseContext { exercise: config.to_pretty_json()? };
        self.exercise
            .render(&self.engine, &context)
            .to_string()
            .or_raise(|| ErrorKind::Template(EXERCISE_TEMPLATE))
    }

    /// Normalize an item and render it with its type's template.
    #[instrument(skip_all, fields(assessment_id = %item.assessment_id))]
    pub fn render_item(&self, item: &AssessmentItem) -> Result<RenderedItem> {
        let item_type: ItemType = item.item_type.parse()?;
        let (context, embeds) = ItemContext::build(item_type, item);
        let template = self.items.get(&item_type).ok_or_raise(|| ErrorKind::Template(item_type.template_name()))?;
        let json = template
            .render(&self.engine, &context)
            .to_string()
            .or_raise(|| ErrorKind::Template(item_type.template_name()))?;
        Ok(RenderedItem { item_type, json, embeds })
    }
}

#[derive(Serialize)]
struct ExerciseContext {
    exercise: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct Dimensions {
    width: f64,
    height: f64,
}

#[derive(Debug, Serialize)]
struct Choice {
    content: String,
    correct: bool,
    images: BTreeMap<String, Dimensions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NumericAnswer {
    max_error: Option<f64>,
    message: &'static str,
    simplify: &'static str,
    status: &'static str,
    strict: bool,
    value: Number,
}

#[derive(Debug, Serialize)]
struct HintContext {
    content: String,
    images: BTreeMap<String, Dimensions>,
    replace: bool,
}

#[derive(Debug, Serialize)]
struct ItemContext {
    question: String,
    question_images: BTreeMap<String, Dimensions>,
    choices: Vec<Choice>,
    answers: Vec<NumericAnswer>,
    hints: Vec<HintContext>,
    randomize: bool,
    raw_data: String,
}
impl ItemContext {
    /// Embeds are ordered question, answers, hints.
    fn build(item_type: ItemType, item: &AssessmentItem) -> (Self, Vec<EmbeddedImage>) {
        let question = normalize_text(&item.question);
        let (answers, answer_embeds) = normalize_answers(item_type, &item.answers);
        let (hints, hint_embeds) = normalize_hints(&item.hints);

        let mut embeds = question.embeds;
        embeds.extend(answer_embeds);
        embeds.extend(hint_embeds);

        let mut question_text = question.text;
        if let Some(marker) = item_type.widget_marker() {
            question_text.push_str(marker);
        }

        let (choices, numeric) = match item_type {
            ItemType::InputQuestion => (
                vec![],
                answers
                    .into_iter()
                    .filter_map(|answer| match answer.answer {
                        AnswerValue::Number(value) => Some(NumericAnswer {
                            max_error: None,
                            message: "",
                            simplify: "required",
                            status: if answer.correct { "correct" } else { "wrong" },
                            strict: false,
                            value,
                        }),
                        AnswerValue::Text(_) => None,
                    })
                    .collect(),
            ),
            _ => (
                answers
                    .into_iter()
                    .map(|answer| Choice {
                        content: match answer.answer {
                            AnswerValue::Text(text) => text,
                            AnswerValue::Number(number) => number.to_string(),
                        },
                        correct: answer.correct,
                        images: image_map(answer.images),
                    })
                    .collect(),
                vec![],
            ),
        };

        let context = Self {
            question: question_text,
            question_images: image_map(question.images),
            choices,
            answers: numeric,
            hints: hints
                .into_iter()
                .map(|hint| HintContext { content: hint.hint, images: image_map(hint.images), replace: false })
                .collect(),
            randomize: item.randomize,
            raw_data: item.raw_data.replace(CONTENT_STORAGE_PLACEHOLDER, PERSEUS_IMG_DIR),
        };
        (context, embeds)
    }
}

fn image_map(images: Vec<ImageSize>) -> BTreeMap<String, Dimensions> {
    images
        .into_iter()
        .map(|image| (image.name, Dimensions { width: image.width, height: image.height }))
        .collect()
}

/// Custom [`upon`] extensions for emitting JSON.
mod addons {
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    fn to_json(value: &Value) -> serde_json::Value {
        match value {
            Value::None => serde_json::Value::Null,
            Value::Bool(b) => (*b).into(),
            Value::Integer(i) => (*i).into(),
            Value::Float(f) => serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => s.as_str().into(),
            Value::List(list) => list.iter().map(to_json).collect(),
            Value::Map(map) => serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), to_json(v))).collect()),
            #[allow(unreachable_patterns)]
            _ => serde_json::Value::Null,
        }
    }

    /// Writes the value as a JSON literal.
    fn json_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        write!(f, "{}", to_json(value))?;
        Ok(())
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("json", json_formatter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::ExerciseSettings;
    use crate::item::{Answer, Hint, OrderKey};
    use serde_json::{Value, json};

    fn item(item_type: &str) -> AssessmentItem {
        AssessmentItem {
            assessment_id: "q1".to_string(),
            item_type: item_type.to_string(),
            question: "What is $$1+1$$? ![](${☣ CONTENTSTORAGE}/aa11.png =10x20)".to_string(),
            answers: vec![
                Answer { answer: "2".into(), correct: true, order: Some(OrderKey::from(2i64)) },
                Answer { answer: "".into(), correct: false, order: Some(OrderKey::from(1i64)) },
                Answer { answer: "3".into(), correct: false, order: Some(OrderKey::from(3i64)) },
            ],
            hints: vec![Hint { hint: "Count \"fingers\"".to_string(), order: None }],
            raw_data: String::new(),
            randomize: true,
            order: 0,
            files: vec![],
        }
    }

    #[test]
    fn test_all_builtins_compile() {
        assert!(Templates::builtin().is_ok());
    }

    #[test]
    fn test_render_multiple_selection() {
        let templates = Templates::builtin().unwrap();
        let rendered = templates.render_item(&item("multiple_selection")).unwrap();
        let parsed: Value = serde_json::from_str(&rendered.json).unwrap();
        let widget = &parsed["question"]["widgets"]["radio 1"];
        assert_eq!(widget["options"]["multipleSelect"], true);
        assert_eq!(widget["options"]["randomize"], true);
        assert_eq!(
            widget["options"]["choices"],
            json!([
                {"content": "2", "correct": true, "images": {}},
                {"content": "3", "correct": false, "images": {}},
            ])
        );
        assert_eq!(
            parsed["question"]["content"],
            "What is $1+1$? ![](${☣ LOCALPATH}/images/aa11.png)\n\n[[☃ radio 1]]"
        );
        assert_eq!(
            parsed["question"]["images"]["${☣ LOCALPATH}/images/aa11.png"],
            json!({"width": 10.0, "height": 20.0})
        );
        assert_eq!(parsed["hints"], json!([{"content": "Count \"fingers\"", "images": {}, "replace": false}]));
        assert_eq!(rendered.embeds.len(), 1);
    }

    #[test]
    fn test_true_false_renders_single_selection() {
        let templates = Templates::builtin().unwrap();
        let rendered = templates.render_item(&item("true_false")).unwrap();
        assert_eq!(rendered.item_type, ItemType::SingleSelection);
        let parsed: Value = serde_json::from_str(&rendered.json).unwrap();
        assert_eq!(parsed["question"]["widgets"]["radio 1"]["options"]["multipleSelect"], false);
    }

    #[test]
    fn test_render_input_question() {
        let templates = Templates::builtin().unwrap();
        let rendered = templates.render_item(&item("input_question")).unwrap();
        let parsed: Value = serde_json::from_str(&rendered.json).unwrap();
        let answers = &parsed["question"]["widgets"]["numeric-input 1"]["options"]["answers"];
        assert_eq!(answers.as_array().unwrap().len(), 2);
        assert_eq!(answers[0]["value"], 2);
        assert_eq!(answers[0]["status"], "correct");
        assert_eq!(answers[0]["maxError"], Value::Null);
        assert!(parsed["question"]["content"].as_str().unwrap().ends_with("[[☃ numeric-input 1]]"));
    }

    #[test]
    fn test_perseus_question_passes_raw_data_through() {
        let templates = Templates::builtin().unwrap();
        let mut item = item("perseus_question");
        item.raw_data = r#"{"question": {"content": "![](${☣ CONTENTSTORAGE}/bb.png)"}}"#.to_string();
        let rendered = templates.render_item(&item).unwrap();
        assert_eq!(rendered.json, r#"{"question": {"content": "![](${☣ LOCALPATH}/images/bb.png)"}}"#);
    }

    #[test]
    fn test_unsupported_type_fails() {
        let templates = Templates::builtin().unwrap();
        let err = templates.render_item(&item("free_response")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedItemType(_)));
    }

    #[test]
    fn test_render_exercise() {
        let templates = Templates::builtin().unwrap();
        let config = ExerciseConfig::derive(&ExerciseSettings::default(), &[item("input_question")]).unwrap();
        let rendered = templates.render_exercise(&config).unwrap();
        assert_eq!(rendered, config.to_pretty_json().unwrap());
    }
}
