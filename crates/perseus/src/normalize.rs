//! Assessment item normalization.
//!
//! Authored markdown references images through the content storage
//! placeholder and wraps block formulas in double dollars. The player expects
//! images relative to the archive and single-dollar formulas, so every piece
//! of item text passes through here before rendering.
//!
//! Normalization is pure: images that need to be copied into the archive
//! are returned as [`EmbeddedImage`] requests rather than fetched here.

use crate::consts::{
    CONTENT_STORAGE_PLACEHOLDER, DECIMAL_REGEX, FORMULA_REGEX, FRACTION_REGEX, IMAGE_PATH_REGEX, INTEGER_REGEX,
    MARKDOWN_IMAGE_REGEX, MIXED_NUMBER_REGEX, PERSEUS_IMG_DIR, THOUSANDS_REGEX,
};
use crate::item::{Answer, AnswerValue, Hint, ItemType, OrderKey};
use serde::Serialize;
use serde_json::Number;
use std::cmp::Ordering;

/// Rendered size of an image, keyed by its rewritten path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSize {
    pub name: String,
    pub width: f64,
    pub height: f64,
}

/// An image referenced from item text that must be copied into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// Entry name inside the archive, `images/<checksum>.<ext>`.
    pub archive_name: String,
    pub checksum: String,
    /// Filename as referenced, used to locate the blob in content storage.
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedText {
    pub text: String,
    pub images: Vec<ImageSize>,
    pub embeds: Vec<EmbeddedImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnswer {
    pub answer: AnswerValue,
    pub correct: bool,
    pub images: Vec<ImageSize>,
    pub order: Option<OrderKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedHint {
    pub hint: String,
    pub images: Vec<ImageSize>,
    pub order: Option<OrderKey>,
}

/// Collapse `$$formula$$` into `$formula$`.
pub fn process_formulas(content: &str) -> String {
    FORMULA_REGEX.replace_all(content, "$1").into_owned()
}

/// Rewrite image references to the archive-local directory, strip size
/// suffixes and report both the sizes and the images to embed.
pub fn process_image_strings(content: &str) -> NormalizedText {
    let mut text = content.replace(CONTENT_STORAGE_PLACEHOLDER, PERSEUS_IMG_DIR);
    let targets: Vec<String> = MARKDOWN_IMAGE_REGEX
        .captures_iter(&text)
        .filter_map(|captures| captures.get(1))
        .map(|target| target.as_str().to_string())
        .collect();

    let mut images = Vec::new();
    let mut embeds = Vec::new();
    for target in targets {
        let Some(captures) = IMAGE_PATH_REGEX.captures(&target) else {
            continue;
        };
        let Some(path) = captures.get(1).map(|m| m.as_str().to_string()) else {
            continue;
        };
        let filename = path.rsplit('/').next().unwrap_or(&path).to_string();
        let (checksum, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext)),
            _ => (filename.clone(), None),
        };
        let archive_name = match ext {
            Some(ext) => format!("images/{checksum}.{ext}"),
            None => format!("images/{checksum}"),
        };
        embeds.push(EmbeddedImage { archive_name, checksum, filename: filename.clone() });

        if let (Some(width), Some(height)) = (captures.get(2), captures.get(3)) {
            match (width.as_str().parse::<f64>(), height.as_str().parse::<f64>()) {
                (Ok(width), Ok(height)) => images.push(ImageSize { name: path.clone(), width, height }),
                _ => tracing::warn!(image = %path, "Ignoring unparseable image dimensions"),
            }
        }
        text = text.replace(&target, &path);
    }
    NormalizedText { text, images, embeds }
}

/// Formulas first, then images.
pub fn normalize_text(content: &str) -> NormalizedText {
    process_image_strings(&process_formulas(content))
}

/// Normalize every answer, drop the empty ones and sort by order when
/// possible. Embed requests are returned in answer order.
pub fn normalize_answers(item_type: ItemType, answers: &[Answer]) -> (Vec<NormalizedAnswer>, Vec<EmbeddedImage>) {
    let mut embeds = Vec::new();
    let mut normalized = Vec::with_capacity(answers.len());
    for answer in answers {
        let (value, images) = match (&answer.answer, item_type) {
            (AnswerValue::Text(text), ItemType::InputQuestion) => match extract_value(text) {
                Some(number) => (AnswerValue::Number(number), vec![]),
                None => {
                    if !text.trim().is_empty() {
                        tracing::warn!(answer = %text, "Dropping input answer that is not a number");
                    }
                    (AnswerValue::Text(String::new()), vec![])
                },
            },
            (AnswerValue::Text(text), _) => {
                let processed = normalize_text(text);
                embeds.extend(processed.embeds);
                (AnswerValue::Text(processed.text), processed.images)
            },
            (number @ AnswerValue::Number(_), _) => (number.clone(), vec![]),
        };
        if value.is_empty() {
            continue;
        }
        normalized.push(NormalizedAnswer {
            answer: value,
            correct: answer.correct,
            images,
            order: answer.order.clone(),
        });
    }
    (sort_by_order(normalized, |a| a.order.as_ref(), "answers"), embeds)
}

pub fn normalize_hints(hints: &[Hint]) -> (Vec<NormalizedHint>, Vec<EmbeddedImage>) {
    let mut embeds = Vec::new();
    let normalized = hints
        .iter()
        .map(|hint| {
            let processed = normalize_text(&hint.hint);
            embeds.extend(processed.embeds);
            NormalizedHint { hint: processed.text, images: processed.images, order: hint.order.clone() }
        })
        .collect();
    (sort_by_order(normalized, |h| h.order.as_ref(), "hints"), embeds)
}

/// Sort by order key when every entry has one and all keys are mutually
/// comparable. Otherwise the original order is kept and a warning logged.
pub fn sort_by_order<T>(mut entries: Vec<T>, key: impl Fn(&T) -> Option<&OrderKey>, what: &str) -> Vec<T> {
    if entries.len() < 2 {
        return entries;
    }
    let comparable = match entries.first().and_then(&key) {
        Some(first) => entries.iter().all(|entry| key(entry).is_some_and(|k| k.compare(first).is_some())),
        None => false,
    };
    if !comparable {
        tracing::warn!(entries = entries.len(), "Could not sort {what} by order; keeping authored order");
        return entries;
    }
    entries.sort_by(|a, b| match (key(a), key(b)) {
        (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    });
    entries
}

/// Reduce free-form numeric input to a number.
///
/// Accepts integers, decimals, exponents, thousands separators, fractions
/// and mixed numbers (`1 1/2`). Returns `None` for anything else.
///
/// ```
/// use studio_perseus::normalize::extract_value;
/// assert_eq!(extract_value("1,000").unwrap().as_i64(), Some(1000));
/// assert_eq!(extract_value("3/4").unwrap().as_f64(), Some(0.75));
/// assert_eq!(extract_value("-1 1/2").unwrap().as_f64(), Some(-1.5));
/// assert!(extract_value("twelve").is_none());
/// ```
pub fn extract_value(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if INTEGER_REGEX.is_match(text) {
        if let Ok(int) = text.parse::<i64>() {
            return Some(int.into());
        }
    }
    let value = if THOUSANDS_REGEX.is_match(text) {
        text.replace(',', "").parse::<f64>().ok()?
    } else if DECIMAL_REGEX.is_match(text) {
        text.parse::<f64>().ok()?
    } else if let Some(captures) = FRACTION_REGEX.captures(text) {
        let numerator: f64 = captures[1].parse().ok()?;
        let denominator: f64 = captures[2].parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        numerator / denominator
    } else if let Some(captures) = MIXED_NUMBER_REGEX.captures(text) {
        let sign = if &captures[1] == "-" { -1.0 } else { 1.0 };
        let whole: f64 = captures[2].parse().ok()?;
        let numerator: f64 = captures[3].parse().ok()?;
        let denominator: f64 = captures[4].parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        sign * (whole + numerator / denominator)
    } else {
        return None;
    };
    to_number(value)
}

/// Integral values within the exactly-representable range become integers.
fn to_number(value: f64) -> Option<Number> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT {
        return Some((value as i64).into());
    }
    Number::from_f64(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn answer(value: impl Into<AnswerValue>, order: Option<i64>) -> Answer {
        Answer { answer: value.into(), correct: false, order: order.map(OrderKey::from) }
    }

    #[test]
    fn test_formulas_collapse() {
        assert_eq!(process_formulas("Solve $$x^2$$ now"), "Solve $x^2$ now");
        assert_eq!(process_formulas("no formula $here$"), "no formula $here$");
    }

    #[test]
    fn test_image_with_size_is_rewritten() {
        let content = "See ![graph](${☣ CONTENTSTORAGE}/abc123.png =100x50) here";
        let result = process_image_strings(content);
        assert_eq!(result.text, "See ![graph](${☣ LOCALPATH}/images/abc123.png) here");
        assert_eq!(
            result.images,
            vec![ImageSize { name: "${☣ LOCALPATH}/images/abc123.png".into(), width: 100.0, height: 50.0 }]
        );
        assert_eq!(
            result.embeds,
            vec![EmbeddedImage {
                archive_name: "images/abc123.png".into(),
                checksum: "abc123".into(),
                filename: "abc123.png".into(),
            }]
        );
    }

    #[test]
    fn test_image_without_size_is_embedded_without_dimensions() {
        let result = process_image_strings("![](${☣ CONTENTSTORAGE}/def456.svg)");
        assert_eq!(result.text, "![](${☣ LOCALPATH}/images/def456.svg)");
        assert!(result.images.is_empty());
        assert_eq!(result.embeds.len(), 1);
        assert_eq!(result.embeds[0].archive_name, "images/def456.svg");
    }

    #[test]
    fn test_external_images_are_left_alone() {
        let content = "![cat](https://example.com/cat.png)";
        let result = process_image_strings(content);
        assert_eq!(result.text, content);
        assert!(result.embeds.is_empty());
    }

    #[test]
    fn test_empty_answers_are_dropped_but_zero_is_kept() {
        let answers = vec![answer("", None), answer(0i64, None), answer("", None), answer("x", None)];
        let (normalized, _) = normalize_answers(ItemType::MultipleSelection, &answers);
        let values: Vec<AnswerValue> = normalized.into_iter().map(|a| a.answer).collect();
        assert_eq!(values, vec![AnswerValue::from(0i64), AnswerValue::from("x")]);
    }

    #[test]
    fn test_input_answers_become_numbers() {
        let answers = vec![answer("1,500", Some(1)), answer("not a number", Some(2)), answer("0", Some(3))];
        let (normalized, _) = normalize_answers(ItemType::InputQuestion, &answers);
        let values: Vec<AnswerValue> = normalized.into_iter().map(|a| a.answer).collect();
        assert_eq!(values, vec![AnswerValue::from(1500i64), AnswerValue::from(0i64)]);
    }

    #[test]
    fn test_answers_are_sorted_by_order() {
        let answers = vec![answer("c", Some(3)), answer("a", Some(1)), answer("b", Some(2))];
        let (normalized, _) = normalize_answers(ItemType::SingleSelection, &answers);
        let values: Vec<AnswerValue> = normalized.into_iter().map(|a| a.answer).collect();
        assert_eq!(values, vec!["a".into(), "b".into(), "c".into()]);
    }

    #[test]
    fn test_answer_images_are_collected() {
        let answers = vec![answer("![](${☣ CONTENTSTORAGE}/aa11.png =1x2)", None)];
        let (normalized, embeds) = normalize_answers(ItemType::MultipleSelection, &answers);
        assert_eq!(normalized[0].images.len(), 1);
        assert_eq!(embeds[0].archive_name, "images/aa11.png");
    }

    #[rstest]
    #[case::missing_key(vec![Some(OrderKey::from(2i64)), None])]
    #[case::mixed_kinds(vec![Some(OrderKey::from(2i64)), Some(OrderKey::Text("1".into()))])]
    #[case::all_missing(vec![None, None])]
    fn test_unsortable_hints_keep_authored_order(#[case] orders: Vec<Option<OrderKey>>) {
        let hints: Vec<Hint> = orders
            .into_iter()
            .enumerate()
            .map(|(i, order)| Hint { hint: format!("hint {i}"), order })
            .collect();
        let (normalized, _) = normalize_hints(&hints);
        let texts: Vec<&str> = normalized.iter().map(|h| h.hint.as_str()).collect();
        assert_eq!(texts, vec!["hint 0", "hint 1"]);
    }

    #[test]
    fn test_hints_sort_when_keys_agree() {
        let hints = vec![
            Hint { hint: "second $$y$$".into(), order: Some(OrderKey::from(2i64)) },
            Hint { hint: "first".into(), order: Some(OrderKey::from(1i64)) },
        ];
        let (normalized, _) = normalize_hints(&hints);
        assert_eq!(normalized[0].hint, "first");
        assert_eq!(normalized[1].hint, "second $y$");
    }

    #[rstest]
    #[case("42", Some(42.0))]
    #[case(" -7 ", Some(-7.0))]
    #[case("3.25", Some(3.25))]
    #[case(".5", Some(0.5))]
    #[case("1e3", Some(1000.0))]
    #[case("12,345.5", Some(12345.5))]
    #[case("1/4", Some(0.25))]
    #[case("2 1/2", Some(2.5))]
    #[case("1/0", None)]
    #[case("1,23", None)]
    #[case("abc", None)]
    #[case("", None)]
    fn test_extract_value(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(extract_value(input).and_then(|n| n.as_f64()), expected);
    }

    #[test]
    fn test_integral_values_become_integers() {
        assert!(extract_value("5.0").unwrap().is_i64());
        assert!(extract_value("5.5").unwrap().is_f64());
    }
}
