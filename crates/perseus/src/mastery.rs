//! Mastery model resolution.
//!
//! Exercises authored before the m-of-n model existed carry a legacy mastery
//! type. Every legacy type is expressible as "get `m` of the last `n`
//! attempts correct", which is what the player understands.

use crate::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

/// Default window size for `m_of_n` when the author set none.
const DEFAULT_WINDOW: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LegacyMasteryType {
    #[default]
    MOfN,
    DoAll,
    Streak2,
    Streak3,
    Streak5,
    Streak10,
}
impl LegacyMasteryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MOfN => "m_of_n",
            Self::DoAll => "do_all",
            Self::Streak2 => "num_correct_in_a_row_2",
            Self::Streak3 => "num_correct_in_a_row_3",
            Self::Streak5 => "num_correct_in_a_row_5",
            Self::Streak10 => "num_correct_in_a_row_10",
        }
    }

    fn streak(&self) -> Option<u32> {
        match self {
            Self::Streak2 => Some(2),
            Self::Streak3 => Some(3),
            Self::Streak5 => Some(5),
            Self::Streak10 => Some(10),
            Self::MOfN | Self::DoAll => None,
        }
    }
}
impl FromStr for LegacyMasteryType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "m_of_n" => Self::MOfN,
            "do_all" => Self::DoAll,
            "num_correct_in_a_row_2" => Self::Streak2,
            "num_correct_in_a_row_3" => Self::Streak3,
            "num_correct_in_a_row_5" => Self::Streak5,
            "num_correct_in_a_row_10" => Self::Streak10,
            other => exn::bail!(ErrorKind::UnknownMasteryModel(other.to_string())),
        })
    }
}
impl fmt::Display for LegacyMasteryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl Serialize for LegacyMasteryType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
impl<'de> Deserialize<'de> for LegacyMasteryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| serde::de::Error::custom(format!("unknown mastery model: {raw}")))
    }
}

/// A mastery model normalized to m-of-n.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasteryModel {
    pub legacy: LegacyMasteryType,
    pub n: u32,
    pub m: u32,
}
impl MasteryModel {
    /// The only model type the player receives.
    pub const TYPE: &'static str = "m_of_n";

    /// Resolve `(n, m)` for an exercise with `item_count` items.
    ///
    /// - `m_of_n`: explicit values win when positive, otherwise
    ///   `min(5, item_count)`, never less than 1.
    /// - `do_all`: `n = m = item_count`.
    /// - streak types: `n = m = K`.
    pub fn resolve(
        legacy: Option<LegacyMasteryType>,
        item_count: usize,
        n: Option<u32>,
        m: Option<u32>,
    ) -> Result<Self> {
        let legacy = legacy.unwrap_or_default();
        let count = u32::try_from(item_count).unwrap_or(u32::MAX);
        let (n, m) = match legacy {
            LegacyMasteryType::MOfN => {
                let fallback = count.min(DEFAULT_WINDOW).max(1);
                let n = n.filter(|n| *n > 0).unwrap_or(fallback);
                let m = m.filter(|m| *m > 0).unwrap_or(fallback);
                (n, m)
            },
            LegacyMasteryType::DoAll => {
                // A do_all exercise without items can never be mastered.
                if count == 0 {
                    exn::bail!(ErrorKind::EmptyExercise);
                }
                (count, count)
            },
            streak => {
                let k = streak.streak().unwrap_or(DEFAULT_WINDOW);
                (k, k)
            },
        };
        Ok(Self { legacy, n, m })
    }

    /// Shape stored on `AssessmentMetaData.mastery_model`.
    pub fn to_metadata_json(&self) -> Value {
        json!({
            "type": self.legacy.as_str(),
            "n": self.n,
            "m": self.m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::window_capped(LegacyMasteryType::MOfN, 7, None, None, 5, 5)]
    #[case::window_shrinks(LegacyMasteryType::MOfN, 3, None, None, 3, 3)]
    #[case::explicit_wins(LegacyMasteryType::MOfN, 0, Some(2), Some(2), 2, 2)]
    #[case::zero_is_unset(LegacyMasteryType::MOfN, 8, Some(0), Some(3), 5, 3)]
    #[case::never_zero(LegacyMasteryType::MOfN, 0, None, None, 1, 1)]
    #[case::do_all(LegacyMasteryType::DoAll, 4, Some(2), None, 4, 4)]
    #[case::streak_2(LegacyMasteryType::Streak2, 9, None, None, 2, 2)]
    #[case::streak_3(LegacyMasteryType::Streak3, 1, None, None, 3, 3)]
    #[case::streak_5(LegacyMasteryType::Streak5, 1, None, None, 5, 5)]
    #[case::streak_10(LegacyMasteryType::Streak10, 1, Some(1), Some(1), 10, 10)]
    fn test_resolve(
        #[case] legacy: LegacyMasteryType,
        #[case] count: usize,
        #[case] n: Option<u32>,
        #[case] m: Option<u32>,
        #[case] expected_n: u32,
        #[case] expected_m: u32,
    ) {
        let model = MasteryModel::resolve(Some(legacy), count, n, m).unwrap();
        assert_eq!((model.n, model.m), (expected_n, expected_m));
        assert_eq!(model.legacy, legacy);
    }

    #[test]
    fn test_missing_legacy_type_defaults_to_m_of_n() {
        let model = MasteryModel::resolve(None, 7, None, None).unwrap();
        assert_eq!(model.legacy, LegacyMasteryType::MOfN);
        assert_eq!((model.n, model.m), (5, 5));
    }

    #[test]
    fn test_do_all_without_items_fails() {
        let err = MasteryModel::resolve(Some(LegacyMasteryType::DoAll), 0, None, None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::EmptyExercise));
    }

    #[test]
    fn test_metadata_json_keeps_legacy_tag() {
        let model = MasteryModel::resolve(Some(LegacyMasteryType::Streak3), 10, None, None).unwrap();
        assert_eq!(
            model.to_metadata_json(),
            json!({"type": "num_correct_in_a_row_3", "n": 3, "m": 3})
        );
    }

    #[test]
    fn test_legacy_type_round_trips_through_strings() {
        for legacy in ["m_of_n", "do_all", "num_correct_in_a_row_10"] {
            assert_eq!(legacy.parse::<LegacyMasteryType>().unwrap().as_str(), legacy);
        }
        assert!("num_correct_in_a_row_4".parse::<LegacyMasteryType>().is_err());
    }
}
