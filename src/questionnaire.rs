//! Patient questionnaire
//!
//! The fixed question set the deployed model was trained on, a typed form that
//! produces [`RawAnswers`], and answer validation against each question's
//! vocabulary and practical range.

use serde::{Deserialize, Serialize};

use crate::error::CdssError;
use crate::types::{RawAnswers, RawValue};

pub const AGE: &str = "Age (yrs)";
pub const WEIGHT: &str = "Weight (Kg)";
pub const HEIGHT: &str = "Height(Cm)";
pub const PIMPLES: &str = "Pimples(Y/N)";
pub const HAIR_LOSS: &str = "Hair loss(Y/N)";
pub const HAIR_GROWTH: &str = "hair growth(Y/N)";
pub const SKIN_DARKENING: &str = "Skin darkening (Y/N)";
pub const CYCLE: &str = "Cycle(R/I)";
pub const FAST_FOOD: &str = "Fast_Food_Intake";
pub const STRESS: &str = "Stress_Level";
pub const SLEEP: &str = "Sleep_Quality";
pub const SUGAR: &str = "Sugar_Intake";
pub const FAMILY_HISTORY: &str = "Family_History_PCOS";

/// Shape of the answer a question accepts
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerKind {
    /// Whole number within [min, max]
    Integer { min: i64, max: i64 },
    /// Real-valued measurement within [min, max]
    Measurement { min: f64, max: f64 },
    /// "Yes" / "No" (or the 1 / 0 code)
    YesNo,
    /// "Regular" / "Irregular" (or the 0 / 1 code)
    Regularity,
    /// Integer code 0..=max
    Code { max: i64 },
}

/// A single question on the form
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Question {
    /// Feature name the answer feeds
    pub key: &'static str,
    /// Label shown to the user
    pub label: &'static str,
    pub kind: AnswerKind,
}

/// The fixed question set, in form order
pub static QUESTIONS: [Question; 13] = [
    Question { key: AGE, label: "Age (yrs)", kind: AnswerKind::Integer { min: 12, max: 55 } },
    Question { key: WEIGHT, label: "Weight (Kg)", kind: AnswerKind::Measurement { min: 30.0, max: 120.0 } },
    Question { key: HEIGHT, label: "Height (Cm)", kind: AnswerKind::Measurement { min: 130.0, max: 190.0 } },
    Question { key: PIMPLES, label: "Pimples", kind: AnswerKind::YesNo },
    Question { key: HAIR_LOSS, label: "Hair Loss", kind: AnswerKind::YesNo },
    Question { key: HAIR_GROWTH, label: "Excess Facial Hair Growth", kind: AnswerKind::YesNo },
    Question { key: SKIN_DARKENING, label: "Skin Darkening", kind: AnswerKind::YesNo },
    Question { key: CYCLE, label: "Cycle Regularity", kind: AnswerKind::Regularity },
    Question { key: FAST_FOOD, label: "Fast Food Intake", kind: AnswerKind::Code { max: 2 } },
    Question { key: STRESS, label: "Stress Level", kind: AnswerKind::Code { max: 2 } },
    Question { key: SLEEP, label: "Sleep Quality", kind: AnswerKind::Code { max: 2 } },
    Question { key: SUGAR, label: "Sugar Intake", kind: AnswerKind::Code { max: 2 } },
    Question { key: FAMILY_HISTORY, label: "Family History of PCOS", kind: AnswerKind::Code { max: 1 } },
];

/// Look up a question by its feature key
pub fn question(key: &str) -> Option<&'static Question> {
    QUESTIONS.iter().find(|q| q.key == key)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    #[default]
    No,
    Yes,
}

impl YesNo {
    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::No => "No",
            YesNo::Yes => "Yes",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleRegularity {
    #[default]
    Regular,
    Irregular,
}

impl CycleRegularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleRegularity::Regular => "Regular",
            CycleRegularity::Irregular => "Irregular",
        }
    }
}

/// Typed questionnaire submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientForm {
    pub age: i64,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub pimples: YesNo,
    pub hair_loss: YesNo,
    pub hair_growth: YesNo,
    pub skin_darkening: YesNo,
    pub cycle: CycleRegularity,
    pub fast_food: u8,
    pub stress: u8,
    pub sleep: u8,
    pub sugar: u8,
    pub family_history: u8,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self {
            age: 25,
            weight_kg: 55.0,
            height_cm: 160.0,
            pimples: YesNo::No,
            hair_loss: YesNo::No,
            hair_growth: YesNo::No,
            skin_darkening: YesNo::No,
            cycle: CycleRegularity::Regular,
            fast_food: 0,
            stress: 0,
            sleep: 0,
            sugar: 0,
            family_history: 0,
        }
    }
}

impl PatientForm {
    /// Raw answers keyed by feature name, categorical answers as their labels
    pub fn to_raw_answers(&self) -> RawAnswers {
        let mut answers = RawAnswers::new();
        answers.insert(AGE.to_string(), RawValue::Integer(self.age));
        answers.insert(WEIGHT.to_string(), RawValue::Number(self.weight_kg));
        answers.insert(HEIGHT.to_string(), RawValue::Number(self.height_cm));
        answers.insert(PIMPLES.to_string(), self.pimples.as_str().into());
        answers.insert(HAIR_LOSS.to_string(), self.hair_loss.as_str().into());
        answers.insert(HAIR_GROWTH.to_string(), self.hair_growth.as_str().into());
        answers.insert(SKIN_DARKENING.to_string(), self.skin_darkening.as_str().into());
        answers.insert(CYCLE.to_string(), self.cycle.as_str().into());
        answers.insert(FAST_FOOD.to_string(), RawValue::Integer(self.fast_food.into()));
        answers.insert(STRESS.to_string(), RawValue::Integer(self.stress.into()));
        answers.insert(SLEEP.to_string(), RawValue::Integer(self.sleep.into()));
        answers.insert(SUGAR.to_string(), RawValue::Integer(self.sugar.into()));
        answers.insert(
            FAMILY_HISTORY.to_string(),
            RawValue::Integer(self.family_history.into()),
        );
        answers
    }
}

/// A problem with one answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerIssue {
    pub feature: String,
    pub reason: String,
}

impl From<AnswerIssue> for CdssError {
    fn from(issue: AnswerIssue) -> Self {
        CdssError::InvalidAnswer {
            feature: issue.feature,
            reason: issue.reason,
        }
    }
}

/// Check every answer to a known question against its vocabulary and range.
///
/// Answers to unknown keys and missing answers are not reported; the
/// normalizer drops and zero-fills those respectively.
pub fn validate_answers(answers: &RawAnswers) -> Vec<AnswerIssue> {
    answers
        .iter()
        .filter_map(|(key, value)| {
            let question = question(key)?;
            check_answer(question.kind, value).map(|reason| AnswerIssue {
                feature: key.clone(),
                reason,
            })
        })
        .collect()
}

fn check_answer(kind: AnswerKind, value: &RawValue) -> Option<String> {
    match (kind, value) {
        (AnswerKind::Integer { min, max }, RawValue::Integer(v)) => {
            out_of_range(*v as f64, min as f64, max as f64)
        }
        (AnswerKind::Integer { .. }, RawValue::Number(v)) if v.fract() != 0.0 => {
            Some(format!("expected a whole number, got {v}"))
        }
        (AnswerKind::Integer { min, max }, RawValue::Number(v)) => {
            out_of_range(*v, min as f64, max as f64)
        }
        (AnswerKind::Measurement { min, max }, RawValue::Integer(v)) => {
            out_of_range(*v as f64, min, max)
        }
        (AnswerKind::Measurement { min, max }, RawValue::Number(v)) => out_of_range(*v, min, max),
        (AnswerKind::YesNo, RawValue::Text(s)) => {
            expect_label(s, &["Yes", "No"])
        }
        (AnswerKind::Regularity, RawValue::Text(s)) => {
            expect_label(s, &["Regular", "Irregular"])
        }
        (AnswerKind::YesNo | AnswerKind::Regularity, other) => code_in_range(other, 1),
        (AnswerKind::Code { max }, other @ (RawValue::Integer(_) | RawValue::Number(_))) => {
            code_in_range(other, max)
        }
        (_, RawValue::Text(s)) => Some(format!("expected a number, got {s:?}")),
    }
}

fn out_of_range(v: f64, min: f64, max: f64) -> Option<String> {
    if !v.is_finite() || v < min || v > max {
        Some(format!("{v} is outside the range {min}-{max}"))
    } else {
        None
    }
}

fn expect_label(s: &str, allowed: &[&str]) -> Option<String> {
    if allowed.contains(&s) {
        None
    } else {
        Some(format!("expected one of {}, got {s:?}", allowed.join("/")))
    }
}

fn code_in_range(value: &RawValue, max: i64) -> Option<String> {
    let code = match value {
        RawValue::Integer(v) => *v,
        RawValue::Number(v) if v.fract() == 0.0 => *v as i64,
        other => return Some(format!("expected an integer code, got {other}")),
    };
    if (0..=max).contains(&code) {
        None
    } else {
        Some(format!("code {code} is outside 0-{max}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_question_keys_unique() {
        let mut keys: Vec<&str> = QUESTIONS.iter().map(|q| q.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), QUESTIONS.len());
    }

    #[test]
    fn test_default_form_to_answers() {
        let answers = PatientForm::default().to_raw_answers();

        assert_eq!(answers.len(), QUESTIONS.len());
        assert_eq!(answers[AGE], RawValue::Integer(25));
        assert_eq!(answers[WEIGHT], RawValue::Number(55.0));
        assert_eq!(answers[CYCLE], RawValue::Text("Regular".to_string()));
        assert_eq!(answers[FAMILY_HISTORY], RawValue::Integer(0));
        assert!(validate_answers(&answers).is_empty());
    }

    #[test]
    fn test_form_deserialize_partial() {
        let form: PatientForm =
            serde_json::from_str(r#"{"age": 31, "cycle": "Irregular", "pimples": "Yes"}"#)
                .unwrap();
        assert_eq!(form.age, 31);
        assert_eq!(form.cycle, CycleRegularity::Irregular);
        assert_eq!(form.pimples, YesNo::Yes);
        assert_eq!(form.weight_kg, 55.0);
    }

    #[test]
    fn test_validate_reports_range_and_vocabulary() {
        let mut answers = PatientForm::default().to_raw_answers();
        answers.insert(AGE.to_string(), RawValue::Integer(-4));
        answers.insert(PIMPLES.to_string(), "Sometimes".into());
        answers.insert(STRESS.to_string(), RawValue::Integer(3));
        answers.insert("Unrelated".to_string(), RawValue::Integer(999));

        let issues = validate_answers(&answers);
        let features: Vec<&str> = issues.iter().map(|i| i.feature.as_str()).collect();

        assert_eq!(features, vec![AGE, PIMPLES, STRESS]);
    }

    #[test]
    fn test_validate_accepts_numeric_codes_for_categories() {
        let mut answers = RawAnswers::new();
        answers.insert(PIMPLES.to_string(), RawValue::Integer(1));
        answers.insert(CYCLE.to_string(), RawValue::Integer(0));
        answers.insert(WEIGHT.to_string(), RawValue::Integer(60));
        assert!(validate_answers(&answers).is_empty());

        answers.insert(CYCLE.to_string(), RawValue::Integer(2));
        assert_eq!(validate_answers(&answers).len(), 1);
    }

    #[test]
    fn test_fractional_age_rejected() {
        let mut answers = RawAnswers::new();
        answers.insert(AGE.to_string(), RawValue::Number(25.5));
        let issues = validate_answers(&answers);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].reason.contains("whole number"));
    }
}
