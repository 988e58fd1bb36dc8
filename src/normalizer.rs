//! Input normalization
//!
//! This module maps raw questionnaire answers onto the model's feature vector.
//! - Categorical labels encoded through a fixed table
//! - Numeric answers passed through unchanged
//! - Missing schema features default to 0, unknown keys are dropped
//!
//! No range validation happens here; see [`crate::questionnaire::validate_answers`].

use crate::error::CdssError;
use crate::types::{FeatureSchema, FeatureVector, RawAnswers, RawValue};

/// Fixed categorical encoding table
pub const CATEGORY_CODES: [(&str, f64); 4] = [
    ("Yes", 1.0),
    ("No", 0.0),
    ("Regular", 0.0),
    ("Irregular", 1.0),
];

/// Normalizer for converting raw answers to feature vectors
pub struct InputNormalizer;

impl InputNormalizer {
    /// Project `answers` onto `schema`, in schema order.
    ///
    /// Text answers outside [`CATEGORY_CODES`] are rejected with
    /// [`CdssError::UnknownCategory`] for schema features.
    pub fn normalize(
        answers: &RawAnswers,
        schema: &FeatureSchema,
    ) -> Result<FeatureVector, CdssError> {
        let values = schema
            .iter()
            .map(|feature| match answers.get(feature) {
                Some(value) => encode_value(feature, value),
                None => Ok(0.0),
            })
            .collect::<Result<Vec<f64>, CdssError>>()?;

        Ok(FeatureVector::new(values))
    }
}

/// Encode one raw answer
pub fn encode_value(feature: &str, value: &RawValue) -> Result<f64, CdssError> {
    match value {
        RawValue::Integer(v) => Ok(*v as f64),
        RawValue::Number(v) => Ok(*v),
        RawValue::Text(label) => category_code(label).ok_or_else(|| CdssError::UnknownCategory {
            feature: feature.to_string(),
            value: label.clone(),
        }),
    }
}

/// Look up a categorical label in the encoding table
pub fn category_code(label: &str) -> Option<f64> {
    CATEGORY_CODES
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::{PatientForm, CYCLE, FAMILY_HISTORY, QUESTIONS};
    use pretty_assertions::assert_eq;

    fn make_test_schema() -> FeatureSchema {
        FeatureSchema::new(QUESTIONS.iter().map(|q| q.key.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_full_answers_in_schema_order() {
        let schema = make_test_schema();
        let answers = PatientForm::default().to_raw_answers();
        let vector = InputNormalizer::normalize(&answers, &schema).unwrap();

        assert_eq!(vector.len(), schema.len());
        assert_eq!(
            vector.as_slice(),
            &[25.0, 55.0, 160.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_categorical_encoding() {
        let schema = make_test_schema();
        let mut answers = PatientForm::default().to_raw_answers();
        answers.insert(CYCLE.to_string(), "Irregular".into());
        answers.insert("Pimples(Y/N)".to_string(), "Yes".into());

        let vector = InputNormalizer::normalize(&answers, &schema).unwrap();
        assert_eq!(vector.as_slice()[schema.position(CYCLE).unwrap()], 1.0);
        assert_eq!(vector.as_slice()[3], 1.0);
    }

    #[test]
    fn test_missing_feature_defaults_to_zero() {
        let schema = make_test_schema();
        let mut answers = PatientForm::default().to_raw_answers();
        answers.remove(FAMILY_HISTORY);

        let vector = InputNormalizer::normalize(&answers, &schema).unwrap();
        assert_eq!(vector.len(), schema.len());
        assert_eq!(vector.as_slice()[schema.position(FAMILY_HISTORY).unwrap()], 0.0);
    }

    #[test]
    fn test_unknown_keys_dropped_and_reordered() {
        let schema =
            FeatureSchema::new(vec!["b".to_string(), "a".to_string()]).unwrap();
        let mut answers = RawAnswers::new();
        answers.insert("a".to_string(), RawValue::Number(1.5));
        answers.insert("b".to_string(), RawValue::Integer(2));
        answers.insert("extra".to_string(), "Whatever".into());

        let vector = InputNormalizer::normalize(&answers, &schema).unwrap();
        assert_eq!(vector.as_slice(), &[2.0, 1.5]);
    }

    #[test]
    fn test_already_coded_input_unchanged() {
        let schema = FeatureSchema::new(vec![CYCLE.to_string()]).unwrap();
        let mut labelled = RawAnswers::new();
        labelled.insert(CYCLE.to_string(), "Irregular".into());
        let mut coded = RawAnswers::new();
        coded.insert(CYCLE.to_string(), RawValue::Integer(1));

        assert_eq!(
            InputNormalizer::normalize(&labelled, &schema).unwrap(),
            InputNormalizer::normalize(&coded, &schema).unwrap()
        );
    }

    #[test]
    fn test_unknown_category_rejected() {
        let schema = FeatureSchema::new(vec!["Pimples(Y/N)".to_string()]).unwrap();
        let mut answers = RawAnswers::new();
        answers.insert("Pimples(Y/N)".to_string(), "yes please".into());

        let err = InputNormalizer::normalize(&answers, &schema).unwrap_err();
        assert!(matches!(err, CdssError::UnknownCategory { ref value, .. } if value == "yes please"));
    }

    #[test]
    fn test_negative_values_pass_through() {
        let schema = FeatureSchema::new(vec!["Age (yrs)".to_string()]).unwrap();
        let mut answers = RawAnswers::new();
        answers.insert("Age (yrs)".to_string(), RawValue::Integer(-3));

        let vector = InputNormalizer::normalize(&answers, &schema).unwrap();
        assert_eq!(vector.as_slice(), &[-3.0]);
    }
}
