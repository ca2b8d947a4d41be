// ⚖️ BMI Calculator - weight / height², bucketed into four categories
//
// Thresholds are left-inclusive:
//   < 18.5        Underweight
//   18.5 .. 25    Normal weight
//   25 .. 30      Overweight
//   >= 30         Obese

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const UNDERWEIGHT_BELOW: f64 = 18.5;
pub const OVERWEIGHT_FROM: f64 = 25.0;
pub const OBESE_FROM: f64 = 30.0;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BmiCategory {
    #[serde(rename = "Underweight")]
    Underweight,

    #[serde(rename = "Normal weight")]
    NormalWeight,

    #[serde(rename = "Overweight")]
    Overweight,

    #[serde(rename = "Obese")]
    Obese,
}

impl BmiCategory {
    pub const ALL: [BmiCategory; 4] = [
        BmiCategory::Underweight,
        BmiCategory::NormalWeight,
        BmiCategory::Overweight,
        BmiCategory::Obese,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::NormalWeight => "Normal weight",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        }
    }

    /// Human-readable range, as shown on the BMI scale
    pub fn range_label(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "< 18.5",
            BmiCategory::NormalWeight => "18.5 - 24.9",
            BmiCategory::Overweight => "25 - 29.9",
            BmiCategory::Obese => "≥ 30",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BmiCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BmiCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::Storage(format!("unknown BMI category '{}'", s)))
    }
}

// ============================================================================
// CALCULATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BmiResult {
    pub bmi: f64,
    pub category: BmiCategory,
}

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn classify(bmi: f64) -> BmiCategory {
    if bmi < UNDERWEIGHT_BELOW {
        BmiCategory::Underweight
    } else if bmi < OVERWEIGHT_FROM {
        BmiCategory::NormalWeight
    } else if bmi < OBESE_FROM {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

/// Compute BMI from weight (kg) and height (m).
///
/// The category is taken from the rounded value so that a stored
/// `(bmi, category)` pair always agrees with `classify(bmi)`.
pub fn calculate(weight: f64, height: f64) -> Result<BmiResult> {
    if !weight.is_finite() || !height.is_finite() || weight <= 0.0 || height <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "weight and height must be positive numbers (weight: {}, height: {})",
            weight, height
        )));
    }

    let bmi = round2(weight / (height * height));
    if !bmi.is_finite() {
        return Err(Error::InvalidInput(format!(
            "BMI out of range (weight: {}, height: {})",
            weight, height
        )));
    }

    Ok(BmiResult {
        bmi,
        category: classify(bmi),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_calculation() {
        let result = calculate(70.0, 1.75).unwrap();
        assert_eq!(result.bmi, 22.86);
        assert_eq!(result.category, BmiCategory::NormalWeight);
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(classify(18.49), BmiCategory::Underweight);
        assert_eq!(classify(18.5), BmiCategory::NormalWeight);
        assert_eq!(classify(24.999), BmiCategory::NormalWeight);
        assert_eq!(classify(25.0), BmiCategory::Overweight);
        assert_eq!(classify(29.99), BmiCategory::Overweight);
        assert_eq!(classify(30.0), BmiCategory::Obese);
        assert_eq!(classify(55.0), BmiCategory::Obese);
    }

    #[test]
    fn test_each_category_from_measurements() {
        assert_eq!(calculate(50.0, 1.80).unwrap().category, BmiCategory::Underweight);
        assert_eq!(calculate(65.0, 1.70).unwrap().category, BmiCategory::NormalWeight);
        assert_eq!(calculate(85.0, 1.75).unwrap().category, BmiCategory::Overweight);
        assert_eq!(calculate(120.0, 1.70).unwrap().category, BmiCategory::Obese);
    }

    #[test]
    fn test_category_follows_rounded_bmi() {
        // 24.996 rounds to 25.0, so the stored pair must say Overweight
        let height: f64 = 2.0;
        let result = calculate(24.996 * height * height, height).unwrap();
        assert_eq!(result.bmi, 25.0);
        assert_eq!(result.category, classify(result.bmi));
        assert_eq!(result.category, BmiCategory::Overweight);
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        for (weight, height) in [(0.0, 1.75), (70.0, 0.0), (-1.0, 1.75), (70.0, -1.75)] {
            let err = calculate(weight, height).unwrap_err();
            assert!(err.is_client_error(), "({}, {}) should be rejected", weight, height);
        }
    }

    #[test]
    fn test_rejects_non_finite_inputs() {
        assert!(calculate(f64::NAN, 1.75).is_err());
        assert!(calculate(70.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_overflowing_result() {
        // height² underflows to 0.0
        assert!(calculate(70.0, 1e-200).unwrap_err().is_client_error());
        // weight / height² overflows
        assert!(calculate(1e308, 0.5).unwrap_err().is_client_error());
    }

    #[test]
    fn test_category_labels_round_trip() {
        for category in BmiCategory::ALL {
            assert_eq!(category.as_str().parse::<BmiCategory>().unwrap(), category);
            assert_eq!(
                serde_json::to_value(category).unwrap(),
                serde_json::json!(category.as_str())
            );
        }
        assert!("Chonky".parse::<BmiCategory>().is_err());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(22.857142), 22.86);
        assert_eq!(round2(18.504), 18.5);
        assert_eq!(round2(30.0), 30.0);
    }
}
