use serde::{Deserialize, Serialize};

use crate::{IndicatorsError, IndicatorsResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub unit_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: i64,
    pub name: String,
    pub unit_id: i64,
    pub unit_name: String,
}

/// One stored scope/year/source combination of an indicator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub year: i32,
    pub territory_id: Option<i64>,
    pub oktmo: Option<i64>,
    pub source: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorAvailability {
    pub aggregated: Vec<AvailabilityEntry>,
    pub detailed: Vec<AvailabilityEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorDetails {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub aggregated_availability: Vec<AvailabilityEntry>,
    pub detailed_availability: Vec<AvailabilityEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedItem {
    pub year: i32,
    pub value: f64,
    pub source: String,
}

impl AggregatedItem {
    pub fn validate(&self) -> IndicatorsResult<()> {
        require_finite("value", Some(self.value))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedValue {
    pub id: i64,
    pub indicator_id: i64,
    pub name: String,
    pub unit: String,
    pub territory_id: Option<i64>,
    pub oktmo: Option<i64>,
    pub year: i32,
    pub source: String,
    pub value: f64,
}

/// One age band of a detailed value. An open band such as `65+` has no
/// `age_end`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailedDatum {
    pub age_start: Option<i32>,
    #[serde(default)]
    pub age_end: Option<i32>,
    #[serde(default)]
    pub male: Option<f64>,
    #[serde(default)]
    pub female: Option<f64>,
}

impl DetailedDatum {
    pub fn band(age_start: i32, age_end: Option<i32>) -> Self {
        Self {
            age_start: Some(age_start),
            age_end,
            male: None,
            female: None,
        }
    }

    pub fn with_values(mut self, male: Option<f64>, female: Option<f64>) -> Self {
        self.male = male;
        self.female = female;
        self
    }

    pub fn validate(&self) -> IndicatorsResult<()> {
        // Absent bounds are keyed as -1 by the natural-key index.
        for (field, age) in [("age_start", self.age_start), ("age_end", self.age_end)] {
            if let Some(age) = age
                && age < 0
            {
                return Err(IndicatorsError::validation(format!(
                    "{field} {age} is negative"
                )));
            }
        }
        require_finite("male", self.male)?;
        require_finite("female", self.female)?;
        match (self.age_start, self.age_end) {
            (None, None) => Err(IndicatorsError::validation(
                "age_start and age_end cannot both be empty",
            )),
            (Some(start), Some(end)) if end < start => Err(IndicatorsError::validation(format!(
                "age_end {end} is below age_start {start}"
            ))),
            _ => Ok(()),
        }
    }
}

fn require_finite(field: &str, value: Option<f64>) -> IndicatorsResult<()> {
    match value {
        Some(value) if !value.is_finite() => Err(IndicatorsError::validation(format!(
            "{field} must be a finite number, got {value}"
        ))),
        _ => Ok(()),
    }
}

/// A stored detailed row with the unit name already joined in.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailedRow {
    pub id: i64,
    pub indicator_id: i64,
    pub territory_id: Option<i64>,
    pub oktmo: Option<i64>,
    pub unit: String,
    pub year: i32,
    pub source: String,
    pub datum: DetailedDatum,
}

/// Detailed values for one `(year, source)` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailedGroup {
    pub indicator_id: i64,
    pub territory_id: Option<i64>,
    pub oktmo: Option<i64>,
    pub unit: String,
    pub year: i32,
    pub source: String,
    pub data: Vec<DetailedDatum>,
}

#[cfg(test)]
mod tests {
    use super::{AggregatedItem, DetailedDatum};

    #[test]
    fn open_and_closed_bands_are_valid() {
        assert!(DetailedDatum::band(65, None).validate().is_ok());
        assert!(DetailedDatum::band(0, Some(17)).validate().is_ok());
        let upper_only = DetailedDatum {
            age_start: None,
            age_end: Some(4),
            male: None,
            female: None,
        };
        assert!(upper_only.validate().is_ok());
    }

    #[test]
    fn empty_or_inverted_bands_are_rejected() {
        let empty = DetailedDatum {
            age_start: None,
            age_end: None,
            male: Some(1.0),
            female: None,
        };
        assert!(empty.validate().is_err());
        assert!(DetailedDatum::band(30, Some(20)).validate().is_err());
    }

    #[test]
    fn negative_ages_are_rejected() {
        assert!(DetailedDatum::band(-1, Some(4)).validate().is_err());
        let negative_end = DetailedDatum {
            age_start: None,
            age_end: Some(-1),
            male: None,
            female: None,
        };
        assert!(negative_end.validate().is_err());
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let band = DetailedDatum::band(0, Some(4));
        assert!(band.clone().with_values(Some(f64::NAN), None).validate().is_err());
        assert!(band.clone().with_values(None, Some(f64::INFINITY)).validate().is_err());
        assert!(band.with_values(None, None).validate().is_ok());

        let item = |value| AggregatedItem {
            year: 2020,
            value,
            source: "census".to_string(),
        };
        assert!(item(f64::NAN).validate().is_err());
        assert!(item(f64::NEG_INFINITY).validate().is_err());
        assert!(item(0.5).validate().is_ok());
    }
}
