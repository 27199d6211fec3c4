use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Column names the model artifact was trained against, in trained order.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "DRG Definition",
    "Provider State",
    "Hospital Referral Region Description",
    "Total Discharges",
    "Average Covered Charges",
    "Average Medicare Payments",
];

/// Raw `/predict` body. Values stay untyped until `FeatureRecord::try_from`.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct PredictionRequest {
    #[serde(default)]
    pub drg_definition: Option<Value>,
    #[serde(default)]
    pub provider_state: Option<Value>,
    #[serde(default)]
    pub hospital_region: Option<Value>,
    #[serde(default)]
    pub total_discharges: Option<Value>,
    #[serde(default)]
    pub avg_covered_charges: Option<Value>,
    #[serde(default)]
    pub avg_medicare_payments: Option<Value>,
}

/// One billing record, typed the way the model expects it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub drg_definition: String,
    pub provider_state: String,
    pub hospital_region: String,
    pub total_discharges: i64,
    pub avg_covered_charges: f64,
    pub avg_medicare_payments: f64,
}

impl TryFrom<PredictionRequest> for FeatureRecord {
    type Error = ApiError;

    fn try_from(req: PredictionRequest) -> Result<Self, Self::Error> {
        Ok(FeatureRecord {
            drg_definition: categorical("drg_definition", req.drg_definition)?,
            provider_state: categorical("provider_state", req.provider_state)?,
            hospital_region: categorical("hospital_region", req.hospital_region)?,
            total_discharges: integer("total_discharges", req.total_discharges)?,
            avg_covered_charges: float("avg_covered_charges", req.avg_covered_charges)?,
            avg_medicare_payments: float("avg_medicare_payments", req.avg_medicare_payments)?,
        })
    }
}

fn required(field: &'static str, value: Option<Value>) -> Result<Value, ApiError> {
    match value {
        None | Some(Value::Null) => Err(ApiError::MissingField(field)),
        Some(v) => Ok(v),
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ApiError {
    ApiError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn categorical(field: &'static str, value: Option<Value>) -> Result<String, ApiError> {
    match required(field, value)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::String(_) => Err(invalid(field, "must not be blank")),
        other => Err(invalid(field, format!("expected a string, got {}", kind(&other)))),
    }
}

fn integer(field: &'static str, value: Option<Value>) -> Result<i64, ApiError> {
    match required(field, value)? {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(invalid(field, format!("{} is not an integer", n))),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(field, format!("{:?} is not an integer", s))),
        other => Err(invalid(field, format!("expected an integer, got {}", kind(&other)))),
    }
}

fn float(field: &'static str, value: Option<Value>) -> Result<f64, ApiError> {
    let parsed = match required(field, value)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) => Some(f),
            Err(_) => return Err(invalid(field, format!("{:?} is not a number", s))),
        },
        other => return Err(invalid(field, format!("expected a number, got {}", kind(&other)))),
    };

    match parsed {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(invalid(field, "must be a finite number")),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub predicted_cost: f64,
}

impl PredictionResponse {
    pub fn new(raw: f64) -> Self {
        PredictionResponse {
            predicted_cost: round_cents(raw),
        }
    }
}

/// Rounds to two decimals from the exact binary value, ties to even.
pub fn round_cents(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        ErrorResponse {
            error: code.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> PredictionRequest {
        serde_json::from_value(body).unwrap()
    }

    fn sample() -> Value {
        json!({
            "drg_definition": "057 - DEGENERATIVE NERVOUS SYSTEM DISORDERS",
            "provider_state": "CA",
            "hospital_region": "CA - Los Angeles",
            "total_discharges": "25",
            "avg_covered_charges": "45000.50",
            "avg_medicare_payments": "12000.75"
        })
    }

    #[test]
    fn string_encoded_numbers_are_coerced() {
        let record = FeatureRecord::try_from(request(sample())).unwrap();
        assert_eq!(record.drg_definition, "057 - DEGENERATIVE NERVOUS SYSTEM DISORDERS");
        assert_eq!(record.provider_state, "CA");
        assert_eq!(record.hospital_region, "CA - Los Angeles");
        assert_eq!(record.total_discharges, 25);
        assert_eq!(record.avg_covered_charges, 45000.50);
        assert_eq!(record.avg_medicare_payments, 12000.75);
    }

    #[test]
    fn json_numbers_are_accepted() {
        let mut body = sample();
        body["total_discharges"] = json!(25);
        body["avg_covered_charges"] = json!(45000);
        body["avg_medicare_payments"] = json!(12000.75);

        let record = FeatureRecord::try_from(request(body)).unwrap();
        assert_eq!(record.total_discharges, 25);
        assert_eq!(record.avg_covered_charges, 45000.0);
    }

    #[test]
    fn integral_float_and_padded_string_discharges() {
        let mut body = sample();
        body["total_discharges"] = json!(40.0);
        assert_eq!(FeatureRecord::try_from(request(body.clone())).unwrap().total_discharges, 40);

        body["total_discharges"] = json!(" +12 ");
        assert_eq!(FeatureRecord::try_from(request(body)).unwrap().total_discharges, 12);
    }

    #[test]
    fn extra_keys_are_ignored() {
        let mut body = sample();
        body["comment"] = json!("ignored");
        assert!(FeatureRecord::try_from(request(body)).is_ok());
    }

    #[test]
    fn each_missing_key_is_reported() {
        for key in [
            "drg_definition",
            "provider_state",
            "hospital_region",
            "total_discharges",
            "avg_covered_charges",
            "avg_medicare_payments",
        ] {
            let mut body = sample();
            body.as_object_mut().unwrap().remove(key);
            match FeatureRecord::try_from(request(body)) {
                Err(ApiError::MissingField(field)) => assert_eq!(field, key),
                other => panic!("expected missing {}, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let mut body = sample();
        body["provider_state"] = Value::Null;
        assert!(matches!(
            FeatureRecord::try_from(request(body)),
            Err(ApiError::MissingField("provider_state"))
        ));
    }

    #[test]
    fn non_numeric_discharges_rejected() {
        for bad in [json!("twenty"), json!(25.5), json!(true), json!("25.0"), json!([25])] {
            let mut body = sample();
            body["total_discharges"] = bad.clone();
            match FeatureRecord::try_from(request(body)) {
                Err(ApiError::InvalidField { field, .. }) => assert_eq!(field, "total_discharges"),
                other => panic!("{} should be rejected, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn non_finite_charges_rejected() {
        for bad in [json!("NaN"), json!("inf"), json!("abc"), json!({})] {
            let mut body = sample();
            body["avg_covered_charges"] = bad;
            assert!(matches!(
                FeatureRecord::try_from(request(body)),
                Err(ApiError::InvalidField { field: "avg_covered_charges", .. })
            ));
        }
    }

    #[test]
    fn categorical_must_be_non_blank_string() {
        let mut body = sample();
        body["hospital_region"] = json!("   ");
        assert!(matches!(
            FeatureRecord::try_from(request(body)),
            Err(ApiError::InvalidField { field: "hospital_region", .. })
        ));

        let mut body = sample();
        body["drg_definition"] = json!(57);
        assert!(matches!(
            FeatureRecord::try_from(request(body)),
            Err(ApiError::InvalidField { field: "drg_definition", .. })
        ));
    }

    #[test]
    fn first_failing_column_wins() {
        let body = json!({ "total_discharges": "x" });
        assert!(matches!(
            FeatureRecord::try_from(request(body)),
            Err(ApiError::MissingField("drg_definition"))
        ));
    }

    #[test]
    fn prediction_is_rounded_to_cents() {
        assert_eq!(PredictionResponse::new(1234.5678).predicted_cost, 1234.57);
        assert_eq!(PredictionResponse::new(-3.14159).predicted_cost, -3.14);
        assert_eq!(PredictionResponse::new(10.0).predicted_cost, 10.0);
    }

    #[test]
    fn cent_rounding_uses_the_stored_binary_value() {
        assert_eq!(round_cents(0.125), 0.12);
        assert_eq!(round_cents(1.115), 1.11);
        assert_eq!(round_cents(10.005), 10.01);
        assert_eq!(round_cents(2.675), 2.67);
        assert_eq!(round_cents(26671.4375), 26671.44);
    }
}
