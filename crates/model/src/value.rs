use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};

/// Discriminator stored alongside the four nullable result columns.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResultKind {
    Number = 0,
    String = 1,
    Boolean = 2,
    Json = 3,
}

impl ResultKind {
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(ResultKind::Number),
            1 => Some(ResultKind::String),
            2 => Some(ResultKind::Boolean),
            3 => Some(ResultKind::Json),
            _ => None,
        }
    }
}

/// A measurement result. One logical field, stored across four mutually
/// exclusive columns plus the discriminator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Bool(bool),
    Number(Number),
    Text(String),
    Json(JsonValue),
}

impl ResultValue {
    pub fn kind(&self) -> ResultKind {
        match self {
            ResultValue::Bool(_) => ResultKind::Boolean,
            ResultValue::Number(_) => ResultKind::Number,
            ResultValue::Text(_) => ResultKind::String,
            ResultValue::Json(_) => ResultKind::Json,
        }
    }

    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Bool(value) => ResultValue::Bool(value),
            JsonValue::Number(number) => ResultValue::Number(number),
            JsonValue::String(text) => ResultValue::Text(text),
            other => ResultValue::Json(other),
        }
    }

    /// Element count when the result is array-shaped.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            ResultValue::Json(JsonValue::Array(items)) => Some(items.len()),
            _ => None,
        }
    }
}

impl From<bool> for ResultValue {
    fn from(value: bool) -> Self {
        ResultValue::Bool(value)
    }
}

impl From<i64> for ResultValue {
    fn from(value: i64) -> Self {
        ResultValue::Number(Number::from(value))
    }
}

impl From<f64> for ResultValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(ResultValue::Number)
            .unwrap_or(ResultValue::Json(JsonValue::Null))
    }
}

impl From<&str> for ResultValue {
    fn from(value: &str) -> Self {
        ResultValue::Text(value.to_string())
    }
}

/// Row-side encoding of a result: the discriminator plus the four nullable
/// columns. The string column mirrors boolean and number values for
/// ordering and filtering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EncodedResult {
    pub kind: Option<ResultKind>,
    pub boolean: Option<bool>,
    pub number: Option<f64>,
    pub string: Option<String>,
    pub json: Option<String>,
}

pub fn encode_result(value: &ResultValue) -> EncodedResult {
    match value {
        ResultValue::Bool(value) => EncodedResult {
            kind: Some(ResultKind::Boolean),
            boolean: Some(*value),
            string: Some(value.to_string()),
            ..Default::default()
        },
        ResultValue::Number(number) => EncodedResult {
            kind: Some(ResultKind::Number),
            number: number.as_f64(),
            string: Some(number.to_string()),
            ..Default::default()
        },
        ResultValue::Text(text) => EncodedResult {
            kind: Some(ResultKind::String),
            string: Some(text.clone()),
            ..Default::default()
        },
        ResultValue::Json(value) => EncodedResult {
            kind: Some(ResultKind::Json),
            json: Some(value.to_string()),
            ..Default::default()
        },
    }
}

pub fn decode_result(encoded: &EncodedResult) -> Option<ResultValue> {
    match encoded.kind? {
        ResultKind::Boolean => encoded.boolean.map(ResultValue::Bool),
        ResultKind::Number => {
            // The string mirror keeps the exact decimal form; reparse it
            // first and fall back to the float column for legacy rows.
            if let Some(text) = &encoded.string {
                if let Ok(number) = text.parse::<Number>() {
                    return Some(ResultValue::Number(number));
                }
            }
            encoded
                .number
                .and_then(Number::from_f64)
                .map(ResultValue::Number)
        }
        ResultKind::String => encoded.string.clone().map(ResultValue::Text),
        ResultKind::Json => encoded
            .json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .map(ResultValue::Json),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_result, encode_result, EncodedResult, ResultKind, ResultValue};
    use serde_json::json;

    fn round_trip(value: ResultValue) {
        let encoded = encode_result(&value);
        assert_eq!(decode_result(&encoded), Some(value));
    }

    #[test]
    fn all_variants_round_trip() {
        round_trip(ResultValue::from(true));
        round_trip(ResultValue::from(42i64));
        round_trip(ResultValue::from(2.5f64));
        round_trip(ResultValue::from("dry"));
        round_trip(ResultValue::Json(json!(["a", "b"])));
        round_trip(ResultValue::Json(json!({"depth": [1, 2], "unit": "m"})));
    }

    #[test]
    fn number_encoding_mirrors_string() {
        let encoded = encode_result(&ResultValue::from(42i64));
        assert_eq!(encoded.kind, Some(ResultKind::Number));
        assert_eq!(encoded.string.as_deref(), Some("42"));
        assert_eq!(encoded.number, Some(42.0));
        assert_eq!(encoded.boolean, None);
        assert_eq!(encoded.json, None);
    }

    #[test]
    fn number_decoding_prefers_exact_string() {
        let encoded = EncodedResult {
            kind: Some(ResultKind::Number),
            number: Some(0.30000000000000004),
            string: Some("0.3".to_string()),
            ..Default::default()
        };
        assert_eq!(
            decode_result(&encoded),
            Some(ResultValue::Number("0.3".parse().expect("number")))
        );

        let legacy = EncodedResult {
            kind: Some(ResultKind::Number),
            number: Some(1.5),
            string: None,
            ..Default::default()
        };
        assert_eq!(decode_result(&legacy), Some(ResultValue::from(1.5f64)));
    }

    #[test]
    fn missing_discriminator_yields_no_result() {
        assert_eq!(decode_result(&EncodedResult::default()), None);
    }
}
