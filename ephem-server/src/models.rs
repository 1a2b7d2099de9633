/// Request and response bodies for the JSON API

use ephem_api::{NewPaste, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/pastes`.
///
/// Fields are kept as raw JSON so that wrong types are reported with the
/// same messages as out-of-range values.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePasteRequest {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub ttl_seconds: Option<Value>,
    #[serde(default)]
    pub max_views: Option<Value>,
}

impl CreatePasteRequest {
    pub fn into_new_paste(self) -> Result<NewPaste, ValidationError> {
        let content = match self.content {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => return Err(ValidationError::EmptyContent),
        };

        let mut new = NewPaste::new(content);
        if let Some(ttl) = optional_int(self.ttl_seconds).ok_or(ValidationError::InvalidTtl)? {
            new = new.ttl_seconds(ttl);
        }
        if let Some(views) = optional_int(self.max_views).ok_or(ValidationError::InvalidMaxViews)? {
            new = new.max_views(views);
        }
        Ok(new)
    }
}

/// Some(None) for absent/null, Some(Some(n)) for an integer, None otherwise.
/// Whole-valued floats such as `60.0` count as integers.
fn optional_int(value: Option<Value>) -> Option<Option<i64>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(Value::Number(n)) => n.as_i64().or_else(|| whole_f64(n.as_f64()?)).map(Some),
        Some(_) => None,
    }
}

fn whole_f64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Response to a successful create
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePasteResponse {
    pub id: String,
    /// Link to the HTML view
    pub url: String,
}

/// Body of `GET /api/healthz`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<NewPaste, ValidationError> {
        serde_json::from_value::<CreatePasteRequest>(body)
            .unwrap()
            .into_new_paste()
    }

    #[test]
    fn test_minimal_request() {
        let new = parse(json!({"content": "hi"})).unwrap();
        assert_eq!(new, NewPaste::new("hi"));
    }

    #[test]
    fn test_full_request() {
        let new = parse(json!({"content": "hi", "ttl_seconds": 60, "max_views": 2})).unwrap();
        assert_eq!(new, NewPaste::new("hi").ttl_seconds(60).max_views(2));
    }

    #[test]
    fn test_nulls_are_absent() {
        let new = parse(json!({"content": "hi", "ttl_seconds": null, "max_views": null})).unwrap();
        assert_eq!(new, NewPaste::new("hi"));
    }

    #[test]
    fn test_bad_content() {
        assert_eq!(parse(json!({})).unwrap_err(), ValidationError::EmptyContent);
        assert_eq!(parse(json!({"content": ""})).unwrap_err(), ValidationError::EmptyContent);
        assert_eq!(parse(json!({"content": 5})).unwrap_err(), ValidationError::EmptyContent);
    }

    #[test]
    fn test_whole_floats_are_integers() {
        let new = parse(json!({"content": "hi", "ttl_seconds": 60.0, "max_views": 1.0})).unwrap();
        assert_eq!(new, NewPaste::new("hi").ttl_seconds(60).max_views(1));

        // Range checks still happen in the service
        let new = parse(json!({"content": "hi", "max_views": -2.0})).unwrap();
        assert_eq!(new, NewPaste::new("hi").max_views(-2));

        assert_eq!(
            parse(json!({"content": "x", "ttl_seconds": 1e300})).unwrap_err(),
            ValidationError::InvalidTtl
        );
    }

    #[test]
    fn test_non_integer_limits() {
        assert_eq!(
            parse(json!({"content": "x", "ttl_seconds": 1.5})).unwrap_err(),
            ValidationError::InvalidTtl
        );
        assert_eq!(
            parse(json!({"content": "x", "ttl_seconds": "60"})).unwrap_err(),
            ValidationError::InvalidTtl
        );
        assert_eq!(
            parse(json!({"content": "x", "max_views": true})).unwrap_err(),
            ValidationError::InvalidMaxViews
        );
    }
}
