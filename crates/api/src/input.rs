//! Parsing of path segments and loosely typed JSON body fields.
//!
//! Clients send ids and quantities either as JSON numbers or as strings, so
//! body fields are read as raw JSON values, rendered to text and trimmed
//! before being validated.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use common::{Money, Quantity};
use serde_json::Value;

use crate::error::ApiError;

/// JSON body extractor whose rejections are reported as [`ApiError`]s.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Renders a JSON scalar as trimmed text. Empty strings and `null` count as absent.
pub fn text(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!raw.is_empty()).then_some(raw)
}

/// Like [`text`], but a missing value is a 400.
pub fn required(value: Option<&Value>, field: &str) -> Result<String, ApiError> {
    text(value).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Please provide a value to the {field}, It can't be empty."
        ))
    })
}

/// Parses a positive integer id such as an order, user or product id.
pub fn parse_id<T: From<i32>>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .map(T::from)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {what}. Please provide a valid id.")))
}

/// Parses a positive integer quantity.
pub fn parse_quantity(raw: &str) -> Result<Quantity, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|n| Quantity::new(n).ok())
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Invalid quantity {raw}. The quantity must be a positive integer."
            ))
        })
}

/// Parses a decimal price such as `"20"` or `"19.99"`.
pub fn parse_price(raw: &str) -> Result<Money, ApiError> {
    raw.trim().parse::<Money>().map_err(|_| {
        ApiError::BadRequest(format!(
            "Invalid price {raw}. The price must be a non-negative amount."
        ))
    })
}

#[cfg(test)]
mod tests {
    use common::OrderId;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_text_accepts_strings_and_numbers() {
        assert_eq!(text(Some(&json!("  active "))), Some("active".to_string()));
        assert_eq!(text(Some(&json!(12))), Some("12".to_string()));
        assert_eq!(text(Some(&json!("   "))), None);
        assert_eq!(text(Some(&Value::Null)), None);
        assert_eq!(text(None), None);
    }

    #[test]
    fn test_required_reports_field() {
        let err = required(None, "status").unwrap_err();
        match err {
            ApiError::BadRequest(msg) => assert!(msg.contains("status")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_id() {
        let id: OrderId = parse_id(" 3 ", "order id").unwrap();
        assert_eq!(id, OrderId::new(3));

        for bad in ["0", "-1", "abc", "1.5", ""] {
            assert!(parse_id::<OrderId>(bad, "order id").is_err(), "{bad}");
        }
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("5").unwrap().get(), 5);
        for bad in ["0", "-2", "2.5", "x", "99999999999"] {
            assert!(parse_quantity(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("19.99").unwrap().cents(), 1999);
        assert_eq!(parse_price("20").unwrap().cents(), 2000);
        assert!(parse_price("-1").is_err());
    }
}
