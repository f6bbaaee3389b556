//! Route handlers, one module per account kind plus the routes both kinds
//! share.
//!
//! Every success body is a JSON object with `"success": true` and a
//! `message`, plus the operation's own fields.

pub mod accounts;
pub mod companies;
pub mod users;

use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Wrap `body` (which must serialise to an object) in the success envelope.
pub(crate) fn reply<T: Serialize>(message: &str, body: T) -> Result<Json<Value>, ApiError> {
  let mut object = match serde_json::to_value(body).map_err(jobboard_core::Error::from)? {
    Value::Object(map) => map,
    Value::Null => Map::new(),
    other => {
      let mut map = Map::new();
      map.insert("data".to_owned(), other);
      map
    }
  };
  object.insert("success".to_owned(), Value::Bool(true));
  object.insert("message".to_owned(), Value::String(message.to_owned()));
  Ok(Json(Value::Object(object)))
}

/// Read a loosely typed scalar as a string: JSON strings as-is, numbers in
/// their decimal form.
pub(crate) fn coerce_string(value: Option<Value>) -> Option<String> {
  match value? {
    Value::String(s) => Some(s),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn reply_merges_fields_into_the_envelope() {
    let Json(body) = reply("done", json!({ "token": "t" })).unwrap();
    assert_eq!(body, json!({ "success": true, "message": "done", "token": "t" }));

    let Json(body) = reply("done", ()).unwrap();
    assert_eq!(body, json!({ "success": true, "message": "done" }));

    let Json(body) = reply("done", vec![1, 2]).unwrap();
    assert_eq!(body["data"], json!([1, 2]));
  }

  #[test]
  fn codes_may_arrive_as_numbers() {
    assert_eq!(coerce_string(Some(json!(482913))), Some("482913".into()));
    assert_eq!(coerce_string(Some(json!("482913"))), Some("482913".into()));
    assert_eq!(coerce_string(Some(json!(true))), None);
    assert_eq!(coerce_string(None), None);
  }
}
