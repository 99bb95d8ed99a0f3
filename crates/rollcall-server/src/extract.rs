use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde_json::{Map, Value};

/// Request body reduced to a JSON object.
///
/// Accepts `application/json` objects and urlencoded forms. Anything else,
/// including malformed JSON or a missing content type, yields an empty
/// object so field validation reports it as missing fields.
#[derive(Debug, Default)]
pub struct Payload(pub Map<String, Value>);

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| {
                v.to_ascii_lowercase()
                    .starts_with("application/x-www-form-urlencoded")
            });

        let fields = if is_form {
            match Form::<HashMap<String, String>>::from_request(req, state).await {
                Ok(Form(form)) => form
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
                Err(rejection) => {
                    tracing::debug!(%rejection, "unreadable form body");
                    Map::new()
                }
            }
        } else {
            match Json::<Value>::from_request(req, state).await {
                Ok(Json(Value::Object(map))) => map,
                Ok(Json(_)) => {
                    tracing::debug!("json body is not an object");
                    Map::new()
                }
                Err(rejection) => {
                    tracing::debug!(%rejection, "unreadable json body");
                    Map::new()
                }
            }
        };

        Ok(Self(fields))
    }
}
