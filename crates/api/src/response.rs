//! Success envelope: `{ data, meta: { timestamp, path, paging? } }`.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use opsledger_shared::types::{PageResponse, Paging};

/// Envelope metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    /// RFC 3339 response time.
    pub timestamp: String,
    /// Request path.
    pub path: String,
    /// Copy of the list paging, on list responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

/// A wrapped success response.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Payload.
    pub data: T,
    /// Metadata.
    pub meta: Meta,
}

/// Request time and path, captured for the envelope.
///
/// Handlers take this as an argument and finish with `ctx.ok(..)`,
/// `ctx.created(..)` or `ctx.page(..)`. `now` is also the clock used for
/// every timestamp the handler writes.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request time.
    pub now: DateTime<Utc>,
    path: String,
}

impl RequestContext {
    /// Builds a context for `path` at `now`.
    #[must_use]
    pub fn new(path: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            now,
        }
    }

    fn meta(&self, paging: Option<Paging>) -> Meta {
        Meta {
            timestamp: self.now.to_rfc3339_opts(SecondsFormat::Millis, true),
            path: self.path.clone(),
            paging,
        }
    }

    /// 200 with `data`.
    pub fn ok<T: Serialize>(&self, data: T) -> Response {
        self.respond(StatusCode::OK, data, None)
    }

    /// 201 with `data`.
    pub fn created<T: Serialize>(&self, data: T) -> Response {
        self.respond(StatusCode::CREATED, data, None)
    }

    /// 200 with `{ data: [...], paging }` as the payload.
    pub fn page<T: Serialize>(&self, page: PageResponse<T>) -> Response {
        let paging = page.paging;
        self.respond(StatusCode::OK, page, Some(paging))
    }

    fn respond<T: Serialize>(&self, status: StatusCode, data: T, paging: Option<Paging>) -> Response {
        let envelope = Envelope {
            data,
            meta: self.meta(paging),
        };
        (status, Json(envelope)).into_response()
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Nested routers strip their prefix from `uri`; the original keeps it.
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path().to_string(), |uri| uri.path().to_string());
        Ok(Self::new(path, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http_body_util::BodyExt;
    use opsledger_shared::types::PageRequest;

    async fn json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::new(
            "/api/invoices",
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_ok_envelope() {
        let response = ctx().ok(serde_json::json!({ "id": 1 }));
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["meta"]["path"], "/api/invoices");
        assert_eq!(body["meta"]["timestamp"], "2024-03-01T08:30:00.000Z");
        assert!(body["meta"].get("paging").is_none());
    }

    #[tokio::test]
    async fn test_page_envelope_nests_paging() {
        let page = PageResponse::new(vec![1, 2, 3], PageRequest::new(1, 3), 7);
        let body = json(ctx().page(page)).await;

        assert_eq!(body["data"]["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"]["paging"]["current_page"], 1);
        assert_eq!(body["data"]["paging"]["total_page"], 3);
        assert_eq!(body["meta"]["paging"]["size"], 3);
    }

    #[tokio::test]
    async fn test_created_status() {
        let response = ctx().created("x");
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
