use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Content type of every rendered body. Bodies are UTF-8.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A fully rendered response, ready to be written in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub status: StatusCode,
    /// `None` for ignored exceptions.
    pub body: Option<String>,
}

impl RenderedResponse {
    pub fn json(status: StatusCode, body: String) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }
}

/// Outcome of resolving one exception.
///
/// Aggregates produce one rendered response per child; `status` is the last
/// child's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub status: StatusCode,
    pub responses: Vec<RenderedResponse>,
}

impl Resolution {
    pub fn single(response: RenderedResponse) -> Self {
        Self {
            status: response.status,
            responses: vec![response],
        }
    }

    /// Bodies in emission order, skipping ignored responses.
    pub fn bodies(&self) -> impl Iterator<Item = &str> {
        self.responses.iter().filter_map(|r| r.body.as_deref())
    }
}

impl IntoResponse for Resolution {
    fn into_response(self) -> Response {
        let mut buffer = BufferedResponse::new(self.status);
        for rendered in self.responses {
            buffer.push(rendered);
        }
        buffer.set_status(self.status);
        buffer.into_response()
    }
}

/// Destination of rendered exceptions.
///
/// Stands in for the transport's response object: settable status and
/// content type, and a write that completes once the bytes are flushed.
#[async_trait]
pub trait ResponseSink: Send {
    fn status(&self) -> StatusCode;

    fn set_status(&mut self, status: StatusCode);

    fn set_content_type(&mut self, content_type: &str);

    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;
}

/// In-memory sink that can be turned into an axum [`Response`].
///
/// Several writes (one per aggregate child) are merged into a JSON array.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    status: StatusCode,
    content_type: Option<String>,
    chunks: Vec<Vec<u8>>,
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl BufferedResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            chunks: Vec::new(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    /// Chunks decoded as UTF-8.
    pub fn texts(&self) -> Vec<String> {
        self.chunks
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect()
    }

    /// Record a rendered response without going through the async write.
    pub fn push(&mut self, rendered: RenderedResponse) {
        self.status = rendered.status;
        if let Some(body) = rendered.body {
            self.content_type = Some(CONTENT_TYPE_JSON.to_string());
            self.chunks.push(body.into_bytes());
        }
    }

    fn merged_body(chunks: Vec<Vec<u8>>) -> Body {
        match chunks.len() {
            0 => Body::empty(),
            1 => Body::from(chunks.into_iter().next().unwrap_or_default()),
            _ => {
                let len = chunks.iter().map(Vec::len).sum::<usize>() + chunks.len() + 1;
                let mut merged = Vec::with_capacity(len);
                merged.push(b'[');
                for (i, chunk) in chunks.iter().enumerate() {
                    if i > 0 {
                        merged.push(b',');
                    }
                    merged.extend_from_slice(chunk);
                }
                merged.push(b']');
                Body::from(merged)
            }
        }
    }
}

#[async_trait]
impl ResponseSink for BufferedResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.chunks.push(bytes.to_vec());
        Ok(())
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Self::merged_body(self.chunks));
        *response.status_mut() = self.status;
        if let Some(content_type) = self
            .content_type
            .and_then(|value| HeaderValue::from_str(&value).ok())
        {
            response.headers_mut().insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_single_write_is_sent_verbatim() {
        let mut sink = BufferedResponse::default();
        sink.set_status(StatusCode::BAD_REQUEST);
        sink.set_content_type(CONTENT_TYPE_JSON);
        sink.write(br#"{"message":"bad"}"#).await.unwrap();

        let response = sink.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            CONTENT_TYPE_JSON
        );
        assert_eq!(body_text(response).await, r#"{"message":"bad"}"#);
    }

    #[tokio::test]
    async fn test_multiple_writes_become_array() {
        let mut sink = BufferedResponse::new(StatusCode::OK);
        sink.write(br#"{"a":1}"#).await.unwrap();
        sink.write(br#"{"b":2}"#).await.unwrap();

        let response = sink.into_response();
        assert_eq!(body_text(response).await, r#"[{"a":1},{"b":2}]"#);
    }

    #[tokio::test]
    async fn test_resolution_into_response() {
        let resolution = Resolution {
            status: StatusCode::BAD_REQUEST,
            responses: vec![
                RenderedResponse::empty(StatusCode::INTERNAL_SERVER_ERROR),
                RenderedResponse::json(StatusCode::BAD_REQUEST, r#"{"key":"K"}"#.to_string()),
            ],
        };
        assert_eq!(resolution.bodies().count(), 1);

        let response = resolution.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, r#"{"key":"K"}"#);
    }

    #[tokio::test]
    async fn test_ignored_response_has_no_body() {
        let response = Resolution::single(RenderedResponse::empty(StatusCode::NO_CONTENT)).into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(body_text(response).await, "");
    }
}
