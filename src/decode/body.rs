//! Size-limited body readers.
//!
//! [`StreamingDecoder`] consumes the body chunk by chunk and parses multipart bodies
//! incrementally. [`BufferedDecoder`] collects the whole body first, for runtimes where the
//! body only arrives as a single buffer. Both enforce the same limit.

use std::fmt;

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderMap;
use bytesize::ByteSize;
use futures_util::future::BoxFuture;
use futures_util::StreamExt;

use crate::decode::form::FormData;
use crate::decode::multipart::MultipartParser;
use crate::error::ActionError;

/// Reads request bodies for the payload decoder.
pub trait BodyDecoder: Send + Sync + fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn limit(&self) -> ByteSize;

    /// The full body as bytes.
    fn read_bytes(&self, headers: &HeaderMap, body: Body) -> BoxFuture<'static, Result<Bytes, ActionError>>;

    /// A `multipart/form-data` body parsed into fields.
    fn read_multipart(&self, headers: &HeaderMap, body: Body) -> BoxFuture<'static, Result<FormData, ActionError>>;

    /// An `application/x-www-form-urlencoded` body parsed into fields.
    fn read_urlencoded(&self, headers: &HeaderMap, body: Body) -> BoxFuture<'static, Result<FormData, ActionError>> {
        let bytes = self.read_bytes(headers, body);
        Box::pin(async move { Ok(FormData::from_urlencoded(&bytes.await?)) })
    }

    /// The body as UTF-8 text.
    fn read_text(&self, headers: &HeaderMap, body: Body) -> BoxFuture<'static, Result<String, ActionError>> {
        let bytes = self.read_bytes(headers, body);
        Box::pin(async move {
            let bytes = bytes.await?;
            String::from_utf8(bytes.to_vec())
                .map_err(|_| ActionError::malformed("action body is not valid UTF-8"))
        })
    }
}

/// Incremental reader for runtimes with streaming request bodies.
#[derive(Debug, Clone)]
pub struct StreamingDecoder {
    limit: ByteSize,
}

impl StreamingDecoder {
    pub fn new(limit: ByteSize) -> Self {
        Self { limit }
    }
}

impl BodyDecoder for StreamingDecoder {
    fn name(&self) -> &'static str {
        "streaming"
    }

    fn limit(&self) -> ByteSize {
        self.limit
    }

    fn read_bytes(&self, headers: &HeaderMap, body: Body) -> BoxFuture<'static, Result<Bytes, ActionError>> {
        let limit = self.limit;
        let declared = check_declared_length(headers, limit);
        Box::pin(async move {
            declared?;
            collect_limited(body, limit).await
        })
    }

    fn read_multipart(&self, headers: &HeaderMap, body: Body) -> BoxFuture<'static, Result<FormData, ActionError>> {
        let limit = self.limit;
        let declared = check_declared_length(headers, limit);
        let parser = MultipartParser::from_content_type(content_type(headers));
        Box::pin(async move {
            declared?;
            let mut parser = parser?;
            let mut stream = body.into_data_stream();
            let mut received: u64 = 0;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(ActionError::Body)?;
                received += chunk.len() as u64;
                if received > limit.as_u64() {
                    return Err(oversized(limit));
                }
                parser.push(&chunk)?;
            }
            parser.finish()
        })
    }
}

/// Collect-then-parse reader for runtimes with buffered request bodies.
#[derive(Debug, Clone)]
pub struct BufferedDecoder {
    limit: ByteSize,
}

impl BufferedDecoder {
    pub fn new(limit: ByteSize) -> Self {
        Self { limit }
    }
}

impl BodyDecoder for BufferedDecoder {
    fn name(&self) -> &'static str {
        "buffered"
    }

    fn limit(&self) -> ByteSize {
        self.limit
    }

    fn read_bytes(&self, headers: &HeaderMap, body: Body) -> BoxFuture<'static, Result<Bytes, ActionError>> {
        let limit = self.limit;
        let declared = check_declared_length(headers, limit);
        Box::pin(async move {
            declared?;
            collect_limited(body, limit).await
        })
    }

    fn read_multipart(&self, headers: &HeaderMap, body: Body) -> BoxFuture<'static, Result<FormData, ActionError>> {
        let bytes = self.read_bytes(headers, body);
        let parser = MultipartParser::from_content_type(content_type(headers));
        Box::pin(async move {
            let bytes = bytes.await?;
            let mut parser = parser?;
            parser.push(&bytes)?;
            parser.finish()
        })
    }
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn oversized(limit: ByteSize) -> ActionError {
    tracing::warn!(%limit, "Action body exceeded size limit");
    ActionError::OversizedPayload { limit }
}

/// Reject a declared `content-length` above the limit before any bytes are read.
fn check_declared_length(headers: &HeaderMap, limit: ByteSize) -> Result<(), ActionError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    match declared {
        Some(len) if len > limit.as_u64() => Err(oversized(limit)),
        _ => Ok(()),
    }
}

async fn collect_limited(body: Body, limit: ByteSize) -> Result<Bytes, ActionError> {
    let mut stream = body.into_data_stream();
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ActionError::Body)?;
        if (buffer.len() + chunk.len()) as u64 > limit.as_u64() {
            return Err(oversized(limit));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn decoders(limit: u64) -> Vec<Box<dyn BodyDecoder>> {
        vec![
            Box::new(StreamingDecoder::new(ByteSize::b(limit))),
            Box::new(BufferedDecoder::new(ByteSize::b(limit))),
        ]
    }

    fn chunked(chunks: Vec<&'static str>) -> Body {
        let stream = futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, std::io::Error>(Bytes::from_static(c.as_bytes()))),
        );
        Body::from_stream(stream)
    }

    #[tokio::test]
    async fn test_declared_length_rejected_before_reading() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("100"));
        for decoder in decoders(10) {
            let err = decoder
                .read_bytes(&headers, Body::from("tiny"))
                .await
                .unwrap_err();
            assert!(matches!(err, ActionError::OversizedPayload { .. }), "{}", decoder.name());
        }
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit() {
        for decoder in decoders(8) {
            let body = chunked(vec!["1234", "5678", "9"]);
            let err = decoder.read_bytes(&HeaderMap::new(), body).await.unwrap_err();
            assert!(matches!(err, ActionError::OversizedPayload { .. }), "{}", decoder.name());
        }
    }

    #[tokio::test]
    async fn test_body_at_limit() {
        for decoder in decoders(8) {
            let body = chunked(vec!["1234", "5678"]);
            let bytes = decoder.read_bytes(&HeaderMap::new(), body).await.unwrap();
            assert_eq!(&bytes[..], b"12345678");
        }
    }

    #[tokio::test]
    async fn test_urlencoded() {
        for decoder in decoders(1024) {
            let form = decoder
                .read_urlencoded(&HeaderMap::new(), Body::from("a=1&b=two"))
                .await
                .unwrap();
            assert_eq!(form.get_text("b"), Some("two"));
        }
    }

    #[tokio::test]
    async fn test_multipart_in_chunks() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=XyZ"),
        );
        for decoder in decoders(1024) {
            let body = chunked(vec![
                "--XyZ\r\nContent-Disposition: form-data; na",
                "me=\"0\"\r\n\r\n[1,2]\r\n--X",
                "yZ--\r\n",
            ]);
            let form = decoder.read_multipart(&headers, body).await.unwrap();
            assert_eq!(form.get_text("0"), Some("[1,2]"), "{}", decoder.name());
        }
    }

    #[tokio::test]
    async fn test_multipart_without_boundary() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data"));
        for decoder in decoders(1024) {
            let err = decoder
                .read_multipart(&headers, Body::from("x"))
                .await
                .unwrap_err();
            assert!(matches!(err, ActionError::MalformedPayload(_)));
        }
    }
}
