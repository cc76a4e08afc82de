//! Bridges an axum request/response pair onto the stream-shaped surface the
//! transport engine writes against.
//!
//! The engine sees an [`AdaptedRequest`] (method, lowercased headers, path)
//! and writes into a [`ServerResponse`]. [`AdaptedResponse`] records status,
//! headers and body chunks so the router can turn them into a real response
//! once the engine is done.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, Method, Uri};
use bytes::Bytes;

/// Listener registered through the event-hook surface of [`ServerResponse`].
pub type Listener = Box<dyn FnMut() + Send>;

/// Request view handed to the engine.
#[derive(Debug, Clone)]
pub struct AdaptedRequest {
    method: Method,
    path: String,
    headers: BTreeMap<String, String>,
}

impl AdaptedRequest {
    pub fn new(method: Method, uri: &Uri, headers: &HeaderMap) -> Self {
        let pairs = headers.iter().filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        });
        Self::from_parts(method, uri.path(), pairs)
    }

    /// Build from raw parts. Header names are lowercased, repeated headers
    /// are joined with `", "` and any query string is dropped from the path.
    pub fn from_parts<I, K, V>(method: Method, target: &str, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let name = name.as_ref().to_ascii_lowercase();
            let value = value.as_ref();
            map.entry(name)
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let path = target.split('?').next().unwrap_or_default().to_string();

        Self {
            method,
            path,
            headers: map,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

/// The response surface the engine writes into.
///
/// Event hooks exist so engine code that subscribes to response lifecycle
/// events keeps working; the buffered implementation accepts and ignores
/// them.
pub trait ServerResponse: Send {
    fn status_code(&self) -> u16;
    fn set_status_code(&mut self, status: u16);

    fn set_header(&mut self, name: &str, value: &str);
    fn get_header(&self, name: &str) -> Option<&str>;
    fn remove_header(&mut self, name: &str);

    /// Set status and merge headers. Only the first call has effect.
    fn write_head(&mut self, status: u16, headers: &[(&str, &str)]);

    /// Append a body chunk. Returns `false` once the response has ended.
    fn write(&mut self, chunk: Bytes) -> bool;

    /// Finish the response, optionally with a last chunk.
    fn end(&mut self, chunk: Option<Bytes>);

    fn headers_sent(&self) -> bool;
    fn finished(&self) -> bool;

    fn on(&mut self, _event: &str, _listener: Listener) {}
    fn once(&mut self, _event: &str, _listener: Listener) {}
    fn emit(&mut self, _event: &str) -> bool {
        false
    }
    fn remove_listener(&mut self, _event: &str) {}
}

/// Everything the engine produced for one request.
#[derive(Debug, Clone, Default)]
pub struct DrainedResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub chunks: Vec<Bytes>,
}

impl DrainedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_event_stream(&self) -> bool {
        self.header("content-type")
            .is_some_and(|ct| ct.starts_with("text/event-stream"))
    }

    /// All chunks concatenated in write order.
    pub fn body(&self) -> Vec<u8> {
        self.chunks.concat()
    }
}

/// Recording implementation of [`ServerResponse`].
#[derive(Debug)]
pub struct AdaptedResponse {
    status: u16,
    headers: BTreeMap<String, String>,
    chunks: Vec<Bytes>,
    headers_sent: bool,
    finished: bool,
}

impl Default for AdaptedResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            chunks: Vec::new(),
            headers_sent: false,
            finished: false,
        }
    }
}

impl AdaptedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(self) -> DrainedResponse {
        DrainedResponse {
            status: self.status,
            headers: self.headers,
            chunks: self.chunks,
        }
    }
}

impl ServerResponse for AdaptedResponse {
    fn status_code(&self) -> u16 {
        self.status
    }

    fn set_status_code(&mut self, status: u16) {
        if !self.headers_sent {
            self.status = status;
        }
    }

    fn set_header(&mut self, name: &str, value: &str) {
        if self.headers_sent {
            tracing::warn!(header = name, "Header set after head was written");
            return;
        }
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn remove_header(&mut self, name: &str) {
        if !self.headers_sent {
            self.headers.remove(&name.to_ascii_lowercase());
        }
    }

    fn write_head(&mut self, status: u16, headers: &[(&str, &str)]) {
        if self.headers_sent {
            return;
        }
        self.status = status;
        for (name, value) in headers {
            self.headers
                .insert(name.to_ascii_lowercase(), (*value).to_string());
        }
        self.headers_sent = true;
    }

    fn write(&mut self, chunk: Bytes) -> bool {
        if self.finished {
            return false;
        }
        self.headers_sent = true;
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
        true
    }

    fn end(&mut self, chunk: Option<Bytes>) {
        if self.finished {
            return;
        }
        if let Some(chunk) = chunk {
            self.write(chunk);
        }
        self.headers_sent = true;
        self.finished = true;
    }

    fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    fn finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers_are_normalized() {
        let req = AdaptedRequest::from_parts(
            Method::POST,
            "/mcp?debug=1",
            [
                ("Content-Type", "application/json"),
                ("Accept", "application/json"),
                ("accept", "text/event-stream"),
            ],
        );
        assert_eq!(req.path(), "/mcp");
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(req.header("accept"), Some("application/json, text/event-stream"));
        assert_eq!(req.header("mcp-session-id"), None);
    }

    #[test]
    fn test_request_from_header_map() {
        let mut headers = HeaderMap::new();
        headers.insert("mcp-session-id", "abc".parse().unwrap());
        let uri: Uri = "/mcp?x=1".parse().unwrap();
        let req = AdaptedRequest::new(Method::DELETE, &uri, &headers);
        assert_eq!(req.method(), Method::DELETE);
        assert_eq!(req.path(), "/mcp");
        assert_eq!(req.header("Mcp-Session-Id"), Some("abc"));
    }

    #[test]
    fn test_response_records_head_and_chunks() {
        let mut res = AdaptedResponse::new();
        assert_eq!(res.status_code(), 200);
        res.set_header("X-Custom", "1");
        res.write_head(202, &[("Content-Type", "text/event-stream")]);
        assert!(res.headers_sent());

        // Head is frozen once written.
        res.write_head(500, &[]);
        res.set_header("late", "x");
        assert_eq!(res.status_code(), 202);
        assert_eq!(res.get_header("late"), None);

        assert!(res.write(Bytes::from_static(b"a")));
        res.end(Some(Bytes::from_static(b"b")));
        assert!(!res.write(Bytes::from_static(b"c")));

        let drained = res.drain();
        assert_eq!(drained.status, 202);
        assert_eq!(drained.header("x-custom"), Some("1"));
        assert!(drained.is_event_stream());
        assert_eq!(drained.body(), b"ab");
    }

    #[test]
    fn test_event_hooks_are_accepted() {
        let mut res = AdaptedResponse::new();
        res.on("close", Box::new(|| {}));
        res.once("finish", Box::new(|| {}));
        assert!(!res.emit("close"));
        res.remove_listener("close");
        assert!(!res.finished());
    }
}
