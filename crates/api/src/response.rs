//! Response accumulation and the single terminal write.
//!
//! A `ResponseWriter` collects status, headers, and cookies while a request
//! is handled. The terminal write methods take `self` by value, so a second
//! write does not compile — one render per request is enforced by move
//! semantics.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};

/// Cookie attributes. Defaults: path `/`, httpOnly on, not secure,
/// SameSite=Lax.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub path: String,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: String,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: None,
            secure: false,
            http_only: true,
            same_site: "Lax".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    cookies: Vec<(String, String, CookieOptions)>,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    /// Fresh writer with JSON content type and permissive CORS headers.
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        );

        Self {
            status: StatusCode::OK,
            headers,
            cookies: Vec::new(),
        }
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(name, "dropping invalid header"),
        }
        self
    }

    pub fn cookie(&mut self, name: &str, value: &str, options: CookieOptions) -> &mut Self {
        self.cookies.push((name.to_string(), value.to_string(), options));
        self
    }

    /// Expire a cookie on the client.
    pub fn clear_cookie(&mut self, name: &str) -> &mut Self {
        self.cookie(
            name,
            "",
            CookieOptions {
                max_age: Some(0),
                ..Default::default()
            },
        )
    }

    /// Terminal write: the success envelope.
    pub fn success(self, data: Value, message: &str) -> Response {
        self.json(&json!({
            "status": 200,
            "success": true,
            "message": message,
            "data": data,
        }))
    }

    /// Terminal write: an arbitrary JSON body with the accumulated status,
    /// headers, and cookies.
    pub fn json(self, body: &Value) -> Response {
        let payload = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

        let mut response = Response::new(Body::from(payload));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        for (name, value, options) in &self.cookies {
            match HeaderValue::from_str(&render_cookie(name, value, options)) {
                Ok(header_value) => {
                    response.headers_mut().append(header::SET_COOKIE, header_value);
                }
                Err(_) => tracing::warn!(name, "dropping unrenderable cookie"),
            }
        }

        response
    }
}

fn render_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut rendered = format!("{name}={value}");

    if let Some(max_age) = options.max_age {
        rendered.push_str(&format!("; Max-Age={max_age}"));
    }
    rendered.push_str(&format!("; Path={}", options.path));
    if let Some(domain) = &options.domain {
        rendered.push_str(&format!("; Domain={domain}"));
    }
    if options.secure {
        rendered.push_str("; Secure");
    }
    if options.http_only {
        rendered.push_str("; HttpOnly");
    }
    rendered.push_str(&format!("; SameSite={}", options.same_site));

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_renders_the_envelope() {
        let writer = ResponseWriter::new();
        let response = writer.success(json!({"id": 1}), "done");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = body_json(response).await;
        assert_eq!(body["status"], 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "done");
        assert_eq!(body["data"]["id"], 1);
    }

    #[tokio::test]
    async fn status_and_headers_accumulate_until_the_write() {
        let mut writer = ResponseWriter::new();
        writer.status(StatusCode::NOT_FOUND);
        writer.set_header("X-Request-Id", "abc");

        let response = writer.json(&json!({"error": "nope"}));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("X-Request-Id").unwrap(), "abc");
    }

    #[tokio::test]
    async fn cookies_render_with_their_attributes() {
        let mut writer = ResponseWriter::new();
        writer.cookie(
            "storefront_session",
            "tok123",
            CookieOptions {
                max_age: Some(1209600),
                secure: true,
                ..Default::default()
            },
        );

        let response = writer.json(&json!({}));
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();

        assert_eq!(
            cookie,
            "storefront_session=tok123; Max-Age=1209600; Path=/; Secure; HttpOnly; SameSite=Lax"
        );
    }

    #[tokio::test]
    async fn clear_cookie_expires_immediately() {
        let mut writer = ResponseWriter::new();
        writer.clear_cookie("storefront_session");

        let response = writer.json(&json!({}));
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();

        assert!(cookie.starts_with("storefront_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn multiple_cookies_produce_multiple_headers() {
        let mut writer = ResponseWriter::new();
        writer.cookie("a", "1", CookieOptions::default());
        writer.cookie("b", "2", CookieOptions::default());

        let response = writer.json(&json!({}));
        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 2);
    }
}
