//! The dispatcher: parses, routes, authenticates, invokes, renders.
//!
//! One request is handled start-to-finish by one worker; every await in the
//! pipeline is sequential. The route table is immutable after startup and
//! shared read-only behind an `Arc`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::Response;
use serde_json::{Value, json};

use storefront_auth::{AuthSession, SESSION_COOKIE, SessionAuthenticator};
use storefront_core::ApiError;
use storefront_infra::{Database, Mailer};

use crate::config::ApiConfig;
use crate::request::{self, RequestContext};
use crate::response::ResponseWriter;
use crate::router::{Access, Router};
use crate::routes;

/// A handler failure: either a recognized taxonomy error or an unexpected
/// fault. Taxonomy errors propagate unmodified to the boundary; everything
/// else is rendered as a generic 500.
#[derive(Debug)]
pub enum Failure {
    Api(ApiError),
    Internal(anyhow::Error),
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        Failure::Api(err)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Failure::Internal(err)
    }
}

/// Shared collaborators, wired once at startup.
pub struct Services {
    pub db: Arc<dyn Database>,
    pub authenticator: SessionAuthenticator,
    pub mailer: Arc<dyn Mailer>,
    pub config: ApiConfig,
}

/// Everything a handler may touch, passed explicitly through the call
/// chain. `auth` is the session capability; it is `Some` exactly when the
/// matched route was registered as authenticated.
pub struct HandlerCx<'a> {
    pub services: &'a Services,
    pub request: &'a RequestContext,
    pub response: &'a mut ResponseWriter,
    pub auth: Option<AuthSession>,
}

impl HandlerCx<'_> {
    /// The authenticated session. Handlers on authenticated routes can rely
    /// on this; on a public route it is a contract violation reported as an
    /// authentication failure rather than a panic.
    pub fn session(&self) -> Result<&AuthSession, Failure> {
        self.auth
            .as_ref()
            .ok_or_else(|| ApiError::authentication("Authentication required").into())
    }

    pub fn db(&self) -> Arc<dyn Database> {
        self.services.db.clone()
    }
}

pub struct Dispatcher {
    router: Router,
    services: Arc<Services>,
}

impl Dispatcher {
    pub fn new(router: Router, services: Arc<Services>) -> Self {
        Self { router, services }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        let raw_query = parts.uri.query().map(str::to_string);
        let headers = parts.headers;

        let mut writer = ResponseWriter::new();
        tracing::debug!(%method, %path, "dispatching request");

        // GET and DELETE carry no body; the size cap applies while reading.
        let bytes = if method == Method::GET || method == Method::DELETE {
            Bytes::new()
        } else {
            let limit = self.services.config.upload_max_size + 1;
            match axum::body::to_bytes(body, limit).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return self.render_failure(
                        writer,
                        ApiError::payload_too_large("Request body too large").into(),
                    );
                }
            }
        };

        let decoded = match request::decode_body(
            &method,
            &headers,
            bytes,
            self.services.config.upload_max_size,
        )
        .await
        {
            Ok(decoded) => decoded,
            Err(err) => return self.render_failure(writer, err.into()),
        };

        let mut ctx =
            RequestContext::new(method.clone(), path.clone(), headers, raw_query.as_deref(), decoded);

        let Some(matched) = self.router.resolve(&method, &path) else {
            tracing::info!(%method, %path, "no route matched");
            writer.status(StatusCode::NOT_FOUND);
            return writer.json(&json!({ "error": "Route not found", "path": path }));
        };

        let auth = if matched.access == Access::Authenticated {
            match self
                .services
                .authenticator
                .authenticate(ctx.cookie(SESSION_COOKIE))
                .await
            {
                Ok(session) => Some(session),
                Err(err) => {
                    tracing::warn!(%method, %path, "authentication failed");
                    return self.render_failure(writer, err.into());
                }
            }
        } else {
            None
        };

        ctx.set_params(matched.params);

        let outcome = {
            let mut cx = HandlerCx {
                services: &self.services,
                request: &ctx,
                response: &mut writer,
                auth,
            };
            routes::invoke(matched.handler, &mut cx).await
        };

        match outcome {
            Ok(reply) => {
                tracing::info!(%method, %path, "request completed");
                writer.success(reply.data, &reply.message)
            }
            Err(failure) => self.render_failure(writer, failure),
        }
    }

    /// Render a failure as the terminal write. Taxonomy errors keep their
    /// kind and status; anything else becomes a generic 500. Underlying
    /// messages reach the client only in development mode.
    fn render_failure(&self, mut writer: ResponseWriter, failure: Failure) -> Response {
        let dev_mode = self.services.config.dev_mode;

        match failure {
            Failure::Api(err) => {
                tracing::warn!(kind = err.kind().name(), error = %err, "request failed");

                let mut body = json!({
                    "error": err.kind().name(),
                    "status": err.http_status(),
                });
                if !err.context().is_empty() {
                    body["details"] = Value::Object(
                        err.context()
                            .iter()
                            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                            .collect(),
                    );
                }
                if dev_mode {
                    body["message"] = Value::String(err.to_string());
                }

                let status = StatusCode::from_u16(err.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                writer.status(status);
                writer.json(&body)
            }
            Failure::Internal(err) => {
                tracing::error!(error = ?err, "unhandled failure");

                let mut body = json!({
                    "error": "Internal Server Error",
                    "status": 500,
                });
                if dev_mode {
                    body["message"] = Value::String(err.to_string());
                }

                writer.status(StatusCode::INTERNAL_SERVER_ERROR);
                writer.json(&body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_auth::InMemorySessionStore;
    use storefront_infra::{LogMailer, MemoryDatabase};

    fn dispatcher(dev_mode: bool) -> Dispatcher {
        let services = Arc::new(Services {
            db: Arc::new(MemoryDatabase::new()),
            authenticator: SessionAuthenticator::new(Arc::new(InMemorySessionStore::new())),
            mailer: Arc::new(LogMailer),
            config: ApiConfig {
                dev_mode,
                ..Default::default()
            },
        });
        Dispatcher::new(Router::new(), services)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn taxonomy_errors_render_kind_and_status() {
        let dispatcher = dispatcher(false);
        let response = dispatcher.render_failure(
            ResponseWriter::new(),
            ApiError::missing_parameters("x required").into(),
        );

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "MissingParameters");
        assert_eq!(body["status"], 400);
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn context_pairs_surface_as_details() {
        let dispatcher = dispatcher(false);
        let response = dispatcher.render_failure(
            ResponseWriter::new(),
            ApiError::not_found("User not found")
                .with_context("userId", "9")
                .into(),
        );

        let body = body_json(response).await;
        assert_eq!(body["details"]["userId"], "9");
    }

    #[tokio::test]
    async fn unexpected_faults_render_as_generic_500() {
        let dispatcher = dispatcher(false);
        let response = dispatcher.render_failure(
            ResponseWriter::new(),
            anyhow::anyhow!("the disk is on fire").into(),
        );

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["status"], 500);
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn development_mode_surfaces_underlying_messages() {
        let dispatcher = dispatcher(true);

        let response = dispatcher.render_failure(
            ResponseWriter::new(),
            anyhow::anyhow!("the disk is on fire").into(),
        );
        let body = body_json(response).await;
        assert_eq!(body["message"], "the disk is on fire");

        let response = dispatcher.render_failure(
            ResponseWriter::new(),
            ApiError::validation("Validation failed").into(),
        );
        let body = body_json(response).await;
        assert_eq!(body["message"], "Validation failed");
    }
}
