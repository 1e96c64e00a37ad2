use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    Json,
    body::Body,
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower::{Layer, Service};

/// Bearer-token access control for the operator endpoints.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AuthConfig {
    /// Tokens accepted in the `Authorization: Bearer <token>` header. An
    /// empty list disables the protected endpoints entirely.
    #[serde(default)]
    pub access_tokens: Vec<String>,
}

impl AuthConfig {
    pub(crate) fn build_layer(&self) -> AuthLayer {
        AuthLayer {
            config: self.clone(),
        }
    }

    pub(crate) fn is_token_allowed(&self, token: &str) -> bool {
        !token.is_empty() && self.access_tokens.iter().any(|allowed| allowed == token)
    }
}

#[derive(Clone)]
pub(crate) struct AuthLayer {
    config: AuthConfig,
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            config: self.config.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct AuthService<S> {
    inner: S,
    config: AuthConfig,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let config = self.config.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let token = bearer_token(&req);

            match token {
                Some(token) if config.is_token_allowed(token) => inner.call(req).await,
                _ => {
                    tracing::warn!(path = %req.uri().path(), "request rejected: missing or unknown access token");
                    Ok(unauthorized_response())
                }
            }
        })
    }
}

fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Unauthorized",
        })),
    )
        .into_response()
}
