mod auth;
mod rate_limiter;

pub(crate) use auth::{AuthConfig, AuthLayer};
pub(crate) use rate_limiter::RateLimiterConfig;
