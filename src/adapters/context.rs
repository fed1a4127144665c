use {
    crate::domain::{
        audit::{Actor, RequestOrigin, UNKNOWN},
        error::ActivityError,
        id::AccountId,
    },
    axum::{
        extract::FromRequestParts,
        http::{HeaderMap, request::Parts},
    },
    std::convert::Infallible,
};

pub const ACTOR_ID: &str = "x-actor-id";
pub const ACTOR_NAME: &str = "x-actor-name";
pub const ACTOR_EMAIL: &str = "x-actor-email";

/// Who is calling and from where. Identity is asserted by the upstream
/// authentication proxy; a request without `x-actor-id` is anonymous.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub actor: Option<Actor>,
    pub origin: RequestOrigin,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let actor = header(headers, ACTOR_ID)
            .and_then(|id| AccountId::new(id).ok())
            .map(|id| {
                Actor::new(
                    id,
                    header(headers, ACTOR_NAME).unwrap_or(UNKNOWN),
                    header(headers, ACTOR_EMAIL).unwrap_or(UNKNOWN),
                )
            });

        let ip_address = header(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header(headers, "x-real-ip"))
            .map(str::to_string);

        Self {
            actor,
            origin: RequestOrigin {
                ip_address,
                user_agent: header(headers, "user-agent").map(str::to_string),
            },
        }
    }

    pub fn require_actor(&self) -> Result<&Actor, ActivityError> {
        self.actor.as_ref().ok_or(ActivityError::MissingActor)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.origin.ip_address.as_deref(), Some("203.0.113.7"));
        assert!(ctx.actor.is_none());
    }

    #[test]
    fn actor_headers_build_an_actor() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID, HeaderValue::from_static("admin-1"));
        headers.insert(ACTOR_NAME, HeaderValue::from_static("Ada"));
        let ctx = RequestContext::from_headers(&headers);
        let actor = ctx.require_actor().unwrap();
        assert_eq!(actor.id.as_str(), "admin-1");
        assert_eq!(actor.name, "Ada");
        assert_eq!(actor.email, UNKNOWN);
        assert_eq!(ctx.origin.ip_or_unknown(), UNKNOWN);
    }
}
