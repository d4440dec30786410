//! Authentication middleware and request gates
//!
//! A request is checked by an ordered list of stages. Each stage receives the
//! request context and either hands back a (possibly enriched) context for
//! the next stage or an error that becomes the terminal response.

use crate::auth::{IdentityClaim, SessionCookie, TokenService};
use crate::error::{Error, Result};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::HOST, request::Parts, HeaderMap, Method, Uri},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::sync::Arc;

/// What the gates know about a request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub host: Option<String>,
    pub path: String,
    /// Session token read from the cookie, if any
    pub token: Option<String>,
    /// Set once the token has been verified
    pub user: Option<IdentityClaim>,
}

impl RequestContext {
    pub fn from_parts(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        let host = headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.host().map(str::to_string));

        Self {
            method: method.clone(),
            host,
            path: uri.path().to_string(),
            token: SessionCookie::extract(headers),
            user: None,
        }
    }
}

/// A single gate in the chain
pub type Stage = fn(&TokenService, RequestContext) -> Result<RequestContext>;

/// Record the request. Never rejects.
pub fn log_request(_tokens: &TokenService, ctx: RequestContext) -> Result<RequestContext> {
    tracing::info!(
        method = %ctx.method,
        host = ctx.host.as_deref().unwrap_or("-"),
        path = %ctx.path,
        "gated request"
    );
    Ok(ctx)
}

/// Reject requests that carry no session cookie
pub fn require_token(_tokens: &TokenService, ctx: RequestContext) -> Result<RequestContext> {
    if ctx.token.is_none() {
        return Err(Error::MissingToken);
    }
    Ok(ctx)
}

/// Verify the session token and attach the identity it carries
pub fn verify_token(tokens: &TokenService, mut ctx: RequestContext) -> Result<RequestContext> {
    let token = ctx.token.as_deref().ok_or(Error::MissingToken)?;
    let user = tokens.verify(token).map_err(|e| {
        tracing::debug!(path = %ctx.path, reason = %e, "Rejected session token");
        Error::InvalidToken(e)
    })?;
    ctx.user = Some(user);
    Ok(ctx)
}

/// Ownership check: the caller must be the email named by the route
pub fn ensure_owner(user: &IdentityClaim, email: &str) -> Result<()> {
    if user.owns(email) {
        Ok(())
    } else {
        tracing::debug!(caller = %user.email, owner = %email, "Ownership mismatch");
        Err(Error::Forbidden)
    }
}

/// Ordered list of stages applied one after another
#[derive(Clone)]
pub struct AccessChain {
    stages: Vec<Stage>,
}

impl AccessChain {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Log, require a cookie, verify the token
    pub fn standard() -> Self {
        Self::new(vec![
            log_request as Stage,
            require_token as Stage,
            verify_token as Stage,
        ])
    }

    pub fn run(&self, tokens: &TokenService, ctx: RequestContext) -> Result<RequestContext> {
        self.stages
            .iter()
            .try_fold(ctx, |ctx, stage| stage(tokens, ctx))
    }
}

/// Token service plus the chain that guards session-only routes
pub struct Gatekeeper {
    tokens: TokenService,
    chain: AccessChain,
}

impl Gatekeeper {
    pub fn new(tokens: TokenService, chain: AccessChain) -> Self {
        Self { tokens, chain }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Run the chain and return the verified identity
    pub fn authenticate(&self, ctx: RequestContext) -> Result<IdentityClaim> {
        self.chain
            .run(&self.tokens, ctx)?
            .user
            .ok_or(Error::MissingToken)
    }
}

/// Middleware for requiring a verified session.
///
/// On success the caller's [`IdentityClaim`] is available to handlers
/// through [`SessionUser`].
pub async fn require_session(
    State(gate): State<Arc<Gatekeeper>>,
    mut req: Request,
    next: Next,
) -> std::result::Result<Response, Error> {
    let ctx = RequestContext::from_parts(req.method(), req.uri(), req.headers());
    let user = gate.authenticate(ctx)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Identity attached by [`require_session`]; `None` on routes it does not guard
#[derive(Debug, Clone)]
pub struct SessionUser(pub Option<IdentityClaim>);

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<IdentityClaim>().cloned()))
    }
}
