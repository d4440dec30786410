//! Authentication and session handling

pub mod cookie;
pub mod jwt;
pub mod middleware;
pub mod models;

pub use cookie::{SameSite, SessionCookie, TOKEN_COOKIE};
pub use jwt::{TokenService, VerificationError, DEFAULT_TOKEN_TTL_SECS};
pub use middleware::{
    ensure_owner, require_session, AccessChain, Gatekeeper, RequestContext, SessionUser, Stage,
};
pub use models::{validate_email, IdentityClaim, SessionResponse};
