//! Authentication and session tests

use altstocks::auth::{
    AccessChain, Gatekeeper, IdentityClaim, RequestContext, SameSite, SessionCookie,
    TokenService, VerificationError,
};
use altstocks::Error;
use axum::body::Body;
use axum::http::{header::COOKIE, header::SET_COOKIE, HeaderMap, HeaderValue, Method, Uri};
use axum::response::Response;
use serde_json::json;

/// Minimal browser cookie jar: applies Set-Cookie headers from a response
fn apply_set_cookies(jar: &mut HeaderMap, response: &Response) {
    for header in response.headers().get_all(SET_COOKIE) {
        let header = header.to_str().unwrap();
        let pair = header.split(';').next().unwrap();
        let (name, value) = pair.split_once('=').unwrap();
        let expired = header.contains("Max-Age=0");

        if name == "token" {
            if expired {
                jar.remove(COOKIE);
            } else {
                jar.insert(COOKIE, HeaderValue::from_str(&format!("token={}", value)).unwrap());
            }
        }
    }
}

#[test]
fn test_jwt_token_format() {
    let tokens = TokenService::with_default_ttl(b"secret");
    let token = tokens
        .issue(&IdentityClaim::new("alice@example.com"))
        .expect("Failed to issue token");
    assert!(!token.is_empty());
    assert_eq!(token.split('.').count(), 3); // JWT format: header.payload.signature
}

#[test]
fn test_round_trip_preserves_claim() {
    let tokens = TokenService::with_default_ttl(b"secret");
    let claim: IdentityClaim = serde_json::from_value(json!({
        "email": "alice@example.com",
        "displayName": "Alice",
        "photoURL": "https://img.example.com/alice.png"
    }))
    .unwrap();

    let token = tokens.issue(&claim).expect("Failed to issue token");
    assert_eq!(tokens.verify(&token), Ok(claim));
}

#[test]
fn test_altered_signature_rejected() {
    let tokens = TokenService::with_default_ttl(b"secret");
    let token = tokens
        .issue(&IdentityClaim::new("alice@example.com"))
        .unwrap();

    let (unsigned, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{}.{}{}", unsigned, flipped, &signature[1..]);

    assert!(tokens.verify(&tampered).is_err());
}

#[test]
fn test_altered_payload_rejected() {
    let tokens = TokenService::with_default_ttl(b"secret");
    let alice = tokens.issue(&IdentityClaim::new("alice@example.com")).unwrap();
    let bob = tokens.issue(&IdentityClaim::new("bob@example.com")).unwrap();

    // Bob's payload under Alice's signature
    let alice_parts: Vec<&str> = alice.split('.').collect();
    let bob_parts: Vec<&str> = bob.split('.').collect();
    let spliced = format!("{}.{}.{}", alice_parts[0], bob_parts[1], alice_parts[2]);

    assert_eq!(
        tokens.verify(&spliced),
        Err(VerificationError::InvalidSignature)
    );
}

#[test]
fn test_malformed_token_rejection() {
    let tokens = TokenService::with_default_ttl(b"secret");
    assert_eq!(
        tokens.verify("not-a-jwt-token"),
        Err(VerificationError::Malformed)
    );
    assert_eq!(tokens.verify(""), Err(VerificationError::Malformed));
}

#[test]
fn test_multiple_token_generation() {
    let tokens = TokenService::with_default_ttl(b"secret");
    let token1 = tokens.issue(&IdentityClaim::new("alice@example.com")).unwrap();
    let token2 = tokens.issue(&IdentityClaim::new("bob@example.com")).unwrap();

    // Tokens should be different
    assert_ne!(token1, token2);
    assert_eq!(tokens.verify(&token1).unwrap().email, "alice@example.com");
    assert_eq!(tokens.verify(&token2).unwrap().email, "bob@example.com");
}

#[test]
fn test_cookie_extract_after_attach_and_clear() {
    let cookie = SessionCookie::new(true, SameSite::None, 3600);
    let mut jar = HeaderMap::new();

    let mut login = Response::new(Body::empty());
    cookie.attach(&mut login, "abc.def.ghi").unwrap();
    apply_set_cookies(&mut jar, &login);
    assert_eq!(SessionCookie::extract(&jar), Some("abc.def.ghi".to_string()));

    let mut logout = Response::new(Body::empty());
    cookie.clear(&mut logout);
    apply_set_cookies(&mut jar, &logout);
    assert_eq!(SessionCookie::extract(&jar), None);

    // Clearing again is harmless
    let mut again = Response::new(Body::empty());
    cookie.clear(&mut again);
    apply_set_cookies(&mut jar, &again);
    assert_eq!(SessionCookie::extract(&jar), None);
}

#[test]
fn test_gatekeeper_error_taxonomy() {
    let gate = Gatekeeper::new(TokenService::with_default_ttl(b"secret"), AccessChain::standard());
    let uri: Uri = "/myQueries/alice@example.com".parse().unwrap();

    let no_cookie = RequestContext::from_parts(&Method::GET, &uri, &HeaderMap::new());
    assert!(matches!(gate.authenticate(no_cookie), Err(Error::MissingToken)));

    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_static("token=bogus"));
    let bad_cookie = RequestContext::from_parts(&Method::GET, &uri, &headers);
    assert!(matches!(
        gate.authenticate(bad_cookie),
        Err(Error::InvalidToken(VerificationError::Malformed))
    ));
}
