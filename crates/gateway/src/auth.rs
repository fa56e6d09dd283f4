//! Password hashing, session tokens, and the session-cookie extractor.

use {
    argon2::{
        Argon2,
        password_hash::{
            PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
        },
    },
    axum::{
        extract::FromRequestParts,
        http::{HeaderMap, header::COOKIE, request::Parts},
    },
    sha2::{Digest, Sha256},
    telegpick_store::types::User,
};

use crate::{error::ApiError, state::AppState};

/// Name of the HttpOnly session cookie.
pub const SESSION_COOKIE: &str = "telegpick_session";

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash_str: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash_str) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Random 256-bit session token, base64url without padding.
pub fn generate_token() -> String {
    use {base64::Engine, rand::RngCore};

    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Random 6-digit Telegram link code.
pub fn generate_link_code() -> String {
    use rand::Rng;

    rand::rng().random_range(100_000..1_000_000).to_string()
}

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Pull the session token out of the request's cookie headers.
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
}

/// The authenticated account, resolved from the session cookie.
///
/// Every pic and schedule route takes this extractor; a missing, unknown, or
/// expired session is a 401 before the handler body runs.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        state
            .users
            .user_for_session(&token)
            .await?
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not a phc string"));
    }

    #[test]
    fn tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.len() >= 40);
    }

    #[test]
    fn link_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_link_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn sha256_hex_is_stable() {
        assert_eq!(sha256_hex("123456"), sha256_hex("123456"));
        assert_ne!(sha256_hex("123456"), sha256_hex("654321"));
        assert_eq!(sha256_hex("123456").len(), 64);
    }

    #[test]
    fn session_token_parsed_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; telegpick_session=tok123; theme=dark"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("tok123"));

        headers.clear();
        headers.insert(COOKIE, HeaderValue::from_static("other=1"));
        assert!(session_token(&headers).is_none());
    }
}
