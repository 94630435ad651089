//! Compact HS256 bearer tokens (`header.payload.signature`, base64url).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use super::AuthError;
use crate::error::{CrmError, Result};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";
const MAX_TOKEN_LEN: usize = 2048;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the user the token was issued to
    pub id: Uuid,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

pub fn encode_token(claims: &Claims, secret: &[u8]) -> Result<String> {
    let header = serde_json::to_vec(&Header {
        alg: ALGORITHM.to_string(),
        typ: TOKEN_TYPE.to_string(),
    })?;
    let payload = serde_json::to_vec(claims)?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| CrmError::Config(format!("unusable signing secret: {}", e)))?;
    mac.update(signing_input.as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, sig))
}

/// Verify signature, algorithm and expiry, in that order.
pub fn decode_token(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> std::result::Result<Claims, AuthError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(AuthError::InvalidToken);
    }
    let mut parts = token.split('.');
    let (Some(header_part), Some(payload_part), Some(sig_part), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| AuthError::InvalidToken)?;
    mac.update(header_part.as_bytes());
    mac.update(b".");
    mac.update(payload_part.as_bytes());
    let expected = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|_| AuthError::InvalidToken)?;
    mac.verify_slice(&expected)
        .map_err(|_| AuthError::InvalidToken)?;

    let header: Header = decode_part(header_part)?;
    if header.alg != ALGORITHM {
        return Err(AuthError::InvalidToken);
    }

    let claims: Claims = decode_part(payload_part)?;
    if now.timestamp() >= claims.exp {
        return Err(AuthError::ExpiredToken);
    }
    Ok(claims)
}

fn decode_part<T: serde::de::DeserializeOwned>(part: &str) -> std::result::Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| AuthError::InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &[u8] = b"test-secret";

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn claims() -> Claims {
        Claims {
            id: Uuid::new_v4(),
            iat: 1_000,
            exp: 2_000,
        }
    }

    #[test]
    fn test_encode_then_verify() {
        let c = claims();
        let token = encode_token(&c, SECRET).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(decode_token(&token, SECRET, t(1_500)).unwrap(), c);
    }

    #[test]
    fn test_expired_token() {
        let token = encode_token(&claims(), SECRET).unwrap();
        assert_eq!(
            decode_token(&token, SECRET, t(2_000)).unwrap_err(),
            AuthError::ExpiredToken
        );
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = encode_token(&claims(), SECRET).unwrap();
        assert_eq!(
            decode_token(&token, b"other", t(1_500)).unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let token = encode_token(&claims(), SECRET).unwrap();
        let forged = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims {
                exp: i64::MAX,
                ..claims()
            })
            .unwrap(),
        );
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged;
        assert_eq!(
            decode_token(&parts.join("."), SECRET, t(1_500)).unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[test]
    fn test_malformed_shapes() {
        for bad in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert_eq!(
                decode_token(bad, SECRET, t(0)).unwrap_err(),
                AuthError::InvalidToken,
                "{bad}"
            );
        }
    }
}
