//! Token introspection for the subscription identity.
//!
//! Managed identity tokens carry an `xms_az_rid` claim holding the ARM
//! resource id of the calling resource:
//! `/subscriptions/{id}/resourcegroups/{group}/providers/...`.
//! The payload is decoded without verifying the signature; the token is only
//! inspected, never trusted for authorization.

use std::sync::OnceLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;
use serde_json::{Map, Value};

use super::token::{AccessToken, CredentialError};

/// Claim holding the caller's ARM resource id.
pub const RESOURCE_ID_CLAIM: &str = "xms_az_rid";

/// Pattern capturing the subscription segment of an ARM resource id.
fn subscription_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)/subscriptions/([^/]+)/resourcegroups").unwrap())
}

/// Decodes the JSON claims of a JWT.
pub fn decode_claims(token: &str) -> Result<Map<String, Value>, CredentialError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| CredentialError::InvalidToken("not a JWT".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| CredentialError::InvalidToken(format!("payload is not base64url: {}", e)))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(CredentialError::InvalidToken(
            "payload is not a JSON object".to_string(),
        )),
        Err(e) => Err(CredentialError::InvalidToken(format!(
            "payload is not JSON: {}",
            e
        ))),
    }
}

/// Extracts the subscription id from an ARM resource id.
///
/// # Examples
///
/// ```
/// use ptu_capacity::auth::subscription_from_resource_id;
///
/// let rid = "/subscriptions/1234-abcd/resourcegroups/rg/providers/Microsoft.Web/sites/app";
/// assert_eq!(subscription_from_resource_id(rid).as_deref(), Some("1234-abcd"));
/// assert_eq!(subscription_from_resource_id("/tenants/x"), None);
/// ```
pub fn subscription_from_resource_id(resource_id: &str) -> Option<String> {
    subscription_pattern()
        .captures(resource_id)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Reads the subscription id embedded in a token's `xms_az_rid` claim.
pub fn subscription_from_token(token: &AccessToken) -> Result<String, CredentialError> {
    let claims = decode_claims(&token.token)?;
    claims
        .get(RESOURCE_ID_CLAIM)
        .and_then(Value::as_str)
        .and_then(subscription_from_resource_id)
        .ok_or(CredentialError::SubscriptionNotFound)
}

/// Reads the `exp` claim of a JWT, if present.
pub(crate) fn expiry_from_jwt(token: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    decode_claims(token)
        .ok()
        .and_then(|claims| claims.get("exp").and_then(super::token::parse_epoch))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Builds an unsigned JWT carrying `claims`.
    pub fn fake_jwt(claims: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_decode_claims() {
        let jwt = fake_jwt(json!({"aud": "https://management.azure.com", "exp": 1700000000}));
        let claims = decode_claims(&jwt).unwrap();
        assert_eq!(claims["aud"], "https://management.azure.com");
    }

    #[test]
    fn test_decode_claims_rejects_garbage() {
        assert!(matches!(
            decode_claims("opaque-token"),
            Err(CredentialError::InvalidToken(_))
        ));
        assert!(matches!(
            decode_claims("a.!!!.c"),
            Err(CredentialError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_subscription_from_token() {
        let jwt = fake_jwt(json!({
            "xms_az_rid": "/subscriptions/0000-1111/resourcegroups/ptu-rg/providers/Microsoft.Web/sites/ptu-func"
        }));
        let token = AccessToken::new(jwt, None);
        assert_eq!(subscription_from_token(&token).unwrap(), "0000-1111");
    }

    #[test]
    fn test_subscription_match_is_case_insensitive() {
        let rid = "/Subscriptions/ABC/resourceGroups/rg";
        assert_eq!(subscription_from_resource_id(rid).as_deref(), Some("ABC"));
    }

    #[test]
    fn test_subscription_missing_claim() {
        let jwt = fake_jwt(json!({"oid": "x"}));
        let token = AccessToken::new(jwt, None);
        assert_eq!(
            subscription_from_token(&token),
            Err(CredentialError::SubscriptionNotFound)
        );
    }

    #[test]
    fn test_expiry_from_jwt() {
        let jwt = fake_jwt(json!({"exp": 1700000000}));
        assert_eq!(
            expiry_from_jwt(&jwt),
            chrono::DateTime::from_timestamp(1_700_000_000, 0)
        );
        assert_eq!(expiry_from_jwt("opaque"), None);
    }
}
