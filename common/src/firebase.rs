use std::time::{Duration, Instant};

use actix_web::{HttpMessage, HttpResponse, dev::ServiceRequest};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header,
    jwk::{Jwk, JwkSet},
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{AppError, Res};

/// Public keys used by Firebase Authentication to sign ID tokens.
pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const DEFAULT_KEYS_MAX_AGE: Duration = Duration::from_secs(60 * 60);
// unknown kids trigger a refetch, but not more often than this
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Identity extracted from a verified Firebase ID token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FirebaseClaims {
    #[serde(rename = "sub")]
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    /// Custom claim set through the Admin SDK for catalog administrators.
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

impl FirebaseClaims {
    pub fn require_email(&self) -> Res<&str> {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::BadRequest("Account has no email address".to_string()))
    }
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
    max_age: Duration,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.max_age
    }
}

/// Verifies Firebase ID tokens for a single project.
/// Google's signing keys are fetched lazily and cached for the duration
/// advertised in the `Cache-Control` header of the key endpoint.
pub struct FirebaseAuth {
    project_id: String,
    http: reqwest::Client,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseAuth {
    pub fn new(project_id: &str) -> Self {
        FirebaseAuth {
            project_id: project_id.to_string(),
            http: reqwest::Client::new(),
            keys: RwLock::new(None),
        }
    }

    /// Creates a verifier with a pre-loaded key set.
    pub fn with_keys(project_id: &str, set: JwkSet) -> Self {
        FirebaseAuth {
            project_id: project_id.to_string(),
            http: reqwest::Client::new(),
            keys: RwLock::new(Some(CachedKeys {
                set,
                fetched_at: Instant::now(),
                max_age: Duration::from_secs(u32::MAX as u64),
            })),
        }
    }

    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    /// Validates signature, audience, issuer and expiry of an ID token.
    pub async fn verify_id_token(&self, token: &str) -> Res<FirebaseClaims> {
        let header = decode_header(token)
            .map_err(|e| AppError::Unauthorized(format!("Malformed token: {}", e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(AppError::Unauthorized(
                "Token must be signed with RS256".to_string(),
            ));
        }
        let kid = header
            .kid
            .ok_or_else(|| AppError::Unauthorized("Token has no key id".to_string()))?;

        let jwk = self.find_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        let claims = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        if claims.uid.is_empty() {
            return Err(AppError::Unauthorized("Token has an empty subject".to_string()));
        }
        Ok(claims)
    }

    async fn find_key(&self, kid: &str) -> Res<Jwk> {
        {
            let guard = self.keys.read().await;
            if let Some(cached) = guard.as_ref() {
                if let Some(jwk) = cached.set.find(kid) {
                    if cached.is_fresh() {
                        return Ok(jwk.clone());
                    }
                } else if cached.is_fresh() && cached.fetched_at.elapsed() < MIN_REFRESH_INTERVAL {
                    return Err(AppError::Unauthorized(format!("Unknown signing key {}", kid)));
                }
            }
        }

        let fresh = self.fetch_keys().await?;
        let found = fresh.set.find(kid).cloned();
        *self.keys.write().await = Some(fresh);
        found.ok_or_else(|| AppError::Unauthorized(format!("Unknown signing key {}", kid)))
    }

    async fn fetch_keys(&self) -> Res<CachedKeys> {
        log::debug!("Fetching Firebase signing keys");
        let response = self.http.get(GOOGLE_JWKS_URL).send().await?.error_for_status()?;
        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_KEYS_MAX_AGE);
        let set = response.json::<JwkSet>().await?;
        Ok(CachedKeys {
            set,
            fetched_at: Instant::now(),
            max_age,
        })
    }
}

/// Extracts `max-age` seconds from a `Cache-Control` header value.
pub fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|v| v.parse().ok())
}

pub fn get_firebase_claims_or_error(req: &ServiceRequest) -> Result<FirebaseClaims, HttpResponse> {
    if let Some(claims_res) = req.extensions().get::<Res<FirebaseClaims>>() {
        match claims_res {
            Ok(claims) => Ok(claims.clone()),
            Err(app_error) => Err(app_error.to_http_response()),
        }
    } else {
        Err(
            AppError::Unauthorized("No authorization token provided".to_string())
                .to_http_response(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn verifier() -> FirebaseAuth {
        FirebaseAuth::with_keys("mockup-market", JwkSet { keys: vec![] })
    }

    #[test]
    fn reads_max_age_directive() {
        assert_eq!(parse_max_age("public, max-age=19302, must-revalidate, no-transform"), Some(19302));
        assert_eq!(parse_max_age("no-cache"), None);
    }

    #[test]
    fn issuer_is_project_scoped() {
        assert_eq!(verifier().issuer(), "https://securetoken.google.com/mockup-market");
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let err = verifier().verify_id_token("not-a-token").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rejects_symmetric_tokens() {
        let claims = FirebaseClaims {
            uid: "user-1".to_string(),
            email: Some("a@b.c".to_string()),
            name: None,
            picture: None,
            admin: true,
            exp: 4_102_444_800,
        };
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("k1".to_string());
        let token = encode(&header, &claims, &EncodingKey::from_secret(b"secret")).unwrap();

        let err = verifier().verify_id_token(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn email_is_required_for_billing() {
        let claims = FirebaseClaims {
            uid: "u".to_string(),
            email: None,
            name: None,
            picture: None,
            admin: false,
            exp: 0,
        };
        assert!(claims.require_email().is_err());
    }
}
