//! Identity provider exchange
//!
//! The authorization-code + PKCE exchange with the external identity
//! provider, behind the [`IdentityProvider`] trait so request handlers and
//! tests never depend on the provider's HTTP endpoints directly.
//!
//! The profile returned by the provider is trusted verbatim on first login;
//! nothing here re-validates names or emails.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::OAuthConfig;

/// Google's OAuth2 endpoints
const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Profile data returned by the provider's user-info endpoint
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    /// Stable subject id assigned by the provider
    pub subject: String,
    /// Display name
    pub name: String,
    /// Email address (may be empty if the provider withholds it)
    pub email: String,
}

/// External identity provider interface
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the authorization URL the user is redirected to
    fn authorization_url(&self, state: &str, code_challenge: &str) -> String;

    /// Exchange an authorization code + PKCE verifier for an access token
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<String>;

    /// Fetch the user's identity with an access token
    async fn fetch_identity(&self, access_token: &str) -> Result<ExternalIdentity>;
}

/// Generate the opaque `state` parameter for an authorization request
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

/// Generate a PKCE code verifier
pub fn generate_code_verifier() -> String {
    random_alphanumeric(64)
}

/// Derive the S256 code challenge from a verifier
pub fn code_challenge_s256(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Google implementation of [`IdentityProvider`]
pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GoogleIdentityProvider {
    /// Create a provider from OAuth configuration
    pub fn new(config: &OAuthConfig, public_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Quillpress/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url_or_default(public_url),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self, state: &str, code_challenge: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
            AUTHORIZATION_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode("openid profile email"),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
        )
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<String> {
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.redirect_url),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await
            .context("Token request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Token endpoint returned {}", response.status());
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        Ok(token.access_token)
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<ExternalIdentity> {
        let response = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .context("User-info request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("User-info endpoint returned {}", response.status());
        }

        let info: GoogleUserInfo = response
            .json()
            .await
            .context("Failed to parse user-info response")?;

        Ok(ExternalIdentity {
            subject: info.id,
            name: info.name,
            email: info.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> GoogleIdentityProvider {
        let config = OAuthConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: String::new(),
        };
        GoogleIdentityProvider::new(&config, "http://localhost:8080").unwrap()
    }

    #[test]
    fn test_authorization_url_contains_pkce_params() {
        let provider = test_provider();
        let url = provider.authorization_url("state-xyz", "challenge-abc");

        assert!(url.starts_with(AUTHORIZATION_ENDPOINT));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("state=state-xyz"));
        assert!(url.contains("code_challenge=challenge-abc"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!(
            "redirect_uri={}",
            urlencoding::encode("http://localhost:8080/api/v1/auth/google/callback")
        )));
    }

    #[test]
    fn test_code_challenge_s256_known_vector() {
        // Verifier/challenge pair from RFC 7636 appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            code_challenge_s256(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_state_and_verifier_are_random() {
        assert_ne!(generate_state(), generate_state());
        let verifier = generate_code_verifier();
        assert_eq!(verifier.len(), 64);
        assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
