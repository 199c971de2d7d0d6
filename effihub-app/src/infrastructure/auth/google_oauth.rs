use effihub_errors::AppError;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;

use crate::domain::Profile;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Deserialize)]
pub struct GoogleUserInfo {
    /// Google's stable subject id for the account.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

impl GoogleUserInfo {
    pub fn into_profile(self) -> Profile {
        Profile::new(self.sub, self.email, self.name, self.picture)
    }
}

// oauth2 5.x encodes endpoint configuration in the client type.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

/// PKCE authorization-code sign-in against Google, yielding the user info we
/// upsert into a profile.
#[derive(Clone)]
pub struct GoogleOAuth {
    client: ConfiguredClient,
    redirect_uri: RedirectUrl,
    http_client: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Result<Self, AppError> {
        let auth_url = AuthUrl::new(GOOGLE_AUTH_URL.to_string())
            .map_err(|err| AppError::Backend(err.to_string()))?;
        let token_url = TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
            .map_err(|err| AppError::Backend(err.to_string()))?;
        let redirect_uri = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|err| AppError::Backend(err.to_string()))?;

        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_client_secret(ClientSecret::new(client_secret.to_string()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        Ok(Self {
            client,
            redirect_uri,
            http_client: reqwest::Client::new(),
        })
    }

    /// Build the authorization redirect plus the CSRF token and PKCE
    /// verifier the callback needs from the session.
    pub fn authorize_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_redirect_uri(std::borrow::Cow::Borrowed(&self.redirect_uri))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        (url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchange the callback code for tokens and fetch the signed-in user.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<GoogleUserInfo, AppError> {
        let http_client = oauth2::reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| AppError::Backend(err.to_string()))?;

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_redirect_uri(std::borrow::Cow::Borrowed(&self.redirect_uri))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .map_err(|err| AppError::Backend(format!("token exchange failed: {err:?}")))?;

        let access_token = token_result.access_token().secret();

        self.http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| AppError::Backend(err.to_string()))?
            .json::<GoogleUserInfo>()
            .await
            .map_err(|err| AppError::Backend(err.to_string()))
    }
}
