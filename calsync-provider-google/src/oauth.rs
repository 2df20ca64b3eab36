//! OAuth endpoints and URL building for the Google provider.

use url::Url;

pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// OAuth client configuration (from the deployment's config file).
#[derive(Debug, Clone)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Build the user consent URL. `access_type=offline` plus `prompt=consent`
/// makes Google return a refresh token on every grant.
pub fn consent_url(config: &OauthConfig, state: &str) -> String {
    // AUTH_URL is a valid literal; parsing it cannot fail.
    let mut url = Url::parse(AUTH_URL).expect("static auth url");
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", SCOPE)
        .append_pair("access_type", "offline")
        .append_pair("include_granted_scopes", "true")
        .append_pair("prompt", "consent")
        .append_pair("state", state);
    url.into()
}
