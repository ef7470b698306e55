use axum::{
    extract::{FromRef, FromRequestParts, Json, OptionalFromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet,
    EndpointSet, RedirectUrl, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;

use crate::config::JwtConfig;
use crate::db::{
    self,
    models::{Profile, Role, Shelter},
};
use crate::error::AppError;
use crate::AppState;

pub const AUTH_COOKIE_NAME: &str = "auth_token";
const SESSION_TTL_DAYS: i64 = 1;

#[derive(Deserialize)]
pub struct AuthCallback {
    code: String,
    state: String,
}

#[derive(Deserialize)]
pub struct DevLoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Identity carried by the session token.
#[derive(Serialize, Clone, Debug)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub provider: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub email: String,
    pub provider: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    exp: usize,
    provider: String,
    nonce: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub provider: String,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            provider: claims.provider,
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let claims = validate_token_str(&token, &app.config.jwt).map_err(|e| {
            tracing::warn!("Token error: {}", e);
            AppError::Unauthorized
        })?;
        Ok(claims.into())
    }
}

/// Public pages render differently for a signed-in owner; a missing or bad
/// token there just means "anonymous".
impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let app = AppState::from_ref(state);
        Ok(extract_token_from_headers(&parts.headers)
            .and_then(|token| validate_token_str(&token, &app.config.jwt).ok())
            .map(Into::into))
    }
}

pub async fn login(Path(provider): Path<String>, State(state): State<AppState>) -> Result<Redirect, AppError> {
    let cfg = load_provider_config(&provider)?;
    let client = oauth_client(&cfg)?;
    let csrf = create_state_token(&provider, &state.config.jwt)
        .map_err(|e| AppError::Misconfigured(e.to_string()))?;

    let (authorize_url, _csrf_state) = client
        .authorize_url(|| oauth2::CsrfToken::new(csrf))
        .url();

    Ok(Redirect::to(authorize_url.as_str()))
}

pub async fn callback(
    Path(provider): Path<String>,
    Query(params): Query<AuthCallback>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let cfg = load_provider_config(&provider)?;

    if let Err(e) = validate_state_token(&params.state, &provider, &state.config.jwt) {
        tracing::warn!("OAuth state invalid: {}", e);
        return Err(AppError::Unauthorized);
    }

    let client = oauth_client(&cfg)?;
    let http_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| AppError::Misconfigured(format!("http client: {}", e)))?;

    let token_result = client
        .exchange_code(AuthorizationCode::new(params.code))
        .request_async(&http_client)
        .await
        .map_err(|e| {
            tracing::error!("OAuth token exchange failed: {}", e);
            AppError::BadGateway("OAuth token exchange failed")
        })?;

    let access_token = token_result.access_token().secret();
    let provider_profile = fetch_user_profile(&http_client, &cfg.userinfo_url, access_token)
        .await
        .map_err(|e| {
            tracing::error!("Userinfo fetch failed: {}", e);
            AppError::BadGateway("Userinfo fetch failed")
        })?;

    let user = SessionUser {
        id: format!("{}:{}", provider.to_lowercase(), provider_profile.id),
        email: provider_profile.email,
        name: provider_profile.name,
        provider,
    };

    let profile = db::ensure_profile(&state.db, &user.id, &user.email, Some(user.name.clone())).await?;
    tracing::info!("User {} signed in as {}", profile.id, profile.role);

    let token = create_jwt(&user, &state.config.jwt).map_err(|e| {
        tracing::error!("JWT creation failed: {}", e);
        AppError::Misconfigured(e.to_string())
    })?;
    let cookie = build_auth_cookie(&token, &state.config.jwt);

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/dashboard")))
}

pub async fn dev_login(
    State(state): State<AppState>,
    Json(payload): Json<DevLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(dev) = state.config.dev_login.as_ref() else {
        return Err(AppError::Forbidden);
    };

    if dev.password == "password" {
        tracing::warn!("Default DEV_PASSWORD is not allowed");
        return Err(AppError::Forbidden);
    }

    if payload.username != dev.username || payload.password != dev.password {
        return Err(AppError::Unauthorized);
    }

    let user = SessionUser {
        id: "dev-1".to_string(),
        email: "dev@local".to_string(),
        name: "Developer".to_string(),
        provider: "local".to_string(),
    };
    let profile = db::ensure_profile(&state.db, &user.id, &user.email, Some(user.name.clone())).await?;

    let token = create_jwt(&user, &state.config.jwt).map_err(|e| {
        tracing::error!("JWT creation failed: {}", e);
        AppError::Misconfigured(e.to_string())
    })?;
    let cookie = build_auth_cookie(&token, &state.config.jwt);

    Ok(([(header::SET_COOKIE, cookie)], Json(profile)))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::SET_COOKIE, clear_auth_cookie(&state.config.jwt))], "OK")
}

pub async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> Result<Json<Profile>, AppError> {
    Ok(Json(load_profile(&state, &user).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    let full_name = req.full_name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let avatar_url = req.avatar_url.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let profile = db::update_profile(&state.db, &user.id, full_name, avatar_url)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(profile))
}

/// The caller's profile row. A valid token without a profile is treated as
/// signed out.
pub async fn load_profile(state: &AppState, user: &AuthenticatedUser) -> Result<Profile, AppError> {
    db::get_profile(&state.db, &user.id).await?.ok_or_else(|| {
        tracing::warn!("No profile for authenticated user {}", user.id);
        AppError::Unauthorized
    })
}

pub fn require_role(profile: &Profile, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&profile.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub async fn require_shelter_owner(
    state: &AppState,
    shelter_id: &str,
    user: &AuthenticatedUser,
) -> Result<Shelter, AppError> {
    let shelter = db::get_shelter(&state.db, shelter_id)
        .await?
        .ok_or(AppError::NotFound("Shelter"))?;
    if !shelter.is_administered_by(&user.id) {
        return Err(AppError::Forbidden);
    }
    Ok(shelter)
}

pub fn create_jwt(user: &SessionUser, jwt: &JwtConfig) -> anyhow::Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(SESSION_TTL_DAYS))
        .ok_or_else(|| anyhow::anyhow!("session expiry out of range"))?
        .timestamp();

    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        provider: user.provider.clone(),
        name: user.name.clone(),
        exp: expiration as usize,
        iss: jwt.issuer.clone(),
        aud: jwt.audience.clone(),
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt.secret.as_ref()))?;
    Ok(token)
}

pub fn validate_token_str(token: &str, jwt: &JwtConfig) -> anyhow::Result<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    if let Some(issuer) = jwt.issuer.as_deref() {
        validation.set_issuer(&[issuer]);
    }
    match jwt.audience.as_deref() {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let data = decode::<Claims>(token, &DecodingKey::from_secret(jwt.secret.as_ref()), &validation)?;
    Ok(data.claims)
}

pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let (k, v) = cookie.trim().split_once('=')?;
                (k == AUTH_COOKIE_NAME && !v.is_empty()).then(|| v.to_string())
            })
        })
}

fn build_auth_cookie(token: &str, jwt: &JwtConfig) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        AUTH_COOKIE_NAME,
        token,
        SESSION_TTL_DAYS * 86400
    );
    if jwt.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_auth_cookie(jwt: &JwtConfig) -> String {
    let mut cookie = format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", AUTH_COOKIE_NAME);
    if jwt.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

struct ProviderConfig {
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    redirect_url: String,
}

type ProviderClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

fn load_provider_config(provider: &str) -> Result<ProviderConfig, AppError> {
    let allowed = env::var("OAUTH_PROVIDERS").unwrap_or_default();
    let provider_lower = provider.to_lowercase();
    if !allowed
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .any(|s| !s.is_empty() && s == provider_lower)
    {
        return Err(AppError::Validation("OAuth provider not allowed".to_string()));
    }

    let prefix = provider.to_uppercase();
    let var = |suffix: &str| {
        env::var(format!("{}_{}", prefix, suffix))
            .map_err(|_| AppError::Misconfigured(format!("Missing {}_{}", prefix, suffix)))
    };

    Ok(ProviderConfig {
        client_id: var("CLIENT_ID")?,
        client_secret: var("CLIENT_SECRET")?,
        auth_url: var("AUTH_URL")?,
        token_url: var("TOKEN_URL")?,
        userinfo_url: var("USERINFO_URL")?,
        redirect_url: var("REDIRECT_URL")
            .unwrap_or_else(|_| format!("http://localhost:8080/auth/callback/{}", provider_lower)),
    })
}

fn oauth_client(cfg: &ProviderConfig) -> Result<ProviderClient, AppError> {
    let bad_url = |e: oauth2::url::ParseError| AppError::Misconfigured(format!("OAuth URL: {}", e));
    Ok(BasicClient::new(ClientId::new(cfg.client_id.clone()))
        .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(cfg.auth_url.clone()).map_err(bad_url)?)
        .set_token_uri(TokenUrl::new(cfg.token_url.clone()).map_err(bad_url)?)
        .set_redirect_uri(RedirectUrl::new(cfg.redirect_url.clone()).map_err(bad_url)?))
}

fn create_state_token(provider: &str, jwt: &JwtConfig) -> anyhow::Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::minutes(10))
        .ok_or_else(|| anyhow::anyhow!("state expiry out of range"))?
        .timestamp();
    let state = StateClaims {
        exp: expiration as usize,
        provider: provider.to_string(),
        nonce: uuid::Uuid::new_v4().to_string(),
    };
    Ok(encode(&Header::default(), &state, &EncodingKey::from_secret(jwt.secret.as_ref()))?)
}

fn validate_state_token(token: &str, provider: &str, jwt: &JwtConfig) -> anyhow::Result<()> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_aud = false;
    let data = decode::<StateClaims>(token, &DecodingKey::from_secret(jwt.secret.as_ref()), &validation)?;
    if !data.claims.provider.eq_ignore_ascii_case(provider) {
        anyhow::bail!("provider mismatch");
    }
    Ok(())
}

struct ProviderProfile {
    id: String,
    email: String,
    name: String,
}

async fn fetch_user_profile(
    client: &reqwest::Client,
    userinfo_url: &str,
    access_token: &str,
) -> anyhow::Result<ProviderProfile> {
    let resp = client.get(userinfo_url).bearer_auth(access_token).send().await?;

    if !resp.status().is_success() {
        anyhow::bail!("userinfo response status {}", resp.status());
    }

    let json: Value = resp.json().await?;
    let id = match json.get("sub").or_else(|| json.get("id")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => anyhow::bail!("missing user id"),
    };
    let email = json
        .get("email")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing email"))?
        .to_string();
    let name = json
        .get("name")
        .or_else(|| json.get("login"))
        .and_then(|v| v.as_str())
        .unwrap_or("User")
        .to_string();

    Ok(ProviderProfile { id, email, name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            issuer: Some("adoptable".into()),
            audience: None,
            secure_cookies: true,
        }
    }

    fn user() -> SessionUser {
        SessionUser {
            id: "u-1".into(),
            email: "u1@example.com".into(),
            name: "User One".into(),
            provider: "local".into(),
        }
    }

    #[test]
    fn issued_tokens_validate() {
        let token = create_jwt(&user(), &jwt()).unwrap();
        let claims = validate_token_str(&token, &jwt()).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.iss.as_deref(), Some("adoptable"));
    }

    #[test]
    fn tokens_signed_with_other_secret_are_rejected() {
        let token = create_jwt(&user(), &jwt()).unwrap();
        let other = JwtConfig {
            secret: "other".into(),
            ..jwt()
        };
        assert!(validate_token_str(&token, &other).is_err());
    }

    #[test]
    fn token_read_from_bearer_or_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_token_from_headers(&headers).as_deref(), Some("abc"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=xyz"));
        assert_eq!(extract_token_from_headers(&headers).as_deref(), Some("xyz"));

        assert_eq!(extract_token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn cookies_are_secure_when_configured() {
        assert!(build_auth_cookie("t", &jwt()).ends_with("; Secure"));
        assert!(clear_auth_cookie(&jwt()).contains("Max-Age=0"));
    }

    #[test]
    fn state_token_is_bound_to_provider() {
        let token = create_state_token("github", &jwt()).unwrap();
        assert!(validate_state_token(&token, "GitHub", &jwt()).is_ok());
        assert!(validate_state_token(&token, "google", &jwt()).is_err());
    }

    #[test]
    fn role_gate() {
        let profile = Profile {
            id: "u-1".into(),
            email: "u1@example.com".into(),
            full_name: None,
            avatar_url: None,
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(require_role(&profile, &[Role::User]).is_ok());
        assert!(matches!(
            require_role(&profile, &[Role::Admin, Role::ShelterAdmin]),
            Err(AppError::Forbidden)
        ));
    }
}
