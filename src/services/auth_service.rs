use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{Bson, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::database::repository::{self, find_user, find_user_by_email, normalize_email};
use crate::database::{collections, DocumentStore, FieldUpdate};
use crate::models::User;

const BCRYPT_COST: u32 = if cfg!(test) { 4 } else { DEFAULT_COST };

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub name: Option<String>,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub points: i64,
    pub active_group_id: Option<String>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        let active_group_id = user.active_group().map(String::from);
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            points: user.points,
            active_group_id,
        }
    }
}

// Generate JWT token
pub fn generate_jwt(user: &User, jwt: &JwtSettings) -> Result<String, String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        name: Some(user.name.clone()).filter(|n| !n.is_empty()),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(jwt.ttl_hours)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: jwt.audience.clone(),
        iss: jwt.issuer.clone(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt.secret.as_ref()))
        .map_err(|e| format!("Failed to generate token: {}", e))
}

// Verify JWT token
pub fn verify_token(token: &str, jwt: &JwtSettings) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[jwt.audience.as_str()]);

    let mut issuers = HashSet::new();
    issuers.insert(jwt.issuer.clone());
    validation.iss = Some(issuers);

    decode::<Claims>(token, &DecodingKey::from_secret(jwt.secret.as_ref()), &validation)
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}

// User login
pub async fn login(store: &dyn DocumentStore, jwt: &JwtSettings, request: &LoginRequest) -> Result<AuthResponse, String> {
    let user = find_user_by_email(store, &request.email)
        .await
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| "Invalid credentials".to_string())?;

    let stored_password = user
        .password_hash
        .as_ref()
        .ok_or_else(|| "This account has no password login.".to_string())?;

    let valid = verify(&request.password, stored_password).map_err(|e| format!("Password verification error: {}", e))?;
    if !valid {
        return Err("Invalid credentials".to_string());
    }

    store
        .update(
            collections::USERS,
            &user.id,
            vec![FieldUpdate::Set("lastLogin".to_string(), Bson::DateTime(BsonDateTime::now()))],
        )
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    let token = generate_jwt(&user, jwt)?;
    Ok(AuthResponse {
        success: true,
        token,
        user: user.into(),
    })
}

// User registration
pub async fn register(
    store: &dyn DocumentStore,
    jwt: &JwtSettings,
    request: &RegisterRequest,
) -> Result<AuthResponse, String> {
    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| "Email is required".to_string())?;
    let password = request
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| "Password is required".to_string())?;

    if find_user_by_email(store, &email)
        .await
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err("User already exists".to_string());
    }

    let password_hash = hash(password, BCRYPT_COST).map_err(|e| format!("Failed to hash password: {}", e))?;

    let now = BsonDateTime::now();
    let new_user = User {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        name: request.name.clone().unwrap_or_default().trim().to_string(),
        points: 0,
        active_group_id: None,
        last_login: Some(now),
        created_at: Some(now),
        password_hash: Some(password_hash),
    };

    let document = repository::encode(&new_user).map_err(|e| e.to_string())?;
    store
        .insert(collections::USERS, document)
        .await
        .map_err(|e| format!("Failed to create user: {}", e))?;

    let token = generate_jwt(&new_user, jwt)?;
    log::info!("✅ User registered successfully: {}", email);

    Ok(AuthResponse {
        success: true,
        token,
        user: new_user.into(),
    })
}

// Get current user
pub async fn get_current_user(store: &dyn DocumentStore, user_id: &str) -> Result<UserInfo, String> {
    find_user(store, user_id)
        .await
        .map_err(|e| format!("Database error: {}", e))?
        .map(UserInfo::from)
        .ok_or_else(|| "User not found".to_string())
}
