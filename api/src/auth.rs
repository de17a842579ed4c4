use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "clubdocs_session";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub local_auth_enabled: bool,
    pub session_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum UserRole {
    Admin,
    Approver,
    Member,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Approver => "APPROVER",
            UserRole::Member => "MEMBER",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(UserRole::Admin),
            "APPROVER" => Some(UserRole::Approver),
            "MEMBER" => Some(UserRole::Member),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            UserRole::Admin => 3,
            UserRole::Approver => 2,
            UserRole::Member => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub roles: Vec<UserRole>,
}

impl CurrentUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.iter().any(|r| r.level() >= role.level())
    }

    /// Privilege in the workflow sense: the right to approve documents and
    /// to record signature outcomes on behalf of external signers.
    pub fn is_privileged(&self) -> bool {
        self.has_role(UserRole::Approver)
    }
}

pub fn issue_token(
    user_id: Uuid,
    roles: &[UserRole],
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(config.session_ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            local_auth_enabled: true,
            session_ttl_minutes: 15,
        }
    }

    #[test]
    fn token_round_trips_claims() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, &[UserRole::Approver], &config()).unwrap();
        let claims = decode_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.roles, vec!["APPROVER".to_string()]);
    }

    #[test]
    fn admin_counts_as_privileged() {
        let admin = CurrentUser {
            user_id: Uuid::new_v4(),
            roles: vec![UserRole::Admin],
        };
        let member = CurrentUser {
            user_id: Uuid::new_v4(),
            roles: vec![UserRole::Member],
        };
        assert!(admin.is_privileged());
        assert!(!member.is_privileged());
    }
}
