// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, Profile},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl: chrono::Duration,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        jwt_secret: String,
        token_ttl: chrono::Duration,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, jwt_secret, token_ttl, pool }
    }

    /// Cria usuário e perfil na mesma transação.
    pub async fn register_user(
        &self,
        nome: &str,
        email: &str,
        password: &str,
        cargo: Option<&str>,
    ) -> Result<Profile, AppError> {
        // Hashing fora da transação, pois não toca no banco
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))?
            ?;

        let mut tx = self.pool.begin().await?;

        let user = self.user_repo
            .create_user(&mut *tx, email, &hashed_password)
            .await?; // Se falhar aqui, o tx sofre rollback automático ao sair do escopo (drop)

        let profile = self.user_repo
            .create_profile(&mut *tx, user.id, nome, cargo, email)
            .await?;

        tx.commit().await?;

        tracing::info!("👤 Usuário {} registrado", profile.email);
        Ok(profile)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<Profile, AppError> {
        let user = self.user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))?
        ?;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        // Usuário sem perfil (criado fora da API) ganha um perfil mínimo
        let profile = self.user_repo
            .find_profile(user.id)
            .await?
            .unwrap_or_else(|| Profile {
                id: user.id,
                nome: user.email.clone(),
                cargo: None,
                email: user.email.clone(),
            });

        Ok(profile)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        decode_token(token, &self.jwt_secret)
    }

    pub fn create_token(&self, user_id: Uuid, session_id: Uuid) -> Result<String, AppError> {
        create_token(user_id, session_id, &self.jwt_secret, self.token_ttl)
    }
}

pub fn create_token(
    user_id: Uuid,
    session_id: Uuid,
    secret: &str,
    ttl: chrono::Duration,
) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + ttl;

    let claims = Claims {
        sub: user_id,
        sid: session_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_user_and_session() {
        let user = Uuid::new_v4();
        let session = Uuid::new_v4();
        let token = create_token(user, session, "segredo", chrono::Duration::hours(1)).unwrap();

        let claims = decode_token(&token, "segredo").unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.sid, session);
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let token = create_token(Uuid::new_v4(), Uuid::new_v4(), "segredo", chrono::Duration::hours(1)).unwrap();
        assert!(matches!(decode_token(&token, "outro"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_token(Uuid::new_v4(), Uuid::new_v4(), "segredo", chrono::Duration::hours(-2)).unwrap();
        assert!(matches!(decode_token(&token, "segredo"), Err(AppError::InvalidToken)));
    }
}
