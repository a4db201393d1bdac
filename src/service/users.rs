use crate::error::{AppError, AppResult};
use crate::models::user::check_password;
use crate::models::{AuthUser, NewUser, Role, User, UserProfile, ValidationErrors};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use std::sync::Arc;

/// 用户账号存储
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn insert_auth_user(&self, email: &str, password_hash: &str) -> AppResult<AuthUser>;
    async fn delete_auth_user(&self, id: i64) -> AppResult<bool>;
    async fn insert_profile(&self, id: i64, profile: &UserProfile) -> AppResult<()>;
    async fn update_password_hash(&self, id: i64, password_hash: &str) -> AppResult<bool>;
}

/// 用户管理服务
pub struct UserAdminService {
    directory: Arc<dyn UserDirectory>,
}

impl UserAdminService {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// 先创建认证记录再创建资料。资料写入失败时补偿删除认证记录,
    /// 补偿删除也失败则只记日志。
    pub async fn create_user(&self, req: NewUser) -> AppResult<User> {
        req.validate()?;
        let email = req.email.trim().to_lowercase();
        let full_name = req.full_name.trim().to_string();
        let password_hash = hash_password(req.password).await?;

        let auth = self
            .directory
            .insert_auth_user(&email, &password_hash)
            .await?;

        let profile = UserProfile {
            email: email.clone(),
            full_name: full_name.clone(),
            role: Role::Member,
            active: true,
        };
        if let Err(e) = self.directory.insert_profile(auth.id, &profile).await {
            tracing::warn!("Profile insert for user {} failed, rolling back: {}", auth.id, e);
            match self.directory.delete_auth_user(auth.id).await {
                Ok(_) => tracing::info!("Rolled back auth user {}", auth.id),
                Err(rollback) => {
                    tracing::error!("Rollback of auth user {} failed: {}", auth.id, rollback)
                }
            }
            return Err(e);
        }

        tracing::info!("Created user {} ({})", auth.id, email);
        Ok(User {
            id: auth.id,
            email,
            full_name,
            role: profile.role,
            created_at: auth.created_at,
        })
    }

    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        if !self.directory.delete_auth_user(id).await? {
            return Err(AppError::NotFound(format!("user {}", id)));
        }
        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    pub async fn change_password(&self, id: i64, password: String) -> AppResult<()> {
        let mut errors = ValidationErrors::new();
        check_password(&mut errors, &password);
        errors.into_result()?;

        let password_hash = hash_password(password).await?;
        if !self.directory.update_password_hash(id, &password_hash).await? {
            return Err(AppError::NotFound(format!("user {}", id)));
        }
        tracing::info!("Changed password of user {}", id);
        Ok(())
    }
}

/// Argon2 哈希, 在阻塞线程池中计算
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDirectory {
        users: Mutex<HashMap<i64, (String, String)>>,
        profiles: Mutex<HashMap<i64, UserProfile>>,
        fail_profile: bool,
        fail_rollback: bool,
    }

    #[async_trait]
    impl UserDirectory for FakeDirectory {
        async fn insert_auth_user(&self, email: &str, password_hash: &str) -> AppResult<AuthUser> {
            let mut users = self.users.lock().unwrap();
            if users.values().any(|(e, _)| e == email) {
                return Err(AppError::DuplicateEmail(email.to_string()));
            }
            let id = users.len() as i64 + 1;
            users.insert(id, (email.to_string(), password_hash.to_string()));
            Ok(AuthUser {
                id,
                email: email.to_string(),
                created_at: Utc::now(),
            })
        }

        async fn delete_auth_user(&self, id: i64) -> AppResult<bool> {
            if self.fail_rollback {
                return Err(AppError::Internal("connection reset".to_string()));
            }
            self.profiles.lock().unwrap().remove(&id);
            Ok(self.users.lock().unwrap().remove(&id).is_some())
        }

        async fn insert_profile(&self, id: i64, profile: &UserProfile) -> AppResult<()> {
            if self.fail_profile {
                return Err(AppError::Internal("profiles table unavailable".to_string()));
            }
            self.profiles.lock().unwrap().insert(id, profile.clone());
            Ok(())
        }

        async fn update_password_hash(&self, id: i64, password_hash: &str) -> AppResult<bool> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .get_mut(&id)
                .map(|(_, hash)| *hash = password_hash.to_string())
                .is_some())
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "correct horse".to_string(),
            full_name: "Ada Buyer".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_auth_record_and_profile() {
        let dir = Arc::new(FakeDirectory::default());
        let service = UserAdminService::new(dir.clone());
        let user = service.create_user(new_user(" Ada@Example.com ")).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(dir.profiles.lock().unwrap()[&user.id].full_name, "Ada Buyer");
        let hash = dir.users.lock().unwrap()[&user.id].1.clone();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[tokio::test]
    async fn duplicate_email_is_reported() {
        let service = UserAdminService::new(Arc::new(FakeDirectory::default()));
        service.create_user(new_user("a@b.co")).await.unwrap();
        let err = service.create_user(new_user("A@b.co")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail(ref e) if e == "a@b.co"));
    }

    #[tokio::test]
    async fn failed_profile_rolls_back_auth_record() {
        let dir = Arc::new(FakeDirectory {
            fail_profile: true,
            ..Default::default()
        });
        let service = UserAdminService::new(dir.clone());
        assert!(service.create_user(new_user("a@b.co")).await.is_err());
        assert!(dir.users.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_rollback_still_returns_original_error() {
        let dir = Arc::new(FakeDirectory {
            fail_profile: true,
            fail_rollback: true,
            ..Default::default()
        });
        let service = UserAdminService::new(dir.clone());
        let err = service.create_user(new_user("a@b.co")).await.unwrap_err();
        assert!(err.to_string().contains("profiles table unavailable"));
        // 补偿删除失败, 认证记录遗留
        assert_eq!(dir.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_directory() {
        let dir = Arc::new(FakeDirectory::default());
        let service = UserAdminService::new(dir.clone());
        let err = service
            .create_user(NewUser {
                email: "nope".to_string(),
                password: "short".to_string(),
                full_name: String::new(),
            })
            .await
            .unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors.has("email") && errors.has("password") && errors.has("full_name"))
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(dir.users.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn change_password_and_delete() {
        let dir = Arc::new(FakeDirectory::default());
        let service = UserAdminService::new(dir.clone());
        let user = service.create_user(new_user("a@b.co")).await.unwrap();

        service
            .change_password(user.id, "new password 1".to_string())
            .await
            .unwrap();
        let hash = dir.users.lock().unwrap()[&user.id].1.clone();
        assert!(verify_password("new password 1", &hash));
        assert!(matches!(
            service.change_password(user.id, "short".to_string()).await,
            Err(AppError::Validation(_))
        ));

        service.delete_user(user.id).await.unwrap();
        assert!(matches!(
            service.delete_user(user.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
