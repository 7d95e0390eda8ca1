use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use sqlx::MySqlPool;
use tracing::info;

use crate::auth::handlers::insert_account;
use crate::config::{AdminBootstrap, Config, StorageBackend};
use crate::store::{AccountRepository, Store, memory::MemoryStore, mysql::MySqlStore};
use crate::utils::UsernameIndex;
use crate::validation::account::AccountForm;

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")
}

/// Builds the configured storage backend, applying migrations when asked.
pub async fn init_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::seeded()))
        }
        StorageBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the mysql backend")?;
            let pool = init_db(url).await?;
            if config.run_migrations {
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                info!("Database migrations applied");
            }
            Ok(Arc::new(MySqlStore::new(pool)))
        }
    }
}

/// Creates the configured staff account unless the username already exists.
/// The password goes through the same rules as any other account.
pub async fn bootstrap_admin(
    store: &dyn Store,
    index: &UsernameIndex,
    admin: &AdminBootstrap,
) -> Result<bool> {
    if store
        .find_account_by_username(&admin.username)
        .await
        .context("Failed to look up admin account")?
        .is_some()
    {
        info!(username = %admin.username, "Admin account already present");
        return Ok(false);
    }

    let form = AccountForm {
        username: admin.username.clone(),
        email: admin.email.clone(),
        first_name: "Site".to_string(),
        last_name: "Administrator".to_string(),
        password1: admin.password.clone(),
        password2: admin.password.clone(),
        is_staff: Some(true),
    };
    let cleaned = form
        .clean()
        .map_err(|e| anyhow!("ADMIN_* settings rejected: {e}"))?;

    let account = insert_account(store, index, cleaned, true)
        .await
        .map_err(|e| anyhow!("Failed to create admin account: {e}"))?;
    info!(user_id = account.id, username = %account.username(), "Admin account created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LeaveTypeRepository;

    fn admin(password: &str) -> AdminBootstrap {
        AdminBootstrap {
            username: "boss".to_string(),
            password: password.to_string(),
            email: "boss@example.com".to_string(),
        }
    }

    #[actix_web::test]
    async fn creates_staff_account_once() {
        let store = MemoryStore::seeded();
        let index = UsernameIndex::new();

        assert!(bootstrap_admin(&store, &index, &admin("Str0ng!Pass")).await.unwrap());
        assert!(!bootstrap_admin(&store, &index, &admin("Str0ng!Pass")).await.unwrap());

        let account = store.find_account_by_username("boss").await.unwrap().unwrap();
        assert!(account.is_staff);
    }

    #[actix_web::test]
    async fn weak_admin_password_is_refused() {
        let store = MemoryStore::seeded();
        let index = UsernameIndex::new();

        assert!(bootstrap_admin(&store, &index, &admin("12345678")).await.is_err());
        assert_eq!(store.count_accounts().await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn memory_backend_needs_no_database() {
        let store = init_store(&Config::for_tests()).await.unwrap();
        assert_eq!(store.list_leave_types().await.unwrap().len(), 3);
    }
}
