//! Demo data bootstrap, run by `main.rs` when `VAPTRACK_SEED=1`.

use std::sync::Arc;

use vaptrack_auth::{Role, hash_password};
use vaptrack_core::{DomainError, DomainResult};
use vaptrack_domain::{NewClient, NewProject};
use vaptrack_store::Store;

pub const SEED_EMAIL: &str = "tester@demo.com";
pub const SEED_PASSWORD: &str = "Test@123";
pub const SEED_CLIENT: &str = "Acme Corp";
pub const SEED_PROJECT: &str = "External Web VAPT";

/// Idempotently create the demo tester, client, project, and assignment.
pub async fn run(store: &Arc<dyn Store>) -> DomainResult<()> {
    let tester = match store.user_by_email(SEED_EMAIL).await? {
        Some(user) => user,
        None => {
            let hash = hash_password(SEED_PASSWORD)?;
            store.insert_user(SEED_EMAIL, &hash, Role::Tester).await?
        }
    };

    match store
        .insert_client(&NewClient {
            name: SEED_CLIENT.to_string(),
            contact_name: Some("Jordan Hale".to_string()),
            contact_email: Some("security@acme.example".to_string()),
            contact_phone: None,
            notes: None,
        })
        .await
    {
        Ok(_) | Err(DomainError::Conflict(_)) => {}
        Err(e) => return Err(e),
    }

    let project = match store.project_by_title(SEED_PROJECT).await? {
        Some(project) => project,
        None => {
            store
                .insert_project(&NewProject {
                    client_name: SEED_CLIENT.to_string(),
                    title: SEED_PROJECT.to_string(),
                    status: "In Progress".to_string(),
                    due_date: None,
                })
                .await?
        }
    };

    store.assign(project.id, tester.id).await?;
    tracing::info!(tester_id = %tester.id, project_id = %project.id, "seed data ready");
    Ok(())
}
