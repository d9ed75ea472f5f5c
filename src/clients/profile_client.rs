use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::app_system::OrderError;
use crate::domain::{Role, Session};
use crate::store::{path, SetOptions, StoreClient};

/// Profile record kept under `users/{ownerId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Read access to the key-value profile store: roles and contact emails.
#[derive(Clone, Debug)]
pub struct ProfileClient {
    store: StoreClient,
}

impl ProfileClient {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, owner_id: &str) -> Result<Option<Profile>, OrderError> {
        let Some(doc) = self.store.get_document(path::profile(owner_id)).await? else {
            return Ok(None);
        };
        serde_json::from_value(doc.data)
            .map(Some)
            .map_err(|e| OrderError::Schema(format!("{}: {e}", doc.path)))
    }

    /// Resolves who `owner_id` is. Unknown users are plain customers.
    #[instrument(skip(self))]
    pub async fn resolve_session(&self, owner_id: &str) -> Result<Session, OrderError> {
        let profile = self.get_profile(owner_id).await?.unwrap_or_default();
        let role = Role::from_claim(profile.role.as_deref());
        debug!(?role, "Session resolved");
        Ok(Session {
            owner_id: owner_id.to_string(),
            role,
        })
    }

    pub async fn email(&self, owner_id: &str) -> Result<Option<String>, OrderError> {
        Ok(self.get_profile(owner_id).await?.and_then(|profile| profile.email))
    }

    /// Emails for each given owner; owners without one are left out.
    #[instrument(skip(self, owner_ids))]
    pub async fn emails<'a, I>(&self, owner_ids: I) -> Result<BTreeMap<String, String>, OrderError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut emails = BTreeMap::new();
        for owner_id in owner_ids {
            if let Some(email) = self.email(owner_id).await? {
                emails.insert(owner_id.to_string(), email);
            }
        }
        Ok(emails)
    }

    /// Writes a profile. The core never calls this; hosts use it to seed users.
    #[instrument(skip(self, profile))]
    pub async fn seed_profile(&self, owner_id: &str, profile: &Profile) -> Result<(), OrderError> {
        let data = serde_json::to_value(profile).map_err(|e| OrderError::Schema(e.to_string()))?;
        self.store
            .set_document(path::profile(owner_id), data, SetOptions::merge())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreActor;
    use serde_json::json;

    fn start() -> (StoreClient, ProfileClient) {
        let (actor, store) = StoreActor::new("profiles", 16);
        tokio::spawn(actor.run());
        (store.clone(), ProfileClient::new(store))
    }

    #[tokio::test]
    async fn test_resolve_roles() {
        let (store, profiles) = start();
        store
            .set_document(path::profile("dana"), json!({ "role": "admin" }), SetOptions::overwrite())
            .await
            .unwrap();

        assert!(profiles.resolve_session("dana").await.unwrap().is_admin());
        assert_eq!(
            profiles.resolve_session("stranger").await.unwrap(),
            Session::customer("stranger")
        );
    }

    #[tokio::test]
    async fn test_emails_skip_missing() {
        let (_, profiles) = start();
        profiles
            .seed_profile(
                "alice",
                &Profile {
                    role: None,
                    email: Some("alice@school.edu".into()),
                },
            )
            .await
            .unwrap();

        let emails = profiles.emails(["alice", "bob"]).await.unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails["alice"], "alice@school.edu");
    }
}
