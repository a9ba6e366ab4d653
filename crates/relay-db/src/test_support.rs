//! Shared fixtures for relay-db unit tests.

use relay_core::entities::{Member, Organization};
use relay_core::requests::CreateOrganizationRequest;

use crate::RelayDb;
use crate::events::BoardFeed;
use crate::service::{RelayService, ServiceSettings};

pub const OWNER: &str = "user_owner";

/// In-memory service with an enabled feed and default settings.
pub async fn test_service() -> RelayService {
    let db = RelayDb::open_local(":memory:").await.unwrap();
    RelayService::from_db(db, BoardFeed::default(), ServiceSettings::default())
}

/// Create an organization owned by [`OWNER`].
pub async fn test_org(svc: &RelayService, name: &str) -> (Organization, Member) {
    let created = svc
        .create_organization(
            OWNER,
            &CreateOrganizationRequest {
                name: name.into(),
                clerk_org_id: None,
                owner_email: "owner@example.com".into(),
                owner_name: Some("Olive Owner".into()),
            },
        )
        .await
        .unwrap();
    (created.organization, created.owner)
}
