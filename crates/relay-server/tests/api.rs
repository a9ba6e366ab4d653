//! End-to-end tests of the HTTP API against an in-memory database, with
//! static development tokens standing in for Clerk.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use relay_auth::Authenticator;
use relay_config::RelayConfig;
use relay_core::enums::{EmailStatus, SubscriptionStatus, TicketPriority};
use relay_core::identity::AuthIdentity;
use relay_core::requests::CreateOrganizationRequest;
use relay_db::events::BoardFeed;
use relay_db::service::{RelayService, ServiceSettings};
use relay_db::updates::subscription::SubscriptionUpsert;
use relay_server::{AppState, app, stripe};
use serde_json::{Value, json};
use tower::ServiceExt;

const OWNER: &str = "tok-owner";
const LIAISON: &str = "tok-liaison";
const STRANGER: &str = "tok-stranger";
const ADMIN: &str = "tok-admin";
const WEBHOOK_SECRET: &str = "whsec_test";

struct TestApp {
    router: Router,
    service: Arc<RelayService>,
}

impl TestApp {
    async fn new() -> Self {
        let mut config = RelayConfig::default();
        config.clerk.dev_tokens = BTreeMap::from([
            (OWNER.to_string(), "user_owner".to_string()),
            (LIAISON.to_string(), "user_liaison".to_string()),
            (STRANGER.to_string(), "user_stranger".to_string()),
            (ADMIN.to_string(), "user_admin".to_string()),
        ]);
        config.admin.user_ids = vec!["user_admin".into()];
        config.stripe.webhook_secret = WEBHOOK_SECRET.into();
        config.email.support_inbox = "support@relay.example".into();

        let service = Arc::new(
            RelayService::new_local(
                ":memory:",
                BoardFeed::default(),
                ServiceSettings::from_config(&config),
            )
            .await
            .unwrap(),
        );
        let router = app(AppState::new(config, service.clone()));
        Self { router, service }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, String) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        org: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        if let Some(org) = org {
            req = req.header("x-organization-id", org);
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let (status, text) = self.send(req).await;
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, json)
    }

    /// Owner creates an organization and adds a liaison. Returns
    /// `(org_id, liaison_member_id)`.
    async fn org_with_liaison(&self) -> (String, String) {
        let (status, created) = self
            .call(
                Method::POST,
                "/api/organizations",
                Some(OWNER),
                None,
                Some(json!({ "name": "Sunrise Home Health", "owner_email": "owner@sunrise.example" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        let org_id = created["organization"]["id"].as_str().unwrap().to_string();

        let (status, member) = self
            .call(
                Method::POST,
                "/api/organizations/current/members",
                Some(OWNER),
                Some(&org_id),
                Some(json!({
                    "user_id": "user_liaison",
                    "email": "dana@sunrise.example",
                    "name": "Dana",
                    "role": "liaison",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{member}");
        (org_id, member["id"].as_str().unwrap().to_string())
    }
}

#[tokio::test]
async fn health_needs_no_auth() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/health", None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_or_unknown_tokens_are_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(Method::GET, "/api/organizations", None, None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app
        .call(Method::GET, "/api/organizations", Some("tok-bogus"), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_bodies_are_rejected_before_the_service() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/organizations",
            Some(OWNER),
            None,
            Some(json!({ "name": "", "owner_email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Validation failed"));
    assert!(app.service.list_organizations(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_query_strings_get_json_errors() {
    let app = TestApp::new().await;
    let (org_id, _) = app.org_with_liaison().await;

    let (status, body) = app
        .call(Method::GET, "/api/boards/leads?limit=abc", Some(OWNER), Some(&org_id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].as_str().unwrap().contains("query string"), "{body}");

    let (status, body) = app
        .call(Method::GET, "/api/user/admin/tickets?status=lost", Some(ADMIN), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn organization_membership_and_roles_are_enforced() {
    let app = TestApp::new().await;
    let (org_id, liaison_id) = app.org_with_liaison().await;

    let (status, org) = app
        .call(Method::GET, "/api/organizations/current", Some(LIAISON), Some(&org_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(org["slug"], "sunrise-home-health");

    let (status, _) = app
        .call(Method::GET, "/api/organizations/current", Some(STRANGER), Some(&org_id), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, "/api/organizations/current", Some(OWNER), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "no organization selected");

    // Liaisons cannot manage columns or members.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/boards/leads/fields",
            Some(LIAISON),
            Some(&org_id),
            Some(json!({ "name": "Source", "field_type": "text" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/organizations/current/members/{liaison_id}"),
            Some(LIAISON),
            Some(&org_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner is the last owner and cannot be demoted.
    let (_, members) = app
        .call(Method::GET, "/api/organizations/current/members", Some(OWNER), Some(&org_id), None)
        .await;
    let owner_member = members
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["role"] == "owner")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/organizations/current/members/{owner_member}"),
            Some(OWNER),
            Some(&org_id),
            Some(json!({ "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Adding the liaison queued a welcome email.
    let emails = app.service.list_emails(Some(EmailStatus::Pending), None).await.unwrap();
    assert!(emails.iter().any(|e| e.recipient == "dana@sunrise.example"));

    let (status, mine) = app
        .call(Method::GET, "/api/organizations", Some(LIAISON), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn referral_board_round_trip() {
    let app = TestApp::new().await;
    let (org_id, liaison_id) = app.org_with_liaison().await;
    let org = Some(org_id.as_str());

    let (status, source) = app
        .call(
            Method::POST,
            "/api/boards/referrals/fields",
            Some(OWNER),
            org,
            Some(json!({ "name": "Source", "field_type": "select", "options": ["Hospital", "Clinic"], "required": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{source}");
    let source_id = source["id"].as_str().unwrap();
    let (_, patient) = app
        .call(
            Method::POST,
            "/api/boards/referrals/fields",
            Some(OWNER),
            org,
            Some(json!({ "name": "Patient", "field_type": "text" })),
        )
        .await;
    let patient_id = patient["id"].as_str().unwrap();

    // Wrong option value.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/boards/referrals/records",
            Some(LIAISON),
            org,
            Some(json!({ "values": { source_id: "Pharmacy" } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, record) = app
        .call(
            Method::POST,
            "/api/boards/referrals/records",
            Some(LIAISON),
            org,
            Some(json!({
                "values": { source_id: "Hospital", patient_id: "J. Doe" },
                "liaison_id": liaison_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{record}");
    let record_id = record["id"].as_str().unwrap();
    assert_eq!(record["values"][patient_id], "J. Doe");

    let (status, view) = app
        .call(Method::GET, "/api/boards/referrals?q=doe", Some(LIAISON), org, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["total"], 1);
    assert_eq!(view["fields"].as_array().unwrap().len(), 2);

    let (status, summary) = app
        .call(Method::GET, "/api/boards/referrals/analytics", Some(LIAISON), org, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["by_liaison"][0]["name"], "Dana");

    // Export is for managers only.
    let (status, _) = app
        .call(Method::GET, "/api/boards/referrals/export", Some(LIAISON), org, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let req = Request::builder()
        .uri("/api/boards/referrals/export")
        .header("authorization", format!("Bearer {OWNER}"))
        .header("x-organization-id", &org_id)
        .body(Body::empty())
        .unwrap();
    let (status, csv) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(csv.starts_with("id,created_at,liaison,Source,Patient\n"), "{csv}");
    assert!(csv.contains(",Dana,Hospital,J. Doe"));

    // Hiding a column removes its values from reads.
    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/boards/referrals/fields/{patient_id}"),
            Some(OWNER),
            org,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, fetched) = app
        .call(
            Method::GET,
            &format!("/api/boards/referrals/records/{record_id}"),
            Some(LIAISON),
            org,
            None,
        )
        .await;
    assert!(fetched["values"].get(patient_id).is_none());

    let (status, options) = app
        .call(
            Method::GET,
            &format!("/api/options/fields/referrals/{source_id}"),
            Some(LIAISON),
            org,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options.as_array().unwrap().len(), 2);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/boards/referrals/records/{record_id}"),
            Some(LIAISON),
            org,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn boards_require_a_subscription_and_webhooks_restore_it() {
    let app = TestApp::new().await;
    let (org_id, _) = app.org_with_liaison().await;
    let org = Some(org_id.as_str());

    app.service
        .upsert_subscription(&org_id, &SubscriptionUpsert::new(SubscriptionStatus::Canceled))
        .await
        .unwrap();
    let (status, _) = app.call(Method::GET, "/api/boards/leads", Some(OWNER), org, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let event = json!({
        "id": "evt_1",
        "type": "customer.subscription.updated",
        "data": { "object": {
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active",
            "metadata": { "organization_id": org_id },
        }},
    })
    .to_string();
    let webhook = |signature: String| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/billing/webhook")
            .header("stripe-signature", signature)
            .body(Body::from(event.clone()))
            .unwrap()
    };

    let forged = format!("t={},v1={}", Utc::now().timestamp(), "ab".repeat(32));
    let (status, _) = app.send(webhook(forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let ts = Utc::now().timestamp();
    let good = format!("t={ts},v1={}", stripe::sign(WEBHOOK_SECRET, ts, event.as_bytes()).unwrap());
    let (status, _) = app.send(webhook(good)).await;
    assert_eq!(status, StatusCode::OK);

    let sub = app.service.get_subscription(&org_id).await.unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.stripe_customer_id.as_deref(), Some("cus_1"));
    let (status, _) = app.call(Method::GET, "/api/boards/leads", Some(OWNER), org, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::POST, "/api/billing/checkout", Some(OWNER), org, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn support_ticket_lifecycle() {
    let app = TestApp::new().await;

    let (status, thread) = app
        .call(
            Method::POST,
            "/api/support/tickets",
            Some(STRANGER),
            None,
            Some(json!({
                "subject": "Export is empty",
                "category": "technical",
                "priority": "high",
                "email": "sam@example.com",
                "message": "The CSV has no rows.",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{thread}");
    let ticket_id = thread["ticket"]["id"].as_str().unwrap().to_string();
    let emails = app.service.list_emails(None, None).await.unwrap();
    assert!(emails.iter().any(|e| e.recipient == "support@relay.example"));

    // Only the requester sees the thread; only admins see the desk.
    let (status, _) = app
        .call(Method::GET, &format!("/api/support/tickets/{ticket_id}"), Some(OWNER), None, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .call(Method::GET, "/api/user/admin/tickets", Some(OWNER), None, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, note) = app
        .call(
            Method::POST,
            &format!("/api/user/admin/tickets/{ticket_id}/messages"),
            Some(ADMIN),
            None,
            Some(json!({ "body": "Known bug", "internal": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{note}");
    let (_, customer_view) = app
        .call(Method::GET, &format!("/api/support/tickets/{ticket_id}"), Some(STRANGER), None, None)
        .await;
    assert_eq!(customer_view["messages"].as_array().unwrap().len(), 1);

    // Rating before resolution is refused.
    let rate = json!({ "rating": 5, "comment": "Quick fix" });
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/support/tickets/{ticket_id}/rating"),
            Some(STRANGER),
            None,
            Some(rate.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .call(
            Method::PATCH,
            &format!("/api/user/admin/tickets/{ticket_id}"),
            Some(ADMIN),
            None,
            Some(json!({ "status": "resolved", "assignee_id": "user_admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["ticket"]["status"], "resolved");
    assert_eq!(updated["ticket"]["assignee_id"], "user_admin");
    assert_eq!(updated["messages"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/support/tickets/{ticket_id}/rating"),
            Some(STRANGER),
            None,
            Some(rate.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/support/tickets/{ticket_id}/rating"),
            Some(STRANGER),
            None,
            Some(rate),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, summary) = app
        .call(Method::GET, "/api/user/admin/ratings", Some(ADMIN), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["count"], 1);

    let (status, closed) = app
        .call(
            Method::POST,
            &format!("/api/support/tickets/{ticket_id}/close"),
            Some(STRANGER),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "closed");

    // A rejected status change leaves the rest of the edit unapplied.
    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/api/user/admin/tickets/{ticket_id}"),
            Some(ADMIN),
            None,
            Some(json!({ "status": "open", "priority": "urgent", "assignee_id": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let ticket = app.service.get_ticket(&ticket_id).await.unwrap();
    assert_eq!(ticket.assignee_id.as_deref(), Some("user_admin"));
    assert_eq!(ticket.priority, TicketPriority::High);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/user/admin/tickets/{ticket_id}/assist"),
            Some(ADMIN),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn static_option_lists() {
    let app = TestApp::new().await;
    let (status, roles) = app
        .call(Method::GET, "/api/options/roles", Some(STRANGER), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roles.as_array().unwrap().len(), 4);

    let (status, _) = app
        .call(Method::GET, "/api/options/planets", Some(STRANGER), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::GET, "/api/options/roles", None, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn clerk_session_organization_is_used_without_a_header() {
    let harness = TestApp::new().await;
    let created = harness
        .service
        .create_organization(
            "user_owner",
            &CreateOrganizationRequest {
                name: "Linked Care".into(),
                clerk_org_id: Some("org_2linked".into()),
                owner_email: "owner@linked.example".into(),
                owner_name: None,
            },
        )
        .await
        .unwrap();

    let session = AuthIdentity {
        user_id: "user_owner".into(),
        org_id: Some("org_2linked".into()),
        org_slug: Some("linked-care".into()),
        org_role: Some("org:admin".into()),
    };
    let state = AppState::new(RelayConfig::default(), harness.service.clone())
        .with_authenticator(Authenticator::with_tokens([("tok-session".to_string(), session)]));
    let linked = TestApp {
        router: app(state),
        service: harness.service.clone(),
    };

    let (status, org) = linked
        .call(Method::GET, "/api/organizations/current", Some("tok-session"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{org}");
    assert_eq!(org["id"], created.organization.id.as_str());

    // The dev tokens of the default harness are not known to this authenticator.
    let (status, _) = linked
        .call(Method::GET, "/api/organizations/current", Some(OWNER), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
