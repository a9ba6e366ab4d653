//! Serde roundtrip and JsonSchema validation for entities and request bodies.

use std::collections::BTreeMap;

use chrono::Utc;
use pretty_assertions::assert_eq;
use relay_core::entities::*;
use relay_core::enums::*;
use relay_core::requests::*;
use relay_core::responses::*;
use schemars::schema_for;

fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::options()
        .should_validate_formats(true)
        .build(schema)
        .expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(recovered, val, "serde roundtrip failed for {}", stringify!($ty));

            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "schema validation failed for {}: {errors:?}",
                stringify!($ty)
            );
        }
    };
}

roundtrip_and_validate!(
    referral_roundtrip,
    BoardRecord,
    BoardRecord {
        id: "ref-a3f8b2c1".into(),
        board: BoardKind::Referrals,
        organization_id: "org-0c1d2e3f".into(),
        liaison_id: Some("mem-11aa22bb".into()),
        lead_id: Some("led-9f8e7d6c".into()),
        created_by: "user_2abc".into(),
        values: BTreeMap::from([
            ("rfd-00000001".to_string(), "St. Mary's".to_string()),
            ("rfd-00000002".to_string(), "2026-04-02".to_string()),
        ]),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    select_field_roundtrip,
    Field,
    Field {
        id: "lfd-c4e2d1f0".into(),
        organization_id: "org-0c1d2e3f".into(),
        board: BoardKind::Leads,
        name: "Insurance".into(),
        field_type: FieldType::Select,
        options: vec!["Medicare".into(), "Medicaid".into(), "Private".into()],
        position: 3,
        required: true,
        hidden: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    ticket_roundtrip,
    SupportTicket,
    SupportTicket {
        id: "tkt-b7a3f9e2".into(),
        organization_id: Some("org-0c1d2e3f".into()),
        requester_id: "user_2abc".into(),
        requester_email: "owner@sunrise.example".into(),
        subject: "CSV export missing columns".into(),
        category: TicketCategory::Technical,
        priority: TicketPriority::High,
        status: TicketStatus::WaitingOnCustomer,
        assignee_id: Some("user_admin".into()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        resolved_at: None,
    }
);

roundtrip_and_validate!(
    rating_summary_roundtrip,
    RatingSummary,
    RatingSummary {
        count: 4,
        average: Some(4.25),
        distribution: [0, 0, 1, 1, 2],
    }
);

// --- Request schema checks ---

fn request_schema<T: schemars::JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schema_for!(T)).unwrap()
}

#[test]
fn create_ticket_rejects_bad_email_and_short_subject() {
    let schema = request_schema::<CreateTicketRequest>();
    let invalid = serde_json::json!({
        "subject": "hi",
        "category": "billing",
        "email": "not-an-email",
        "message": "help"
    });
    let errors = validate_against_schema(&schema, &invalid);
    assert_eq!(errors.len(), 2, "expected subject and email errors: {errors:?}");
}

#[test]
fn create_ticket_accepts_minimal_body_with_default_priority() {
    let schema = request_schema::<CreateTicketRequest>();
    let body = serde_json::json!({
        "subject": "Cannot invite liaison",
        "category": "account",
        "email": "owner@sunrise.example",
        "message": "The invite button does nothing."
    });
    assert!(validate_against_schema(&schema, &body).is_empty());

    let parsed: CreateTicketRequest = serde_json::from_value(body).unwrap();
    assert_eq!(parsed.priority, TicketPriority::Normal);
}

#[test]
fn rate_ticket_rejects_out_of_range_rating() {
    let schema = request_schema::<RateTicketRequest>();
    for rating in [0, 6] {
        let errors = validate_against_schema(&schema, &serde_json::json!({ "rating": rating }));
        assert!(!errors.is_empty(), "rating {rating} should be rejected");
    }
    assert!(validate_against_schema(&schema, &serde_json::json!({ "rating": 5 })).is_empty());
}

#[test]
fn create_field_rejects_unknown_type() {
    let schema = request_schema::<CreateFieldRequest>();
    let invalid = serde_json::json!({ "name": "Color", "field_type": "colour" });
    assert!(!validate_against_schema(&schema, &invalid).is_empty());
}
