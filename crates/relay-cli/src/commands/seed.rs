//! Demo data: one organization with typical columns and sample rows.

use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{Duration, Utc};
use relay_config::RelayConfig;
use relay_core::entities::Field;
use relay_core::enums::{BoardKind, FieldType};
use relay_core::requests::{CreateFieldRequest, CreateOrganizationRequest, CreateRecordRequest};
use relay_db::service::RelayService;
use serde::Serialize;

use crate::bootstrap;
use crate::cli::{GlobalFlags, SeedArgs};
use crate::output::output;

const FIRST_NAMES: &[&str] = &["Avery", "Jordan", "Morgan", "Riley", "Casey", "Quinn", "Rowan"];
const LAST_NAMES: &[&str] = &["Nguyen", "Patel", "Garcia", "Okafor", "Schmidt", "Kowalski"];
const LEAD_STATUSES: &[&str] = &["New", "Contacted", "Qualified", "Lost"];
const REFERRAL_SOURCES: &[&str] = &["Hospital", "Physician", "Clinic", "Family"];

#[derive(Debug, Serialize)]
pub struct SeedSummary {
    pub organization_id: String,
    pub slug: String,
    pub owner_member_id: String,
    pub lead_fields: usize,
    pub referral_fields: usize,
    pub leads: u32,
    pub referrals: u32,
}

pub async fn handle(args: &SeedArgs, config: &RelayConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let service = bootstrap::open_offline(config).await?;
    let summary = seed(&service, args).await?;
    output(&summary, flags.quiet)
}

struct Column {
    name: &'static str,
    field_type: FieldType,
    options: &'static [&'static str],
    required: bool,
}

const LEAD_COLUMNS: &[Column] = &[
    Column { name: "Name", field_type: FieldType::Text, options: &[], required: true },
    Column { name: "Phone", field_type: FieldType::Phone, options: &[], required: false },
    Column { name: "Email", field_type: FieldType::Email, options: &[], required: false },
    Column { name: "Status", field_type: FieldType::Select, options: LEAD_STATUSES, required: false },
    Column { name: "Follow-up", field_type: FieldType::Date, options: &[], required: false },
];

const REFERRAL_COLUMNS: &[Column] = &[
    Column { name: "Patient", field_type: FieldType::Text, options: &[], required: true },
    Column { name: "Source", field_type: FieldType::Select, options: REFERRAL_SOURCES, required: false },
    Column { name: "Phone", field_type: FieldType::Phone, options: &[], required: false },
    Column { name: "Received", field_type: FieldType::Date, options: &[], required: false },
];

async fn create_columns(
    service: &RelayService,
    actor: &str,
    organization_id: &str,
    board: BoardKind,
    columns: &[Column],
) -> anyhow::Result<Vec<Field>> {
    let mut fields = Vec::with_capacity(columns.len());
    for column in columns {
        let req = CreateFieldRequest {
            name: column.name.to_string(),
            field_type: column.field_type,
            options: column.options.iter().map(ToString::to_string).collect(),
            required: column.required,
        };
        let field = service
            .create_field(actor, organization_id, board, &req)
            .await
            .with_context(|| format!("failed to create {board} column '{}'", column.name))?;
        fields.push(field);
    }
    Ok(fields)
}

/// A valid sample value for row `i` of a column.
fn sample_value(field: &Field, i: usize) -> String {
    let first = FIRST_NAMES[i % FIRST_NAMES.len()];
    let last = LAST_NAMES[(i / FIRST_NAMES.len() + i) % LAST_NAMES.len()];
    match field.field_type {
        FieldType::Text => format!("{first} {last}"),
        FieldType::Phone => format!("+1 555-{:04}", 100 + i),
        FieldType::Email => format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        FieldType::Select => field
            .options
            .get(i % field.options.len().max(1))
            .cloned()
            .unwrap_or_default(),
        FieldType::Date => {
            let days = i64::try_from(i % 60).unwrap_or_default();
            (Utc::now().date_naive() - Duration::days(days)).format("%Y-%m-%d").to_string()
        }
        FieldType::Number => (i + 1).to_string(),
        FieldType::Checkbox => (i % 2 == 0).to_string(),
    }
}

fn sample_values(fields: &[Field], i: usize) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|f| (f.id.clone(), sample_value(f, i)))
        .filter(|(_, v)| !v.is_empty())
        .collect()
}

/// Create the organization, its columns and `args.leads` + `args.referrals`
/// rows. Referrals are credited to the owner and linked to seeded leads.
pub async fn seed(service: &RelayService, args: &SeedArgs) -> anyhow::Result<SeedSummary> {
    let created = service
        .create_organization(
            &args.owner,
            &CreateOrganizationRequest {
                name: args.name.clone(),
                clerk_org_id: None,
                owner_email: args.email.clone(),
                owner_name: None,
            },
        )
        .await
        .context("failed to create organization")?;
    let org_id = created.organization.id.as_str();

    let lead_fields = create_columns(service, &args.owner, org_id, BoardKind::Leads, LEAD_COLUMNS).await?;
    let referral_fields =
        create_columns(service, &args.owner, org_id, BoardKind::Referrals, REFERRAL_COLUMNS).await?;

    let mut lead_ids = Vec::new();
    for i in 0..args.leads as usize {
        let record = service
            .create_record(
                &args.owner,
                org_id,
                BoardKind::Leads,
                &CreateRecordRequest {
                    values: sample_values(&lead_fields, i),
                    ..CreateRecordRequest::default()
                },
            )
            .await?;
        lead_ids.push(record.id);
    }

    for i in 0..args.referrals as usize {
        let lead_id = (!lead_ids.is_empty()).then(|| lead_ids[i % lead_ids.len()].clone());
        service
            .create_record(
                &args.owner,
                org_id,
                BoardKind::Referrals,
                &CreateRecordRequest {
                    values: sample_values(&referral_fields, i),
                    liaison_id: Some(created.owner.id.clone()),
                    lead_id,
                },
            )
            .await?;
    }

    tracing::info!(org = org_id, leads = args.leads, referrals = args.referrals, "seeded organization");
    Ok(SeedSummary {
        organization_id: created.organization.id.clone(),
        slug: created.organization.slug.clone(),
        owner_member_id: created.owner.id.clone(),
        lead_fields: lead_fields.len(),
        referral_fields: referral_fields.len(),
        leads: args.leads,
        referrals: args.referrals,
    })
}
