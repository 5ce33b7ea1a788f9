//! Evidence/Compliance API: `GET /evidence`,
//! `GET /evidence/export`, and an HTML compliance report.

use crate::error::{evidence_error, ApiError};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::Json;
use chrono::{DateTime, Utc};
use modkit_domain::ControlTag;
use modkit_evidence::{list_evidence, EvidenceFilter};
use modkit_gate::AuthenticatedUser;
use modkit_domain::Role;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EvidenceQuery {
    pub control_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl EvidenceQuery {
    fn into_filter(self) -> EvidenceFilter {
        EvidenceFilter {
            control_id: self.control_id.as_deref().and_then(ControlTag::parse),
            from: self.from,
            to: self.to,
        }
    }
}

pub async fn get_evidence(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<EvidenceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = list_evidence(&state.pool, &query.into_filter()).await.map_err(evidence_error)?;
    Ok(Json(records))
}

/// Admin-only bulk export, same filters as `GET /evidence` but returned as a
/// downloadable JSON document.
pub async fn export_evidence(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<EvidenceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(crate::error::auth_error)?;
    let records = list_evidence(&state.pool, &query.into_filter()).await.map_err(evidence_error)?;
    let body = serde_json::to_vec_pretty(&records).unwrap_or_default();
    Ok((
        [(header::CONTENT_TYPE, "application/json"), (header::CONTENT_DISPOSITION, "attachment; filename=\"evidence_export.json\"")],
        body,
    ))
}

/// A minimal, hand-built HTML compliance report: per-control-tag
/// row counts over the requested window. No templating crate — the report
/// is small enough that `format!` stays readable.
pub async fn compliance_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<EvidenceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(crate::error::auth_error)?;
    let records = list_evidence(&state.pool, &query.into_filter()).await.map_err(evidence_error)?;

    let mut counts: std::collections::BTreeMap<&'static str, usize> = std::collections::BTreeMap::new();
    for record in &records {
        *counts.entry(record.control_id.as_str()).or_insert(0) += 1;
    }

    let mut rows = String::new();
    for (tag, count) in &counts {
        rows.push_str(&format!("<tr><td>{tag}</td><td>{count}</td></tr>\n"));
    }

    let html = format!(
        "<!DOCTYPE html>\n<html><head><title>Compliance Report</title></head><body>\n\
         <h1>Compliance Report</h1>\n\
         <p>Total evidence rows: {total}</p>\n\
         <table border=\"1\"><thead><tr><th>Control</th><th>Count</th></tr></thead><tbody>\n{rows}</tbody></table>\n\
         </body></html>",
        total = records.len(),
    );

    Ok(Html(html))
}
