use crate::assignments::{self, AssignmentWriteError};
use crate::types::{Assignment, Membership, Shift};
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sesv2::Client as SesClient;
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters of one rotation pass
#[derive(Debug, Clone)]
pub struct RotationParams {
    /// Ministries to process; empty means every ministry in the catalog
    pub ministry_ids: Vec<String>,
    /// Lookahead window in days, counted from today
    pub days: i64,
    /// Compute the pass without persisting assignments or sending email
    pub dry_run: bool,
    /// Send a notification email per created assignment
    pub notify: bool,
    /// Stop assigning for a ministry once this many assignments were created
    pub limit_per_ministry: Option<u32>,
}

/// Outcome of one rotation pass
#[derive(Debug, Default, Serialize)]
pub struct RotationSummary {
    pub created: u32,
    pub emailed: u32,
    pub skipped_no_members: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("store error: {0}")]
    Store(String),
}

/// One roster member annotated with their most recent assignment timestamp
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub person_id: String,
    pub name: String,
    pub email: String,
    /// RFC 3339; None means never assigned in this ministry
    pub last_assigned: Option<String>,
}

/// Order the roster fairest-first: never-assigned members sort ahead of
/// everyone, then oldest assignment first, ties broken by person id so the
/// order is deterministic.
pub fn rank_roster(members: &[Membership], last: &HashMap<String, String>) -> Vec<RosterEntry> {
    let mut roster: Vec<RosterEntry> = members
        .iter()
        .map(|m| RosterEntry {
            person_id: m.person_id.clone(),
            name: m.name.clone(),
            email: m.email.clone(),
            last_assigned: last.get(&m.person_id).cloned(),
        })
        .collect();

    // None sorts before Some, so never-assigned members come first
    roster.sort_by(|a, b| {
        a.last_assigned
            .cmp(&b.last_assigned)
            .then_with(|| a.person_id.cmp(&b.person_id))
    });
    roster
}

/// Walk a ministry's shifts in date order, pairing each with the next roster
/// member round-robin. The rotation pointer wraps, so with more shifts than
/// members the roster repeats. The cap leaves later shifts for a future run.
pub fn plan_rotation<'a>(
    shifts: &'a [Shift],
    roster: &'a [RosterEntry],
    limit: Option<u32>,
) -> Vec<(&'a Shift, &'a RosterEntry)> {
    if roster.is_empty() {
        return Vec::new();
    }

    let mut plan = Vec::new();
    let mut pointer = 0usize;
    for shift in shifts {
        if let Some(cap) = limit {
            if plan.len() as u32 >= cap {
                break;
            }
        }
        plan.push((shift, &roster[pointer % roster.len()]));
        pointer += 1;
    }
    plan
}

/// Per-ministry planning outcome
#[derive(Debug)]
pub enum MinistryPlan {
    /// The ministry had unfilled shifts but nobody eligible; reported in the
    /// summary, never treated as an error
    SkippedNoMembers,
    Planned(Vec<(Shift, RosterEntry)>),
}

/// Rank one ministry's roster and pair it with its shifts in a single step
pub fn plan_ministry(
    shifts: &[Shift],
    members: &[Membership],
    last: &HashMap<String, String>,
    limit: Option<u32>,
) -> MinistryPlan {
    if members.is_empty() {
        return MinistryPlan::SkippedNoMembers;
    }

    let roster = rank_roster(members, last);
    let plan = plan_rotation(shifts, &roster, limit)
        .into_iter()
        .map(|(shift, entry)| (shift.clone(), entry.clone()))
        .collect();
    MinistryPlan::Planned(plan)
}

/// Run one rotation pass over the lookahead window
///
/// Failures below the parameter level never abort the pass: an unfillable
/// shift or a bounced email lands in `errors` and the pass moves on. Re-running
/// is safe because only still-unassigned shifts are fetched.
pub async fn run_rotation(
    dynamo_client: &DynamoClient,
    ses_client: &SesClient,
    table_name: &str,
    params: &RotationParams,
) -> Result<RotationSummary, RotationError> {
    if params.days < 1 {
        return Err(RotationError::InvalidParameter(
            "days must be at least 1".to_string(),
        ));
    }
    if params.limit_per_ministry == Some(0) {
        return Err(RotationError::InvalidParameter(
            "limit_per_ministry must be at least 1".to_string(),
        ));
    }
    if params.ministry_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(RotationError::InvalidParameter(
            "ministry ids must not be empty".to_string(),
        ));
    }

    let mut ministry_ids = if params.ministry_ids.is_empty() {
        crate::ministries::list_ministry_ids(dynamo_client, table_name)
            .await
            .map_err(RotationError::Store)?
    } else {
        params.ministry_ids.clone()
    };
    ministry_ids.sort();
    ministry_ids.dedup();

    let today = chrono::Utc::now().date_naive();
    let mut summary = RotationSummary::default();

    for ministry_id in &ministry_ids {
        let shifts = crate::shifts::list_unassigned_shifts(
            dynamo_client,
            table_name,
            ministry_id,
            today,
            params.days,
        )
        .await
        .map_err(RotationError::Store)?;

        if shifts.is_empty() {
            continue;
        }

        let members = crate::members::list_active_members(dynamo_client, table_name, ministry_id)
            .await
            .map_err(RotationError::Store)?;

        let last = if members.is_empty() {
            HashMap::new()
        } else {
            assignments::last_assignment_map(dynamo_client, table_name, ministry_id)
                .await
                .map_err(RotationError::Store)?
        };

        let plan = match plan_ministry(&shifts, &members, &last, params.limit_per_ministry) {
            MinistryPlan::SkippedNoMembers => {
                tracing::info!("Ministry {} has no active members, skipping", ministry_id);
                summary.skipped_no_members.push(ministry_id.clone());
                continue;
            }
            MinistryPlan::Planned(plan) => plan,
        };

        if params.dry_run {
            for (shift, entry) in &plan {
                tracing::info!(
                    "Dry run: would assign {} ({}) to {} on {}",
                    entry.name,
                    entry.person_id,
                    shift.role,
                    shift.date
                );
            }
            continue;
        }

        let ministry_name = if params.notify {
            crate::ministries::get_ministry_name(dynamo_client, table_name, ministry_id)
                .await
                .unwrap_or(None)
                .unwrap_or_else(|| ministry_id.clone())
        } else {
            String::new()
        };

        for (shift, entry) in plan {
            let assignment = Assignment {
                shift_id: shift.shift_id.clone(),
                ministry_id: ministry_id.clone(),
                person_id: entry.person_id.clone(),
                person_name: entry.name.clone(),
                person_email: entry.email.clone(),
                role: shift.role.clone(),
                date: shift.date.clone(),
                assigned_at: chrono::Utc::now().to_rfc3339(),
                assigned_by: "rotation".to_string(),
                notified: false,
                reminded: false,
            };

            match assignments::write_assignment(dynamo_client, table_name, &assignment).await {
                Ok(()) => {}
                Err(AssignmentWriteError::Conflict) => {
                    summary
                        .errors
                        .push(format!("shift {}: already assigned", shift.shift_id));
                    continue;
                }
                Err(AssignmentWriteError::Store(msg)) => {
                    summary
                        .errors
                        .push(format!("shift {}: {}", shift.shift_id, msg));
                    continue;
                }
            }
            summary.created += 1;

            if params.notify {
                match crate::email::send_assignment_email(
                    ses_client,
                    &entry.email,
                    &entry.name,
                    &ministry_name,
                    &shift.role,
                    &shift.date,
                )
                .await
                {
                    Ok(()) => {
                        summary.emailed += 1;
                        if let Err(e) = assignments::set_notified(
                            dynamo_client,
                            table_name,
                            ministry_id,
                            &shift.shift_id,
                        )
                        .await
                        {
                            tracing::warn!(
                                "Assignment {} sent but flag update failed: {}",
                                shift.shift_id,
                                e
                            );
                        }
                    }
                    Err(e) => {
                        summary
                            .errors
                            .push(format!("email to {}: {}", entry.email, e));
                    }
                }
            }
        }
    }

    tracing::info!(
        "Rotation pass done: created={} emailed={} skipped={} errors={}",
        summary.created,
        summary.emailed,
        summary.skipped_no_members.len(),
        summary.errors.len()
    );

    Ok(summary)
}

// ========== HTTP ACTION ==========

#[derive(Debug, Deserialize)]
pub struct RotateRequest {
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub notify: bool,
    pub limit_per_ministry: Option<u32>,
}

fn default_days() -> i64 {
    14
}

/// POST /ministries/{id}/rotate
pub async fn rotate_ministry(
    dynamo_client: &DynamoClient,
    ses_client: &SesClient,
    table_name: &str,
    ministry_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: RotateRequest = if body.is_empty() {
        RotateRequest {
            days: default_days(),
            dry_run: false,
            notify: false,
            limit_per_ministry: None,
        }
    } else {
        match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                return Ok(Response::builder()
                    .status(StatusCode::BAD_REQUEST)
                    .header("Content-Type", "application/json")
                    .header("Access-Control-Allow-Origin", "*")
                    .body(
                        serde_json::json!({"error": format!("Invalid request body: {}", e)})
                            .to_string()
                            .into(),
                    )
                    .map_err(Box::new)?)
            }
        }
    };

    let params = RotationParams {
        ministry_ids: vec![ministry_id.to_string()],
        days: req.days,
        dry_run: req.dry_run,
        notify: req.notify,
        limit_per_ministry: req.limit_per_ministry,
    };

    match run_rotation(dynamo_client, ses_client, table_name, &params).await {
        Ok(summary) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::to_string(&summary)?.into())
            .map_err(Box::new)?),
        Err(RotationError::InvalidParameter(msg)) => Ok(Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::json!({"error": msg}).to_string().into())
            .map_err(Box::new)?),
        Err(RotationError::Store(msg)) => {
            tracing::error!("Rotation pass failed: {}", msg);
            Ok(Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": "Rotation pass failed"})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(person_id: &str, name: &str) -> Membership {
        Membership {
            ministry_id: "youth".to_string(),
            person_id: person_id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.org", person_id),
            role: "helper".to_string(),
            active: true,
            joined_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn shift(shift_id: &str, date: &str) -> Shift {
        Shift {
            shift_id: shift_id.to_string(),
            ministry_id: "youth".to_string(),
            date: date.to_string(),
            role: "helper".to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn never_assigned_ranks_before_recently_assigned() {
        let members = vec![membership("a", "A"), membership("b", "B")];
        let mut last = HashMap::new();
        // B was assigned 3 days ago, A never
        last.insert("b".to_string(), "2026-08-27T10:00:00+00:00".to_string());

        let roster = rank_roster(&members, &last);
        assert_eq!(roster[0].person_id, "a");
        assert_eq!(roster[1].person_id, "b");
    }

    #[test]
    fn oldest_assignment_ranks_first() {
        let members = vec![membership("a", "A"), membership("b", "B")];
        let mut last = HashMap::new();
        last.insert("a".to_string(), "2026-08-20T10:00:00+00:00".to_string());
        last.insert("b".to_string(), "2026-08-27T10:00:00+00:00".to_string());

        let roster = rank_roster(&members, &last);
        assert_eq!(roster[0].person_id, "a");
    }

    #[test]
    fn rank_ties_break_on_person_id() {
        let members = vec![membership("b", "B"), membership("a", "A")];
        let roster = rank_roster(&members, &HashMap::new());
        assert_eq!(roster[0].person_id, "a");
        assert_eq!(roster[1].person_id, "b");
    }

    #[test]
    fn youth_scenario_round_robin() {
        // X last assigned 10 days ago, Y never; shifts at day+1 and day+3
        let members = vec![membership("x", "X"), membership("y", "Y")];
        let mut last = HashMap::new();
        last.insert("x".to_string(), "2026-08-20T10:00:00+00:00".to_string());
        let roster = rank_roster(&members, &last);

        let shifts = vec![shift("s1", "2026-08-31"), shift("s2", "2026-09-02")];
        let plan = plan_rotation(&shifts, &roster, None);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].0.shift_id, "s1");
        assert_eq!(plan[0].1.person_id, "y");
        assert_eq!(plan[1].0.shift_id, "s2");
        assert_eq!(plan[1].1.person_id, "x");
    }

    #[test]
    fn rotation_wraps_when_shifts_outnumber_members() {
        let members = vec![membership("a", "A"), membership("b", "B")];
        let roster = rank_roster(&members, &HashMap::new());

        let shifts = vec![
            shift("s1", "2026-08-31"),
            shift("s2", "2026-09-01"),
            shift("s3", "2026-09-02"),
        ];
        let plan = plan_rotation(&shifts, &roster, None);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].1.person_id, "a");
        assert_eq!(plan[1].1.person_id, "b");
        assert_eq!(plan[2].1.person_id, "a");
    }

    #[test]
    fn cap_limits_assignments_per_ministry() {
        let members = vec![membership("a", "A"), membership("b", "B")];
        let roster = rank_roster(&members, &HashMap::new());

        let shifts = vec![
            shift("s1", "2026-08-31"),
            shift("s2", "2026-09-01"),
            shift("s3", "2026-09-02"),
        ];
        let plan = plan_rotation(&shifts, &roster, Some(1));

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].0.shift_id, "s1");
    }

    #[test]
    fn each_shift_planned_at_most_once() {
        let members = vec![membership("a", "A")];
        let roster = rank_roster(&members, &HashMap::new());

        let shifts = vec![
            shift("s1", "2026-08-31"),
            shift("s2", "2026-09-01"),
            shift("s3", "2026-09-02"),
        ];
        let plan = plan_rotation(&shifts, &roster, None);

        let mut ids: Vec<&str> = plan.iter().map(|(s, _)| s.shift_id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn no_shifts_plans_nothing() {
        // A pass over an already fully assigned window has nothing to do
        let members = vec![membership("a", "A")];
        let roster = rank_roster(&members, &HashMap::new());
        let plan = plan_rotation(&[], &roster, None);
        assert!(plan.is_empty());
    }

    #[test]
    fn empty_roster_plans_nothing() {
        let shifts = vec![shift("s1", "2026-08-31")];
        let plan = plan_rotation(&shifts, &[], None);
        assert!(plan.is_empty());
    }

    #[test]
    fn ministry_without_active_members_is_skipped() {
        // One unfilled shift in the window but nobody eligible: the ministry
        // is reported as skipped, and nothing is assigned
        let shifts = vec![shift("s1", "2026-08-31")];
        let plan = plan_ministry(&shifts, &[], &HashMap::new(), None);
        assert!(matches!(plan, MinistryPlan::SkippedNoMembers));
    }

    #[test]
    fn ministry_with_members_gets_a_plan() {
        let members = vec![membership("a", "A")];
        let shifts = vec![shift("s1", "2026-08-31"), shift("s2", "2026-09-01")];

        match plan_ministry(&shifts, &members, &HashMap::new(), None) {
            MinistryPlan::Planned(pairs) => {
                assert_eq!(pairs.len(), 2);
                assert!(pairs.iter().all(|(_, entry)| entry.person_id == "a"));
            }
            MinistryPlan::SkippedNoMembers => panic!("expected a plan"),
        }
    }
}
