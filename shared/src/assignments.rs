use crate::types::{Assignment, CreateAssignmentRequest, UpdateAssignmentRequest};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::HashMap;

/// Failure modes of writing an assignment record
#[derive(Debug, thiserror::Error)]
pub enum AssignmentWriteError {
    #[error("shift already has an assignment")]
    Conflict,
    #[error("{0}")]
    Store(String),
}

/// Persist one assignment for one shift
///
/// The conditional put is what enforces "at most one assignment per shift":
/// a concurrent run or a manual assignment racing on the same shift loses the
/// condition and surfaces as `Conflict` instead of overwriting.
pub async fn write_assignment(
    client: &DynamoClient,
    table_name: &str,
    assignment: &Assignment,
) -> Result<(), AssignmentWriteError> {
    let pk = format!("MINISTRY#{}", assignment.ministry_id);
    let sk = format!("ASSIGNMENT#{}", assignment.shift_id);

    let result = client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(pk))
        .item("SK", AttributeValue::S(sk))
        .item("person_id", AttributeValue::S(assignment.person_id.clone()))
        .item("person_name", AttributeValue::S(assignment.person_name.clone()))
        .item("person_email", AttributeValue::S(assignment.person_email.clone()))
        .item("role", AttributeValue::S(assignment.role.clone()))
        .item("shift_date", AttributeValue::S(assignment.date.clone()))
        .item("assigned_at", AttributeValue::S(assignment.assigned_at.clone()))
        .item("assigned_by", AttributeValue::S(assignment.assigned_by.clone()))
        .item("notified", AttributeValue::Bool(assignment.notified))
        .item("reminded", AttributeValue::Bool(assignment.reminded))
        .condition_expression("attribute_not_exists(SK)")
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            let service_err = e.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                Err(AssignmentWriteError::Conflict)
            } else {
                Err(AssignmentWriteError::Store(format!("{:?}", service_err)))
            }
        }
    }
}

/// Mark an assignment as notified after a successful email send
pub async fn set_notified(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    shift_id: &str,
) -> Result<(), String> {
    client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("MINISTRY#{}", ministry_id)))
        .key("SK", AttributeValue::S(format!("ASSIGNMENT#{}", shift_id)))
        .update_expression("SET notified = :notified")
        .expression_attribute_values(":notified", AttributeValue::Bool(true))
        .send()
        .await
        .map_err(|e| format!("Failed to set notified flag: {:?}", e))?;

    Ok(())
}

/// Most recent assignment timestamp per person for one ministry
///
/// One query per ministry, aggregated in code; never one query per member.
pub async fn last_assignment_map(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<HashMap<String, String>, String> {
    let assignments = query_assignments(client, table_name, ministry_id).await?;

    let mut last: HashMap<String, String> = HashMap::new();
    for a in assignments {
        match last.get(&a.person_id) {
            Some(existing) if existing.as_str() >= a.assigned_at.as_str() => {}
            _ => {
                last.insert(a.person_id, a.assigned_at);
            }
        }
    }

    Ok(last)
}

/// List a ministry's assignments, soonest shift first
pub async fn list_assignments(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<Response<Body>, Error> {
    let mut assignments = query_assignments(client, table_name, ministry_id)
        .await
        .map_err(Error::from)?;

    assignments.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.role.cmp(&b.role)));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&assignments)?.into())
        .map_err(Box::new)?)
}

/// Manually assign a person to a shift
pub async fn create_assignment(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    user_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CreateAssignmentRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Invalid create assignment body: {}", e);
            return bad_request(&format!("Invalid request body: {}", e));
        }
    };

    let shifts = crate::shifts::list_unassigned_shifts(
        client,
        table_name,
        ministry_id,
        chrono::Utc::now().date_naive(),
        365,
    )
    .await
    .map_err(Error::from)?;

    let shift = match shifts.into_iter().find(|s| s.shift_id == req.shift_id) {
        Some(s) => s,
        None => {
            return Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": "Shift not found or already assigned"})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?)
        }
    };

    let members = crate::members::list_active_members(client, table_name, ministry_id)
        .await
        .map_err(Error::from)?;
    let member = match members.into_iter().find(|m| m.person_id == req.person_id) {
        Some(m) => m,
        None => {
            return Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": "No active membership for this person"})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?)
        }
    };

    let assignment = Assignment {
        shift_id: shift.shift_id,
        ministry_id: ministry_id.to_string(),
        person_id: member.person_id,
        person_name: member.name,
        person_email: member.email,
        role: shift.role,
        date: shift.date,
        assigned_at: chrono::Utc::now().to_rfc3339(),
        assigned_by: user_id.to_string(),
        notified: false,
        reminded: false,
    };

    match write_assignment(client, table_name, &assignment).await {
        Ok(()) => Ok(Response::builder()
            .status(StatusCode::CREATED)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::to_string(&assignment)?.into())
            .map_err(Box::new)?),
        Err(AssignmentWriteError::Conflict) => Ok(Response::builder()
            .status(StatusCode::CONFLICT)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "Shift already has an assignment"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?),
        Err(AssignmentWriteError::Store(msg)) => {
            tracing::error!("Failed to create assignment: {}", msg);
            Ok(Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": "Failed to create assignment"})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?)
        }
    }
}

/// Update an assignment's reminded flag
pub async fn update_assignment(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    shift_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UpdateAssignmentRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(&format!("Invalid request body: {}", e)),
    };

    if let Some(reminded) = req.reminded {
        let result = client
            .update_item()
            .table_name(table_name)
            .key("PK", AttributeValue::S(format!("MINISTRY#{}", ministry_id)))
            .key("SK", AttributeValue::S(format!("ASSIGNMENT#{}", shift_id)))
            .update_expression("SET reminded = :reminded")
            .expression_attribute_values(":reminded", AttributeValue::Bool(reminded))
            .condition_expression("attribute_exists(SK)")
            .send()
            .await;

        if let Err(e) = result {
            let service_err = e.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                return Ok(Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .header("Content-Type", "application/json")
                    .header("Access-Control-Allow-Origin", "*")
                    .body(
                        serde_json::json!({"error": "Assignment not found"})
                            .to_string()
                            .into(),
                    )
                    .map_err(Box::new)?);
            }
            return Err(Box::new(service_err));
        }
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"updated": shift_id}).to_string().into())
        .map_err(Box::new)?)
}

async fn query_assignments(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<Vec<Assignment>, String> {
    let pk = format!("MINISTRY#{}", ministry_id);

    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(pk))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("ASSIGNMENT#".to_string()))
        .send()
        .await
        .map_err(|e| format!("Failed to query assignments: {:?}", e))?;

    let mut assignments = Vec::new();
    for item in result.items() {
        let sk = item.get("SK").and_then(|v| v.as_s().ok());
        let shift_id = match sk.and_then(|s| s.strip_prefix("ASSIGNMENT#")) {
            Some(id) => id.to_string(),
            None => continue,
        };
        assignments.push(Assignment {
            shift_id,
            ministry_id: ministry_id.to_string(),
            person_id: get_s(item, "person_id"),
            person_name: get_s(item, "person_name"),
            person_email: get_s(item, "person_email"),
            role: get_s(item, "role"),
            date: get_s(item, "shift_date"),
            assigned_at: get_s(item, "assigned_at"),
            assigned_by: get_s(item, "assigned_by"),
            notified: item
                .get("notified")
                .and_then(|v| v.as_bool().ok())
                .copied()
                .unwrap_or(false),
            reminded: item
                .get("reminded")
                .and_then(|v| v.as_bool().ok())
                .copied()
                .unwrap_or(false),
        });
    }

    Ok(assignments)
}

fn get_s(item: &HashMap<String, AttributeValue>, attr: &str) -> String {
    item.get(attr)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

fn bad_request(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}
