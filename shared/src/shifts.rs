use crate::types::{CreateShiftRequest, Shift};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::NaiveDate;
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::HashSet;

/// Create a shift for a ministry
///
/// The sort key is SHIFT#{date}#{role}, so the (ministry, date, role) triple
/// is unique by construction; a duplicate returns 409.
pub async fn create_shift(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CreateShiftRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Invalid create shift body: {}", e);
            return bad_request(&format!("Invalid request body: {}", e));
        }
    };

    if NaiveDate::parse_from_str(&req.date, "%Y-%m-%d").is_err() {
        return bad_request("date must be formatted YYYY-MM-DD");
    }
    if req.role.trim().is_empty() {
        return bad_request("role must not be empty");
    }

    let shift_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let pk = format!("MINISTRY#{}", ministry_id);
    let sk = format!("SHIFT#{}#{}", req.date, req.role);

    let result = client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(pk))
        .item("SK", AttributeValue::S(sk))
        .item("shift_id", AttributeValue::S(shift_id.clone()))
        .item("shift_date", AttributeValue::S(req.date.clone()))
        .item("role", AttributeValue::S(req.role.clone()))
        .item("created_at", AttributeValue::S(now.clone()))
        .condition_expression("attribute_not_exists(SK)")
        .send()
        .await;

    match result {
        Ok(_) => {
            let shift = Shift {
                shift_id,
                ministry_id: ministry_id.to_string(),
                date: req.date,
                role: req.role,
                created_at: now,
            };

            Ok(Response::builder()
                .status(StatusCode::CREATED)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::to_string(&shift)?.into())
                .map_err(Box::new)?)
        }
        Err(e) => {
            let service_err = e.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                Ok(Response::builder()
                    .status(StatusCode::CONFLICT)
                    .header("Content-Type", "application/json")
                    .header("Access-Control-Allow-Origin", "*")
                    .body(
                        serde_json::json!({"error": "A shift for this date and role already exists"})
                            .to_string()
                            .into(),
                    )
                    .map_err(Box::new)?)
            } else {
                Err(Box::new(service_err))
            }
        }
    }
}

/// List a ministry's shifts
///
/// `days` limits the window to [today, today+days]; `unassigned_only` drops
/// shifts that already have an assignment.
pub async fn list_shifts(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    days: Option<i64>,
    unassigned_only: bool,
) -> Result<Response<Body>, Error> {
    let mut shifts = query_shifts(client, table_name, ministry_id)
        .await
        .map_err(Error::from)?;

    if let Some(days) = days {
        if days < 0 {
            return bad_request("days must not be negative");
        }
        let today = chrono::Utc::now().date_naive();
        let until = today + chrono::Duration::days(days);
        let from = today.format("%Y-%m-%d").to_string();
        let to = until.format("%Y-%m-%d").to_string();
        // YYYY-MM-DD compares chronologically as a string
        shifts.retain(|s| s.date >= from && s.date <= to);
    }

    if unassigned_only {
        let assigned = query_assigned_shift_ids(client, table_name, ministry_id)
            .await
            .map_err(Error::from)?;
        shifts.retain(|s| !assigned.contains(&s.shift_id));
    }

    shifts.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.role.cmp(&b.role)));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&shifts)?.into())
        .map_err(Box::new)?)
}

/// Delete a shift and its assignment, if any
pub async fn delete_shift(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    shift_id: &str,
) -> Result<Response<Body>, Error> {
    let shifts = query_shifts(client, table_name, ministry_id)
        .await
        .map_err(Error::from)?;

    let shift = match shifts.into_iter().find(|s| s.shift_id == shift_id) {
        Some(s) => s,
        None => {
            return Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": "Shift not found"})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?)
        }
    };

    let pk = format!("MINISTRY#{}", ministry_id);

    // The assignment cascades with its shift; one batch removes both, so a
    // partial failure cannot leave an orphaned assignment behind
    let mut requests = Vec::new();
    for sk in [
        format!("SHIFT#{}#{}", shift.date, shift.role),
        format!("ASSIGNMENT#{}", shift_id),
    ] {
        let mut key = std::collections::HashMap::new();
        key.insert("PK".to_string(), AttributeValue::S(pk.clone()));
        key.insert("SK".to_string(), AttributeValue::S(sk));
        let delete = aws_sdk_dynamodb::types::DeleteRequest::builder()
            .set_key(Some(key))
            .build()
            .map_err(|e| format!("Failed to build delete request: {:?}", e))?;
        requests.push(
            aws_sdk_dynamodb::types::WriteRequest::builder()
                .delete_request(delete)
                .build(),
        );
    }

    client
        .batch_write_item()
        .request_items(table_name, requests)
        .send()
        .await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"deleted": shift_id}).to_string().into())
        .map_err(Box::new)?)
}

/// Fetch a ministry's shifts in [today, today+days] that have no assignment,
/// sorted by date. Used by the rotation engine.
pub async fn list_unassigned_shifts(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    today: NaiveDate,
    days: i64,
) -> Result<Vec<Shift>, String> {
    let mut shifts = query_shifts(client, table_name, ministry_id).await?;

    let until = today + chrono::Duration::days(days);
    let from = today.format("%Y-%m-%d").to_string();
    let to = until.format("%Y-%m-%d").to_string();
    shifts.retain(|s| s.date >= from && s.date <= to);

    let assigned = query_assigned_shift_ids(client, table_name, ministry_id).await?;
    shifts.retain(|s| !assigned.contains(&s.shift_id));

    shifts.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.role.cmp(&b.role)));
    Ok(shifts)
}

async fn query_shifts(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<Vec<Shift>, String> {
    let pk = format!("MINISTRY#{}", ministry_id);

    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(pk))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("SHIFT#".to_string()))
        .send()
        .await
        .map_err(|e| format!("Failed to query shifts: {:?}", e))?;

    let mut shifts = Vec::new();
    for item in result.items() {
        shifts.push(Shift {
            shift_id: item
                .get("shift_id")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            ministry_id: ministry_id.to_string(),
            date: item
                .get("shift_date")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            role: item
                .get("role")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            created_at: item
                .get("created_at")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
        });
    }

    Ok(shifts)
}

async fn query_assigned_shift_ids(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<HashSet<String>, String> {
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

    let mut ids = HashSet::new();
    for item in result.items() {
        if let Some(shift_id) = item
            .get("SK")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| s.strip_prefix("ASSIGNMENT#"))
        {
            ids.insert(shift_id.to_string());
        }
    }

    Ok(ids)
}

fn bad_request(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}
