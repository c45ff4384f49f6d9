use crate::types::{AddMemberRequest, Membership, UpdateMemberRequest};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};

/// Add a person to a ministry
///
/// The (ministry, person) key enforces at most one membership per person per
/// ministry; a duplicate add returns 409 instead of silently overwriting.
pub async fn add_member(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: AddMemberRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Invalid add member body: {}", e);
            return bad_request(&format!("Invalid request body: {}", e));
        }
    };

    if req.person_id.trim().is_empty() {
        return bad_request("person_id must not be empty");
    }
    if !req.email.contains('@') {
        return bad_request("email is not a valid address");
    }

    let now = chrono::Utc::now().to_rfc3339();
    let pk = format!("MINISTRY#{}", ministry_id);
    let sk = format!("MEMBER#{}", req.person_id);

    let result = client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(pk))
        .item("SK", AttributeValue::S(sk))
        .item("name", AttributeValue::S(req.name.clone()))
        .item("email", AttributeValue::S(req.email.clone()))
        .item("role", AttributeValue::S(req.role.clone()))
        .item("active", AttributeValue::Bool(req.active))
        .item("joined_at", AttributeValue::S(now.clone()))
        .condition_expression("attribute_not_exists(SK)")
        .send()
        .await;

    match result {
        Ok(_) => {
            let membership = Membership {
                ministry_id: ministry_id.to_string(),
                person_id: req.person_id,
                name: req.name,
                email: req.email,
                role: req.role,
                active: req.active,
                joined_at: now,
            };

            Ok(Response::builder()
                .status(StatusCode::CREATED)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::to_string(&membership)?.into())
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
                        serde_json::json!({"error": "Person is already a member of this ministry"})
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

/// List a ministry's members, optionally only the active ones
pub async fn list_members(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    active_only: bool,
) -> Result<Response<Body>, Error> {
    let mut members = query_members(client, table_name, ministry_id)
        .await
        .map_err(Error::from)?;

    if active_only {
        members.retain(|m| m.active);
    }
    members.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&members)?.into())
        .map_err(Box::new)?)
}

/// Update a membership's details or active flag
pub async fn update_member(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    person_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UpdateMemberRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(&format!("Invalid request body: {}", e)),
    };

    let mut update_expr = vec![];
    let mut expr_names = std::collections::HashMap::new();
    let mut expr_values = std::collections::HashMap::new();

    if let Some(name) = req.name {
        update_expr.push("#name = :name");
        expr_names.insert("#name".to_string(), "name".to_string());
        expr_values.insert(":name".to_string(), AttributeValue::S(name));
    }

    if let Some(email) = req.email {
        update_expr.push("email = :email");
        expr_values.insert(":email".to_string(), AttributeValue::S(email));
    }

    if let Some(role) = req.role {
        update_expr.push("#role = :role");
        expr_names.insert("#role".to_string(), "role".to_string());
        expr_values.insert(":role".to_string(), AttributeValue::S(role));
    }

    if let Some(active) = req.active {
        update_expr.push("#active = :active");
        expr_names.insert("#active".to_string(), "active".to_string());
        expr_values.insert(":active".to_string(), AttributeValue::Bool(active));
    }

    if !update_expr.is_empty() {
        let mut builder = client
            .update_item()
            .table_name(table_name)
            .key("PK", AttributeValue::S(format!("MINISTRY#{}", ministry_id)))
            .key("SK", AttributeValue::S(format!("MEMBER#{}", person_id)))
            .update_expression(format!("SET {}", update_expr.join(", ")))
            .condition_expression("attribute_exists(SK)");

        for (k, v) in expr_names {
            builder = builder.expression_attribute_names(k, v);
        }

        for (k, v) in expr_values {
            builder = builder.expression_attribute_values(k, v);
        }

        if let Err(e) = builder.send().await {
            let service_err = e.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                return Ok(Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .header("Content-Type", "application/json")
                    .header("Access-Control-Allow-Origin", "*")
                    .body(
                        serde_json::json!({"error": "Membership not found"})
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
        .body(
            serde_json::json!({"updated": person_id})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// Remove a person from a ministry
pub async fn remove_member(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    person_id: &str,
) -> Result<Response<Body>, Error> {
    client
        .delete_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("MINISTRY#{}", ministry_id)))
        .key("SK", AttributeValue::S(format!("MEMBER#{}", person_id)))
        .send()
        .await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"removed": person_id})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// Fetch the active roster for one ministry, used by the rotation engine
pub async fn list_active_members(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<Vec<Membership>, String> {
    let mut members = query_members(client, table_name, ministry_id).await?;
    members.retain(|m| m.active);
    Ok(members)
}

async fn query_members(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<Vec<Membership>, String> {
    let pk = format!("MINISTRY#{}", ministry_id);

    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(pk))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("MEMBER#".to_string()))
        .send()
        .await
        .map_err(|e| format!("Failed to query members: {:?}", e))?;

    let mut members = Vec::new();
    for item in result.items() {
        let sk = item.get("SK").and_then(|v| v.as_s().ok());
        let person_id = match sk.and_then(|s| s.strip_prefix("MEMBER#")) {
            Some(id) => id.to_string(),
            None => continue,
        };
        members.push(Membership {
            ministry_id: ministry_id.to_string(),
            person_id,
            name: item
                .get("name")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            email: item
                .get("email")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            role: item
                .get("role")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            active: item
                .get("active")
                .and_then(|v| v.as_bool().ok())
                .copied()
                .unwrap_or(false),
            joined_at: item
                .get("joined_at")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
        });
    }

    Ok(members)
}

fn bad_request(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}
