use crate::types::{CreateMinistryRequest, Ministry, UpdateMinistryRequest};
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};

/// Create a new ministry
///
/// Writes two items: the ministry metadata record and a catalog entry under
/// the MINISTRIES partition so listing does not need a table scan.
pub async fn create_ministry(
    client: &DynamoClient,
    table_name: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CreateMinistryRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Invalid create ministry body: {}", e);
            return bad_request(&format!("Invalid request body: {}", e));
        }
    };

    if req.name.trim().is_empty() {
        return bad_request("Ministry name must not be empty");
    }

    let ministry_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let pk = format!("MINISTRY#{}", ministry_id);

    let mut put_request = client
        .put_item()
        .table_name(table_name)
        .item("PK", aws_sdk_dynamodb::types::AttributeValue::S(pk.clone()))
        .item("SK", aws_sdk_dynamodb::types::AttributeValue::S("METADATA".to_string()))
        .item("name", aws_sdk_dynamodb::types::AttributeValue::S(req.name.clone()))
        .item("created_at", aws_sdk_dynamodb::types::AttributeValue::S(now.clone()));

    if let Some(leader) = &req.leader_id {
        put_request = put_request.item(
            "leader_id",
            aws_sdk_dynamodb::types::AttributeValue::S(leader.clone()),
        );
    }

    put_request.send().await?;

    // Catalog entry for listing
    let mut catalog_request = client
        .put_item()
        .table_name(table_name)
        .item("PK", aws_sdk_dynamodb::types::AttributeValue::S("MINISTRIES".to_string()))
        .item("SK", aws_sdk_dynamodb::types::AttributeValue::S(pk))
        .item("name", aws_sdk_dynamodb::types::AttributeValue::S(req.name.clone()))
        .item("created_at", aws_sdk_dynamodb::types::AttributeValue::S(now.clone()));

    if let Some(leader) = &req.leader_id {
        catalog_request = catalog_request.item(
            "leader_id",
            aws_sdk_dynamodb::types::AttributeValue::S(leader.clone()),
        );
    }

    catalog_request.send().await?;

    let ministry = Ministry {
        ministry_id,
        name: req.name,
        leader_id: req.leader_id,
        created_at: now,
    };

    let resp = Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&ministry)?.into())
        .map_err(Box::new)?;
    Ok(resp)
}

/// List all ministries from the catalog partition
pub async fn list_ministries(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk")
        .expression_attribute_values(
            ":pk",
            aws_sdk_dynamodb::types::AttributeValue::S("MINISTRIES".to_string()),
        )
        .send()
        .await?;

    let mut ministries = Vec::new();
    for item in result.items() {
        let sk = item.get("SK").and_then(|v| v.as_s().ok());
        let ministry_id = match sk.and_then(|s| s.strip_prefix("MINISTRY#")) {
            Some(id) => id.to_string(),
            None => continue,
        };
        ministries.push(Ministry {
            ministry_id,
            name: item
                .get("name")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            leader_id: item
                .get("leader_id")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string()),
            created_at: item
                .get("created_at")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
        });
    }

    ministries.sort_by(|a, b| a.name.cmp(&b.name));

    let resp = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&ministries)?.into())
        .map_err(Box::new)?;
    Ok(resp)
}

/// Get one ministry
pub async fn get_ministry(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<Response<Body>, Error> {
    let pk = format!("MINISTRY#{}", ministry_id);

    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", aws_sdk_dynamodb::types::AttributeValue::S(pk))
        .key("SK", aws_sdk_dynamodb::types::AttributeValue::S("METADATA".to_string()))
        .send()
        .await?;

    if let Some(item) = result.item() {
        let ministry = Ministry {
            ministry_id: ministry_id.to_string(),
            name: item
                .get("name")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            leader_id: item
                .get("leader_id")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string()),
            created_at: item
                .get("created_at")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default(),
        };

        let resp = Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::to_string(&ministry)?.into())
            .map_err(Box::new)?;
        Ok(resp)
    } else {
        let resp = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "Ministry not found"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?;
        Ok(resp)
    }
}

/// Update ministry name and/or leader
pub async fn update_ministry(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UpdateMinistryRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(&format!("Invalid request body: {}", e)),
    };

    let mut update_expr = vec![];
    let mut expr_names = std::collections::HashMap::new();
    let mut expr_values = std::collections::HashMap::new();

    if let Some(name) = req.name {
        update_expr.push("#name = :name");
        expr_names.insert("#name".to_string(), "name".to_string());
        expr_values.insert(
            ":name".to_string(),
            aws_sdk_dynamodb::types::AttributeValue::S(name),
        );
    }

    if let Some(leader_id) = req.leader_id {
        update_expr.push("leader_id = :leader");
        expr_values.insert(
            ":leader".to_string(),
            aws_sdk_dynamodb::types::AttributeValue::S(leader_id),
        );
    }

    if !update_expr.is_empty() {
        let pk = format!("MINISTRY#{}", ministry_id);
        let expression = format!("SET {}", update_expr.join(", "));

        // Guard on the metadata record so a PATCH for an unknown id cannot
        // upsert a phantom ministry; the catalog entry is only touched after
        let mut builder = client
            .update_item()
            .table_name(table_name)
            .key("PK", aws_sdk_dynamodb::types::AttributeValue::S(pk.clone()))
            .key(
                "SK",
                aws_sdk_dynamodb::types::AttributeValue::S("METADATA".to_string()),
            )
            .update_expression(expression.clone())
            .condition_expression("attribute_exists(SK)");

        for (k, v) in expr_names.clone() {
            builder = builder.expression_attribute_names(k, v);
        }

        for (k, v) in expr_values.clone() {
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
                        serde_json::json!({"error": "Ministry not found"})
                            .to_string()
                            .into(),
                    )
                    .map_err(Box::new)?);
            }
            return Err(Box::new(service_err));
        }

        // Catalog entry carries the same fields
        let mut catalog = client
            .update_item()
            .table_name(table_name)
            .key(
                "PK",
                aws_sdk_dynamodb::types::AttributeValue::S("MINISTRIES".to_string()),
            )
            .key("SK", aws_sdk_dynamodb::types::AttributeValue::S(pk))
            .update_expression(expression);

        for (k, v) in expr_names {
            catalog = catalog.expression_attribute_names(k, v);
        }

        for (k, v) in expr_values {
            catalog = catalog.expression_attribute_values(k, v);
        }

        catalog.send().await?;
    }

    get_ministry(client, table_name, ministry_id).await
}

/// Delete a ministry and everything it owns (memberships, shifts, assignments)
pub async fn delete_ministry(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<Response<Body>, Error> {
    let pk = format!("MINISTRY#{}", ministry_id);

    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk")
        .expression_attribute_values(
            ":pk",
            aws_sdk_dynamodb::types::AttributeValue::S(pk.clone()),
        )
        .send()
        .await?;

    let mut delete_keys = Vec::new();
    for item in result.items() {
        if let Some(sk) = item.get("SK").and_then(|v| v.as_s().ok()) {
            let mut key = std::collections::HashMap::new();
            key.insert(
                "PK".to_string(),
                aws_sdk_dynamodb::types::AttributeValue::S(pk.clone()),
            );
            key.insert(
                "SK".to_string(),
                aws_sdk_dynamodb::types::AttributeValue::S(sk.to_string()),
            );
            delete_keys.push(key);
        }
    }

    // Catalog entry lives outside the ministry partition
    let mut catalog_key = std::collections::HashMap::new();
    catalog_key.insert(
        "PK".to_string(),
        aws_sdk_dynamodb::types::AttributeValue::S("MINISTRIES".to_string()),
    );
    catalog_key.insert(
        "SK".to_string(),
        aws_sdk_dynamodb::types::AttributeValue::S(pk.clone()),
    );
    delete_keys.push(catalog_key);

    tracing::info!(
        "Deleting ministry {} with {} owned items",
        ministry_id,
        delete_keys.len()
    );

    // BatchWriteItem takes at most 25 requests per call
    for chunk in delete_keys.chunks(25) {
        let mut requests = Vec::new();
        for key in chunk {
            let delete = aws_sdk_dynamodb::types::DeleteRequest::builder()
                .set_key(Some(key.clone()))
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
    }

    let resp = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"deleted": ministry_id})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?;
    Ok(resp)
}

/// All ministry ids from the catalog partition, for rotation passes that are
/// not scoped to specific ministries
pub async fn list_ministry_ids(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Vec<String>, String> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk")
        .expression_attribute_values(
            ":pk",
            aws_sdk_dynamodb::types::AttributeValue::S("MINISTRIES".to_string()),
        )
        .send()
        .await
        .map_err(|e| format!("Failed to list ministries: {:?}", e))?;

    let mut ids = Vec::new();
    for item in result.items() {
        if let Some(id) = item
            .get("SK")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| s.strip_prefix("MINISTRY#"))
        {
            ids.push(id.to_string());
        }
    }

    Ok(ids)
}

/// Look up a ministry's display name, used when composing notification emails
pub async fn get_ministry_name(
    client: &DynamoClient,
    table_name: &str,
    ministry_id: &str,
) -> Result<Option<String>, String> {
    let pk = format!("MINISTRY#{}", ministry_id);

    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", aws_sdk_dynamodb::types::AttributeValue::S(pk))
        .key("SK", aws_sdk_dynamodb::types::AttributeValue::S("METADATA".to_string()))
        .send()
        .await
        .map_err(|e| format!("Failed to fetch ministry: {:?}", e))?;

    Ok(result
        .item()
        .and_then(|item| item.get("name"))
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string()))
}

fn bad_request(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}
