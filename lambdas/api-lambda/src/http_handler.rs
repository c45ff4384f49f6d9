use church_shared::{assignments, members, ministries, rotation, shifts, AppState};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::env;
use std::sync::Arc;

/// Main Lambda handler - routes requests to the ministry endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header(
                "Access-Control-Allow-Methods",
                "GET,POST,PUT,PATCH,DELETE,OPTIONS",
            )
            .header(
                "Access-Control-Allow-Headers",
                "Content-Type,Authorization,X-User-Id",
            )
            .body(Body::Empty)
            .map_err(Box::new)?);
    }

    let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "church-ops".to_string());

    // Get user ID from JWT claims (the API gateway validates the token).
    // In local development, allow override with X-User-Id header.
    let user_id = event
        .headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| {
            event
                .request_context()
                .authorizer()
                .and_then(|auth| auth.jwt.as_ref())
                .and_then(|jwt| jwt.claims.get("sub"))
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| {
            tracing::warn!("Could not extract user ID from JWT or header, using fallback");
            "anonymous".to_string()
        });

    if path.starts_with("/ministries") {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        return match (method, parts.as_slice()) {
            // --- MINISTRIES ---
            // POST /ministries - create ministry
            (&Method::POST, ["ministries"]) => {
                ministries::create_ministry(&state.dynamo_client, &table_name, body).await
            }
            // GET /ministries - list ministries
            (&Method::GET, ["ministries"]) => {
                ministries::list_ministries(&state.dynamo_client, &table_name).await
            }
            // GET /ministries/{id} - get ministry
            (&Method::GET, ["ministries", ministry_id]) => {
                ministries::get_ministry(&state.dynamo_client, &table_name, ministry_id).await
            }
            // PATCH /ministries/{id} - update ministry
            (&Method::PATCH, ["ministries", ministry_id]) => {
                ministries::update_ministry(&state.dynamo_client, &table_name, ministry_id, body)
                    .await
            }
            // DELETE /ministries/{id} - delete ministry and everything it owns
            (&Method::DELETE, ["ministries", ministry_id]) => {
                ministries::delete_ministry(&state.dynamo_client, &table_name, ministry_id).await
            }

            // --- MEMBERS ---
            // POST /ministries/{id}/members - add member
            (&Method::POST, ["ministries", ministry_id, "members"]) => {
                members::add_member(&state.dynamo_client, &table_name, ministry_id, body).await
            }
            // GET /ministries/{id}/members - list members (?active=true)
            (&Method::GET, ["ministries", ministry_id, "members"]) => {
                let active_only = event
                    .query_string_parameters_ref()
                    .and_then(|params| params.first("active"))
                    .map(|v| v == "true")
                    .unwrap_or(false);
                members::list_members(&state.dynamo_client, &table_name, ministry_id, active_only)
                    .await
            }
            // PATCH /ministries/{id}/members/{pid} - update membership
            (&Method::PATCH, ["ministries", ministry_id, "members", person_id]) => {
                members::update_member(
                    &state.dynamo_client,
                    &table_name,
                    ministry_id,
                    person_id,
                    body,
                )
                .await
            }
            // DELETE /ministries/{id}/members/{pid} - remove member
            (&Method::DELETE, ["ministries", ministry_id, "members", person_id]) => {
                members::remove_member(&state.dynamo_client, &table_name, ministry_id, person_id)
                    .await
            }

            // --- SHIFTS ---
            // POST /ministries/{id}/shifts - create shift
            (&Method::POST, ["ministries", ministry_id, "shifts"]) => {
                shifts::create_shift(&state.dynamo_client, &table_name, ministry_id, body).await
            }
            // GET /ministries/{id}/shifts - list shifts (?days=N&unassigned=true)
            (&Method::GET, ["ministries", ministry_id, "shifts"]) => {
                let days = match event
                    .query_string_parameters_ref()
                    .and_then(|params| params.first("days"))
                {
                    Some(raw) => match raw.parse::<i64>() {
                        Ok(v) => Some(v),
                        Err(_) => {
                            return Ok(Response::builder()
                                .status(StatusCode::BAD_REQUEST)
                                .header("Content-Type", "application/json")
                                .header("Access-Control-Allow-Origin", "*")
                                .body(
                                    serde_json::json!({"error": "days must be an integer"})
                                        .to_string()
                                        .into(),
                                )
                                .map_err(Box::new)?)
                        }
                    },
                    None => None,
                };
                let unassigned_only = event
                    .query_string_parameters_ref()
                    .and_then(|params| params.first("unassigned"))
                    .map(|v| v == "true")
                    .unwrap_or(false);
                shifts::list_shifts(
                    &state.dynamo_client,
                    &table_name,
                    ministry_id,
                    days,
                    unassigned_only,
                )
                .await
            }
            // DELETE /ministries/{id}/shifts/{sid} - delete shift
            (&Method::DELETE, ["ministries", ministry_id, "shifts", shift_id]) => {
                shifts::delete_shift(&state.dynamo_client, &table_name, ministry_id, shift_id).await
            }

            // --- ASSIGNMENTS ---
            // GET /ministries/{id}/assignments - list assignments
            (&Method::GET, ["ministries", ministry_id, "assignments"]) => {
                assignments::list_assignments(&state.dynamo_client, &table_name, ministry_id).await
            }
            // POST /ministries/{id}/assignments - manual assignment
            (&Method::POST, ["ministries", ministry_id, "assignments"]) => {
                assignments::create_assignment(
                    &state.dynamo_client,
                    &table_name,
                    ministry_id,
                    &user_id,
                    body,
                )
                .await
            }
            // PATCH /ministries/{id}/assignments/{sid} - set reminded flag
            (&Method::PATCH, ["ministries", ministry_id, "assignments", shift_id]) => {
                assignments::update_assignment(
                    &state.dynamo_client,
                    &table_name,
                    ministry_id,
                    shift_id,
                    body,
                )
                .await
            }

            // --- ROTATION ---
            // POST /ministries/{id}/rotate - run a rotation pass for one ministry
            (&Method::POST, ["ministries", ministry_id, "rotate"]) => {
                rotation::rotate_ministry(
                    &state.dynamo_client,
                    &state.ses_client,
                    &table_name,
                    ministry_id,
                    body,
                )
                .await
            }
            _ => not_found(),
        };
    }

    // No matching route
    tracing::warn!("No route matched - Method: {} Path: {}", method, path);
    not_found()
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}
