use serde::{Deserialize, Serialize};

// ========== MINISTRY ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ministry {
    pub ministry_id: String,
    pub name: String,
    pub leader_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMinistryRequest {
    pub name: String,
    pub leader_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMinistryRequest {
    pub name: Option<String>,
    pub leader_id: Option<String>,
}

// ========== MEMBERSHIP ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Membership {
    pub ministry_id: String,
    pub person_id: String,
    pub name: String,
    pub email: String,
    pub role: String, // usher | musician | teacher | ...
    pub active: bool,
    pub joined_at: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub person_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

// ========== SHIFT ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Shift {
    pub shift_id: String,
    pub ministry_id: String,
    pub date: String, // YYYY-MM-DD
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateShiftRequest {
    pub date: String,
    pub role: String,
}

// ========== ASSIGNMENT ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Assignment {
    pub shift_id: String,
    pub ministry_id: String,
    pub person_id: String,
    pub person_name: String,
    pub person_email: String,
    pub role: String,
    pub date: String,
    pub assigned_at: String,
    pub assigned_by: String, // user id, or "rotation" for engine-created rows
    pub notified: bool,
    pub reminded: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    pub shift_id: String,
    pub person_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssignmentRequest {
    pub reminded: Option<bool>,
}
