use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{errors::AppError, utils};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub pwd_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CustomerWithLeads {
    #[serde(flatten)]
    pub customer: Customer,
    pub leads: Vec<Lead>,
}

/// Lifecycle of a sales opportunity. Stored as the variant name.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Converted => "Converted",
            LeadStatus::Lost => "Lost",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid lead status: {s}")))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: LeadStatus,
    pub value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Request bodies

#[derive(Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct Register {
    #[validate(custom(function = "utils::not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters long"
    ))]
    pub password: String,
}

#[derive(Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct Login {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewCustomer {
    #[validate(custom(function = "utils::not_blank", message = "Name and email are required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Deserialize, Serialize, Debug, Clone, Default, Validate)]
#[serde(deny_unknown_fields)]
pub struct CustomerChanges {
    #[validate(custom(function = "utils::not_blank", message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewLead {
    #[validate(custom(function = "utils::not_blank", message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<LeadStatus>,
    #[validate(range(min = 0.0, message = "Value must not be negative"))]
    pub value: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, Validate)]
#[serde(deny_unknown_fields)]
pub struct LeadChanges {
    #[validate(custom(function = "utils::not_blank", message = "Title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<LeadStatus>,
    #[validate(range(min = 0.0, message = "Value must not be negative"))]
    pub value: Option<f64>,
}

// Query strings. Values stay raw so bad numbers fall back to defaults.

#[derive(Deserialize, Debug, Default)]
pub struct CustomerListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LeadListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let positive = |raw: Option<&str>| {
            raw.and_then(|value| value.trim().parse::<i64>().ok())
                .filter(|value| *value > 0)
        };
        PageRequest {
            page: positive(page).unwrap_or(DEFAULT_PAGE),
            limit: positive(limit)
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Page {
            items,
            total,
            page: request.page,
            pages: (total + request.limit - 1) / request.limit,
        }
    }
}

// Responses

#[derive(Serialize, Debug)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize, Debug)]
pub struct VerifyResponse {
    pub user: User,
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub count: i64,
    pub total_value: f64,
}

/// One entry per [`LeadStatus`]; every key is present even when zero.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct LeadsByStatus {
    #[serde(rename = "New")]
    pub new: StatusSummary,
    #[serde(rename = "Contacted")]
    pub contacted: StatusSummary,
    #[serde(rename = "Converted")]
    pub converted: StatusSummary,
    #[serde(rename = "Lost")]
    pub lost: StatusSummary,
}

impl LeadsByStatus {
    pub fn entry_mut(&mut self, status: LeadStatus) -> &mut StatusSummary {
        match status {
            LeadStatus::New => &mut self.new,
            LeadStatus::Contacted => &mut self.contacted,
            LeadStatus::Converted => &mut self.converted,
            LeadStatus::Lost => &mut self.lost,
        }
    }
}
