use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A role carried inside a verified bearer credential.
///
/// Authorization is a pure set-membership check between the roles of an
/// identity and the roles a route allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Buyer,
    Seller,
    Agent,
    Admin,
}

/// The authenticated identity derived from a verified bearer credential.
///
/// Only produced by successful authentication; never stored across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        self.roles.iter().any(|r| allowed.contains(r))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    Villa,
    Plot,
    Office,
}

impl PropertyType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "apartment" => Some(Self::Apartment),
            "villa" => Some(Self::Villa),
            "plot" => Some(Self::Plot),
            "office" => Some(Self::Office),
            _ => None,
        }
    }
}

/// A single property listing held by the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub city: String,
    pub locality: Option<String>,
    pub price: i64,
    pub bedrooms: i64,
    pub property_type: PropertyType,
    /// (latitude, longitude), when the listing is geotagged.
    pub location: Option<(f64, f64)>,
    pub amenities: Vec<String>,
    /// User id of the seller/agent that created the listing.
    pub listed_by: String,
    pub created_at: String,
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self { page, limit, total, total_pages }
    }
}

/// The uniform success envelope: `{ success: true, message, data, meta? }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: message.into(), data, meta: None }
    }

    pub fn paginated(message: impl Into<String>, data: T, meta: PageMeta) -> Self {
        Self { success: true, message: message.into(), data, meta: Some(meta) }
    }
}
