use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::pipeline::schema::{FieldKind, FieldSpec, FieldValue, Schema};
use crate::pipeline::RequestContext;
use crate::state::AppState;
use crate::store::PropertyFilter;
use crate::types::{Envelope, PageMeta, Property, PropertyType, Role};

const PROPERTY_TYPES: &[&str] = &["apartment", "villa", "plot", "office"];

/// Query schema for `GET /properties`.
pub fn list_schema(config: &AppConfig) -> Schema {
    Schema::new(vec![
        FieldSpec::new("city", FieldKind::str_max(80)),
        FieldSpec::new("locality", FieldKind::str_max(80)),
        FieldSpec::new("minPrice", FieldKind::int_min(0)),
        FieldSpec::new("maxPrice", FieldKind::int_min(0)),
        FieldSpec::new("bedrooms", FieldKind::int_range(1, 16)),
        FieldSpec::new("propertyType", FieldKind::Enum { allowed: PROPERTY_TYPES }),
        FieldSpec::new("page", FieldKind::int_floored(1, None))
            .default_value(FieldValue::Int(1)),
        FieldSpec::new("limit", FieldKind::int_floored(1, Some(config.pagination.max_limit)))
            .default_value(FieldValue::Int(config.pagination.default_limit)),
    ])
}

/// Body schema for `POST /properties`.
pub fn create_schema() -> Schema {
    Schema::new(vec![
        FieldSpec::new("title", FieldKind::str_max(140)).required(),
        FieldSpec::new("city", FieldKind::str_max(80)).required(),
        FieldSpec::new("locality", FieldKind::str_max(80)),
        FieldSpec::new("price", FieldKind::int_min(1)).required(),
        FieldSpec::new("bedrooms", FieldKind::int_range(1, 16))
            .default_value(FieldValue::Int(1)),
        FieldSpec::new("propertyType", FieldKind::Enum { allowed: PROPERTY_TYPES }).required(),
        FieldSpec::new("location", FieldKind::Coord),
        FieldSpec::new(
            "amenities",
            FieldKind::Array { element: Box::new(FieldKind::str_max(40)), max_items: Some(20) },
        ),
    ])
}

pub async fn list_properties(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<impl IntoResponse> {
    let p = &ctx.payload;
    let filter = PropertyFilter {
        city: p.get_str("city").map(|s| s.to_string()),
        locality: p.get_str("locality").map(|s| s.to_string()),
        min_price: p.get_i64("minPrice"),
        max_price: p.get_i64("maxPrice"),
        bedrooms: p.get_i64("bedrooms"),
        property_type: p.get_str("propertyType").and_then(PropertyType::parse),
    };
    let page = p.get_i64("page").unwrap_or(1);
    let limit = p.get_i64("limit").unwrap_or(state.config.pagination.default_limit);

    let (items, total) = state.store.list(&filter, page, limit).await;
    let meta = PageMeta::new(page, limit, total);
    Ok(Json(Envelope::paginated("Properties fetched", items, meta)))
}

pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_listing_id(&id)?;
    let property = state
        .store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Property {} not found", id)))?;
    Ok(Json(Envelope::ok("Property fetched", property)))
}

pub async fn create_property(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<impl IntoResponse> {
    let identity = ctx
        .identity
        .as_ref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("identity missing after auth stage")))?;
    let p = &ctx.payload;

    // Required fields are guaranteed present by the schema stage.
    let property_type = p
        .get_str("propertyType")
        .and_then(PropertyType::parse)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("propertyType missing after validation")))?;

    let property = Property {
        id: Uuid::new_v4(),
        title: p.get_str("title").unwrap_or_default().to_string(),
        city: p.get_str("city").unwrap_or_default().to_string(),
        locality: p.get_str("locality").map(|s| s.to_string()),
        price: p.get_i64("price").unwrap_or(0),
        bedrooms: p.get_i64("bedrooms").unwrap_or(1),
        property_type,
        location: p.get_coord("location"),
        amenities: p.get_str_list("amenities").unwrap_or_default(),
        listed_by: identity.user_id.clone(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    state.store.insert(property.clone()).await;
    tracing::info!("property {} created by {}", property.id, identity.user_id);
    Ok((StatusCode::CREATED, Json(Envelope::ok("Property created", property))))
}

pub async fn delete_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<impl IntoResponse> {
    let identity = ctx
        .identity
        .as_ref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("identity missing after auth stage")))?;
    let id = parse_listing_id(&id)?;

    let property = state
        .store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Property {} not found", id)))?;

    // Admins may delete any listing; sellers and agents only their own.
    if !identity.roles.contains(&Role::Admin) && property.listed_by != identity.user_id {
        return Err(AppError::Forbidden("You may only delete your own listings".to_string()));
    }

    state.store.remove(id).await;
    tracing::info!("property {} deleted by {}", id, identity.user_id);
    Ok(Json(Envelope::ok("Property deleted", serde_json::json!({ "id": id }))))
}

fn parse_listing_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::validation("id", "must be a valid UUID"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_schema_defaults_pagination() {
        let schema = list_schema(&AppConfig::default());
        let raw = json!({}).as_object().cloned().unwrap();
        let payload = schema.validate(&raw).unwrap();
        assert_eq!(payload.get_i64("page"), Some(1));
        assert_eq!(payload.get_i64("limit"), Some(20));
    }

    #[test]
    fn create_schema_requires_core_fields() {
        let raw = json!({"city": "Mumbai"}).as_object().cloned().unwrap();
        let issues = create_schema().validate(&raw).unwrap_err();
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"price"));
        assert!(fields.contains(&"propertyType"));
        assert!(!fields.contains(&"city"));
    }

    #[test]
    fn listing_id_parsing() {
        assert!(parse_listing_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        let err = parse_listing_id("not-a-uuid").unwrap_err();
        assert_eq!(err.kind(), "ValidationFailed");
    }
}
