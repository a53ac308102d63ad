//! In-memory property listing store.
//!
//! The pipeline is the subject of this service; the store is a deliberately
//! small collaborator. Listings live in a process-wide locked vector and are
//! never persisted.

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::{Property, PropertyType};

/// Filter criteria for listing searches, already validated by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub city: Option<String>,
    pub locality: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub bedrooms: Option<i64>,
    pub property_type: Option<PropertyType>,
}

impl PropertyFilter {
    fn matches(&self, p: &Property) -> bool {
        if let Some(city) = &self.city {
            if !p.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        if let Some(locality) = &self.locality {
            match &p.locality {
                Some(l) if l.eq_ignore_ascii_case(locality) => {}
                _ => return false,
            }
        }
        if let Some(min) = self.min_price {
            if p.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if p.price > max {
                return false;
            }
        }
        if let Some(bedrooms) = self.bedrooms {
            if p.bedrooms != bedrooms {
                return false;
            }
        }
        if let Some(pt) = self.property_type {
            if p.property_type != pt {
                return false;
            }
        }
        true
    }
}

pub struct PropertyStore {
    listings: RwLock<Vec<Property>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self { listings: RwLock::new(Vec::new()) }
    }

    pub fn with_listings(listings: Vec<Property>) -> Self {
        Self { listings: RwLock::new(listings) }
    }

    /// Returns the requested page of matching listings plus the total match
    /// count (for `totalPages`).
    pub async fn list(&self, filter: &PropertyFilter, page: i64, limit: i64) -> (Vec<Property>, i64) {
        let listings = self.listings.read().await;
        let matched: Vec<&Property> = listings.iter().filter(|p| filter.matches(p)).collect();
        let total = matched.len() as i64;
        let offset = ((page - 1).max(0) as usize).saturating_mul(limit.max(0) as usize);
        let items = matched
            .into_iter()
            .skip(offset)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        (items, total)
    }

    pub async fn get(&self, id: Uuid) -> Option<Property> {
        let listings = self.listings.read().await;
        listings.iter().find(|p| p.id == id).cloned()
    }

    pub async fn insert(&self, property: Property) {
        let mut listings = self.listings.write().await;
        listings.push(property);
    }

    pub async fn remove(&self, id: Uuid) -> Option<Property> {
        let mut listings = self.listings.write().await;
        let pos = listings.iter().position(|p| p.id == id)?;
        Some(listings.remove(pos))
    }

    pub async fn count(&self) -> usize {
        self.listings.read().await.len()
    }
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Seed listings so a fresh instance has something to serve.
pub fn demo_listings() -> Vec<Property> {
    vec![
        Property {
            id: Uuid::new_v4(),
            title: "2BHK apartment near Powai lake".to_string(),
            city: "Mumbai".to_string(),
            locality: Some("Powai".to_string()),
            price: 18_500_000,
            bedrooms: 2,
            property_type: PropertyType::Apartment,
            location: Some((19.1197, 72.9051)),
            amenities: vec!["lift".to_string(), "gym".to_string()],
            listed_by: "seed-agent-1".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        },
        Property {
            id: Uuid::new_v4(),
            title: "Compact studio in Andheri East".to_string(),
            city: "Mumbai".to_string(),
            locality: Some("Andheri East".to_string()),
            price: 650_000,
            bedrooms: 1,
            property_type: PropertyType::Apartment,
            location: Some((19.1136, 72.8697)),
            amenities: vec!["parking".to_string()],
            listed_by: "seed-agent-1".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        },
        Property {
            id: Uuid::new_v4(),
            title: "Villa with garden in Koregaon Park".to_string(),
            city: "Pune".to_string(),
            locality: Some("Koregaon Park".to_string()),
            price: 42_000_000,
            bedrooms: 4,
            property_type: PropertyType::Villa,
            location: Some((18.5362, 73.8940)),
            amenities: vec!["garden".to_string(), "parking".to_string()],
            listed_by: "seed-agent-2".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        },
    ]
}
