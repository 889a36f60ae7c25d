//! Listing payloads: cards, detail pages, dictionaries and filter options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::task::Task;

/// Summary card shown in listing grids and the favorites list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectCard {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "priceUSD")]
    pub price_usd: f64,
    #[serde(default, alias = "priceBYN")]
    pub price_byn: f64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub master_object_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub deal_type: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPage {
    #[serde(default, alias = "data")]
    pub objects: Vec<ObjectCard>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default, alias = "perPage")]
    pub per_page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoritesPage {
    #[serde(default)]
    pub data: Vec<ObjectCard>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default, alias = "perPage")]
    pub per_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TasksPage {
    pub data: Vec<Task>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectGeneral {
    #[serde(default)]
    pub master_object_id: String,
    pub id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub ad_link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deal_type: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city_or_district: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, alias = "priceUSD")]
    pub price_usd: f64,
    #[serde(default, alias = "priceBYN")]
    pub price_byn: f64,
    #[serde(default)]
    pub price_eur: Option<f64>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub is_agency: bool,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub list_time: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApartmentDetails {
    pub rooms_amount: Option<u32>,
    pub floor_number: Option<i32>,
    pub building_floors: Option<u32>,
    pub total_area: Option<f64>,
    pub living_space_area: Option<f64>,
    pub kitchen_area: Option<f64>,
    pub year_built: Option<u32>,
    pub wall_material: Option<String>,
    pub repair_state: Option<String>,
    pub bathroom_type: Option<String>,
    pub balcony_type: Option<String>,
    pub price_per_square_meter: Option<f64>,
    pub is_new_condition: Option<bool>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseDetails {
    pub total_area: Option<f64>,
    pub plot_area: Option<f64>,
    pub wall_material: Option<String>,
    pub year_built: Option<u32>,
    pub living_space_area: Option<f64>,
    pub building_floors: Option<u32>,
    pub rooms_amount: Option<u32>,
    pub kitchen_area: Option<f64>,
    pub electricity: Option<String>,
    pub water: Option<String>,
    pub heating: Option<String>,
    pub sewage: Option<String>,
    pub gaz: Option<String>,
    pub roof_material: Option<String>,
    pub house_type: Option<String>,
    pub completion_percent: Option<String>,
    pub is_new_condition: Option<bool>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommercialDetails {
    pub property_type: Option<String>,
    pub floor_number: Option<i32>,
    pub building_floors: Option<u32>,
    pub total_area: Option<f64>,
    #[serde(default)]
    pub commercial_improvements: Vec<String>,
    pub commercial_repair: Option<String>,
    pub price_per_square_meter: Option<f64>,
    #[serde(default)]
    pub rooms_range: Vec<u32>,
    pub commercial_building_location: Option<String>,
    pub commercial_rent_type: Option<String>,
    pub is_new_condition: Option<bool>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Category-specific part of a detail page.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectDetails {
    Apartment(ApartmentDetails),
    House(HouseDetails),
    Commercial(CommercialDetails),
}

#[derive(Debug, Error)]
pub enum DetailsError {
    #[error("unknown object category {0:?}")]
    UnknownCategory(String),
    #[error("invalid {category} details: {source}")]
    Invalid {
        category: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ObjectDetails {
    /// Picks the variant from the category discriminator of the general block.
    pub fn from_value(category: &str, value: Value) -> Result<Self, DetailsError> {
        // Objects without details come back as `null`.
        let value = if value.is_null() {
            Value::Object(Map::new())
        } else {
            value
        };
        match category {
            "apartment" => serde_json::from_value(value)
                .map(ObjectDetails::Apartment)
                .map_err(|source| DetailsError::Invalid {
                    category: "apartment",
                    source,
                }),
            "house" => serde_json::from_value(value)
                .map(ObjectDetails::House)
                .map_err(|source| DetailsError::Invalid {
                    category: "house",
                    source,
                }),
            "commercial" => serde_json::from_value(value)
                .map(ObjectDetails::Commercial)
                .map_err(|source| DetailsError::Invalid {
                    category: "commercial",
                    source,
                }),
            other => Err(DetailsError::UnknownCategory(other.to_owned())),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ObjectDetails::Apartment(_) => "apartment",
            ObjectDetails::House(_) => "house",
            ObjectDetails::Commercial(_) => "commercial",
        }
    }

    pub fn total_area(&self) -> Option<f64> {
        match self {
            ObjectDetails::Apartment(details) => details.total_area,
            ObjectDetails::House(details) => details.total_area,
            ObjectDetails::Commercial(details) => details.total_area,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedOffer {
    pub id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub ad_link: String,
    #[serde(default)]
    pub is_source_duplicate: bool,
    #[serde(default)]
    pub deal_type: String,
}

/// A detail page: general block, typed details and the duplicates found on other sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectView {
    pub general: ObjectGeneral,
    pub details: ObjectDetails,
    pub related_offers: Vec<RelatedOffer>,
}

#[derive(Debug, Deserialize)]
struct RawObjectView {
    general: ObjectGeneral,
    #[serde(default)]
    details: Value,
    #[serde(default)]
    related_offers: Vec<RelatedOffer>,
}

#[derive(Debug, Error)]
pub enum ObjectViewError {
    #[error("object payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Details(#[from] DetailsError),
}

impl ObjectView {
    pub fn from_json(raw: &str) -> Result<Self, ObjectViewError> {
        let raw: RawObjectView = serde_json::from_str(raw)?;
        let details = ObjectDetails::from_value(&raw.general.category, raw.details)?;
        Ok(Self {
            general: raw.general,
            details,
            related_offers: raw.related_offers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryItem {
    #[serde(alias = "systemName")]
    pub system_name: String,
    #[serde(alias = "displayName")]
    pub display_name: String,
}

/// Enumerated values the backend accepts for the main filter fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionaries {
    #[serde(default)]
    pub categories: Vec<DictionaryItem>,
    #[serde(default)]
    pub regions: Vec<DictionaryItem>,
    #[serde(default)]
    pub deal_types: Vec<DictionaryItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub options: Vec<Value>,
}

/// Ranges and choices still available under the current filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub filters: BTreeMap<String, FilterOption>,
    #[serde(default)]
    pub count: u64,
}
