//! Listing filter record and its URL query-string form.
//!
//! The record is flat: every field is either a scalar string (numeric ranges included,
//! as typed in a form) or a multi-select list. The key set is fixed so the query codec
//! knows which keys to split and join on commas.

use std::collections::HashSet;

use url::form_urlencoded;

/// Query key carrying pagination; never part of the filter record.
pub const PAGE_KEY: &str = "page";
pub const PER_PAGE_KEY: &str = "perPage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    List,
}

/// Every filter key in serialization order.
pub const FIELDS: &[(&str, FieldKind)] = &[
    ("category", FieldKind::Scalar),
    ("dealType", FieldKind::Scalar),
    ("region", FieldKind::Scalar),
    ("cityOrDistrict", FieldKind::Scalar),
    ("street", FieldKind::Scalar),
    ("priceCurrency", FieldKind::Scalar),
    ("priceMin", FieldKind::Scalar),
    ("priceMax", FieldKind::Scalar),
    ("rooms", FieldKind::List),
    ("roomsMin", FieldKind::Scalar),
    ("roomsMax", FieldKind::Scalar),
    ("totalAreaMin", FieldKind::Scalar),
    ("totalAreaMax", FieldKind::Scalar),
    ("livingSpaceAreaMin", FieldKind::Scalar),
    ("livingSpaceAreaMax", FieldKind::Scalar),
    ("kitchenAreaMin", FieldKind::Scalar),
    ("kitchenAreaMax", FieldKind::Scalar),
    ("yearBuiltMin", FieldKind::Scalar),
    ("yearBuiltMax", FieldKind::Scalar),
    ("wallMaterials", FieldKind::List),
    ("floorMin", FieldKind::Scalar),
    ("floorMax", FieldKind::Scalar),
    ("floorBuildingMin", FieldKind::Scalar),
    ("floorBuildingMax", FieldKind::Scalar),
    ("repairState", FieldKind::List),
    ("bathroomType", FieldKind::List),
    ("balconyType", FieldKind::List),
    ("houseTypes", FieldKind::List),
    ("plotAreaMin", FieldKind::Scalar),
    ("plotAreaMax", FieldKind::Scalar),
    ("totalFloors", FieldKind::List),
    ("roofMaterials", FieldKind::List),
    ("waterConditions", FieldKind::List),
    ("heatingConditions", FieldKind::List),
    ("electricityConditions", FieldKind::List),
    ("sewageConditions", FieldKind::List),
    ("gazConditions", FieldKind::List),
    ("commercialTypes", FieldKind::List),
    ("commercialBuildingLocations", FieldKind::List),
    ("commercialImprovements", FieldKind::List),
    ("commercialRepairs", FieldKind::List),
];

const DEFAULTS: &[(&str, &str)] = &[
    ("category", "apartment"),
    ("dealType", "sale"),
    ("priceCurrency", "USD"),
];

pub fn field_kind(key: &str) -> Option<FieldKind> {
    FIELDS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

pub fn is_array_key(key: &str) -> bool {
    field_kind(key) == Some(FieldKind::List)
}

/// Keys serialized as comma-joined lists.
pub fn array_keys() -> impl Iterator<Item = &'static str> {
    FIELDS
        .iter()
        .filter(|(_, kind)| *kind == FieldKind::List)
        .map(|(name, _)| *name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FilterValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Scalar(value) => value.is_empty(),
            FilterValue::List(values) => values.is_empty(),
        }
    }

    fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Scalar => FilterValue::Scalar(String::new()),
            FieldKind::List => FilterValue::List(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    values: Vec<FilterValue>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::initial()
    }
}

impl FilterState {
    /// Form defaults: apartments for sale priced in USD, nothing else set.
    pub fn initial() -> Self {
        let mut values: Vec<FilterValue> = FIELDS
            .iter()
            .map(|(_, kind)| FilterValue::empty(*kind))
            .collect();
        for (key, value) in DEFAULTS {
            if let Some(index) = index_of(key) {
                values[index] = FilterValue::Scalar((*value).to_owned());
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        index_of(key).map(|index| &self.values[index])
    }

    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            FilterValue::Scalar(value) => Some(value),
            FilterValue::List(_) => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.get(key)? {
            FilterValue::List(values) => Some(values),
            FilterValue::Scalar(_) => None,
        }
    }

    /// Sets a scalar field. Unknown keys and list keys are rejected with `false`.
    pub fn set_scalar(&mut self, key: &str, value: impl Into<String>) -> bool {
        match index_of(key) {
            Some(index) if FIELDS[index].1 == FieldKind::Scalar => {
                self.values[index] = FilterValue::Scalar(value.into());
                true
            }
            _ => false,
        }
    }

    /// Sets a list field. Unknown keys and scalar keys are rejected with `false`.
    pub fn set_list<I, S>(&mut self, key: &str, values: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match index_of(key) {
            Some(index) if FIELDS[index].1 == FieldKind::List => {
                self.values[index] = FilterValue::List(values.into_iter().map(Into::into).collect());
                true
            }
            _ => false,
        }
    }

    /// Sets a field from its query-string text: list fields split on commas.
    pub fn set_raw(&mut self, key: &str, raw: &str) -> bool {
        match field_kind(key) {
            Some(FieldKind::Scalar) => self.set_scalar(key, raw),
            Some(FieldKind::List) => self.set_list(key, split_list(raw)),
            None => false,
        }
    }

    /// Resets a field to its form default.
    pub fn clear(&mut self, key: &str) -> bool {
        let Some(index) = index_of(key) else {
            return false;
        };
        let initial = Self::initial();
        self.values[index] = initial.values[index].clone();
        true
    }

    pub fn to_query(&self) -> String {
        let mut query = String::new();
        for ((key, _), value) in FIELDS.iter().zip(&self.values) {
            if value.is_empty() {
                continue;
            }
            let encoded = match value {
                FilterValue::Scalar(value) => encode(value),
                FilterValue::List(values) => values
                    .iter()
                    .map(|item| encode(item))
                    .collect::<Vec<_>>()
                    .join(","),
            };
            push_pair(&mut query, key, &encoded);
        }
        query
    }

    /// Rebuilds filters from a query string, starting from the form defaults.
    ///
    /// Unknown keys and the page key are skipped. A list key repeated in the query
    /// accumulates its values.
    pub fn from_query(query: &str) -> Self {
        let mut state = Self::initial();
        let mut assigned: HashSet<usize> = HashSet::new();
        let query = query.trim_start_matches('?');

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if key == PAGE_KEY {
                continue;
            }
            let Some(index) = index_of(&key) else {
                continue;
            };
            match FIELDS[index].1 {
                FieldKind::Scalar => {
                    state.values[index] = FilterValue::Scalar(value.into_owned());
                }
                FieldKind::List => {
                    let mut items = split_list(&value);
                    if assigned.contains(&index) {
                        if let FilterValue::List(existing) = &mut state.values[index] {
                            existing.append(&mut items);
                        }
                    } else {
                        state.values[index] = FilterValue::List(items);
                    }
                }
            }
            assigned.insert(index);
        }
        state
    }
}

/// Filters plus the page they are shown at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSession {
    filters: FilterState,
    page: u32,
}

impl Default for FilterSession {
    fn default() -> Self {
        Self {
            filters: FilterState::initial(),
            page: 1,
        }
    }
}

impl FilterSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Changes one field from its text form. Any filter change sends the view back to page 1;
    /// the page key itself only moves the page.
    pub fn set_field(&mut self, key: &str, raw: &str) -> bool {
        if key == PAGE_KEY {
            return match raw.trim().parse::<u32>() {
                Ok(page) => {
                    self.set_page(page);
                    true
                }
                Err(_) => false,
            };
        }
        let changed = self.filters.set_raw(key, raw);
        if changed {
            self.page = 1;
        }
        changed
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Restores filters and page from a URL query string.
    pub fn from_url(query: &str) -> Self {
        let trimmed = query.trim_start_matches('?');
        let page = form_urlencoded::parse(trimmed.as_bytes())
            .find(|(key, _)| key == PAGE_KEY)
            .and_then(|(_, value)| value.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1);
        Self {
            filters: FilterState::from_query(trimmed),
            page,
        }
    }

    /// Query string for the address bar: filters plus the current page.
    pub fn url_query(&self) -> String {
        let mut query = self.filters.to_query();
        push_pair(&mut query, PAGE_KEY, &self.page.to_string());
        query
    }

    /// Query string for the listings endpoint.
    pub fn listing_query(&self, per_page: u32) -> String {
        let mut query = self.url_query();
        push_pair(&mut query, PER_PAGE_KEY, &per_page.to_string());
        query
    }
}

fn index_of(key: &str) -> Option<usize> {
    FIELDS.iter().position(|(name, _)| *name == key)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn push_pair(query: &mut String, key: &str, encoded_value: &str) {
    if !query.is_empty() {
        query.push('&');
    }
    query.push_str(key);
    query.push('=');
    query.push_str(encoded_value);
}
