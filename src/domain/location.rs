//! Hierarchical location scope (country > city > district > streets) used to
//! narrow what a regional administrator can see.

use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// A partially specified location. Every field is optional; an empty scope
/// means global access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredLocation")]
pub struct LocationScope {
    pub country: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub streets: Vec<String>,
}

/// Shape of a location as it may exist in storage. Older rows wrote the
/// district under `state`.
#[derive(Debug, Clone, Default, Deserialize)]
struct StoredLocation {
    country: Option<String>,
    city: Option<String>,
    district: Option<String>,
    state: Option<String>,
    #[serde(default)]
    streets: Option<Vec<String>>,
}

impl From<StoredLocation> for LocationScope {
    fn from(raw: StoredLocation) -> Self {
        Self::new(
            raw.country,
            raw.city,
            clean(raw.district).or(raw.state),
            raw.streets.unwrap_or_default(),
        )
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl LocationScope {
    pub fn new(
        country: Option<String>,
        city: Option<String>,
        district: Option<String>,
        streets: Vec<String>,
    ) -> Self {
        Self {
            country: clean(country),
            city: clean(city),
            district: clean(district),
            streets: streets
                .into_iter()
                .filter_map(|s| clean(Some(s)))
                .collect(),
        }
    }

    pub fn city(city: impl Into<String>) -> Self {
        Self::new(None, Some(city.into()), None, Vec::new())
    }

    /// Read a stored JSON location, applying the `state` -> `district` rename.
    pub fn from_stored(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.country.is_none()
            && self.city.is_none()
            && self.district.is_none()
            && self.streets.is_empty()
    }

    /// Predicate over account location columns. Streets are carried along
    /// but no account column can be matched against them yet.
    pub fn predicate(&self) -> LocationPredicate {
        let mut clauses = Vec::new();
        if let Some(country) = &self.country {
            clauses.push(LocationClause {
                field: LocationField::Country,
                needle: country.clone(),
            });
        }
        if let Some(city) = &self.city {
            clauses.push(LocationClause {
                field: LocationField::City,
                needle: city.clone(),
            });
        }
        if let Some(district) = &self.district {
            clauses.push(LocationClause {
                field: LocationField::District,
                needle: district.clone(),
            });
        }
        LocationPredicate {
            clauses,
            unenforced_streets: self.streets.clone(),
        }
    }

    /// "Main St, Oak Ave, Downtown, Toronto, Canada"
    pub fn full_display(&self) -> String {
        let mut parts: Vec<&str> = self.streets.iter().map(String::as_str).collect();
        parts.extend(
            [&self.district, &self.city, &self.country]
                .into_iter()
                .filter_map(|p| p.as_deref()),
        );
        if parts.is_empty() {
            return GLOBAL_LABEL.to_string();
        }
        parts.join(", ")
    }

    /// "2 streets in Downtown, Toronto"
    pub fn compact_display(&self) -> String {
        let area: Vec<&str> = [&self.district, &self.city]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        let area = if area.is_empty() {
            self.country.clone().unwrap_or_default()
        } else {
            area.join(", ")
        };

        match (self.streets.len(), area.is_empty()) {
            (0, true) => GLOBAL_LABEL.to_string(),
            (0, false) => area,
            (n, true) => street_count(n),
            (n, false) => format!("{} in {area}", street_count(n)),
        }
    }

    /// One "Label: value" line per present level.
    pub fn itemized_display(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(country) = &self.country {
            lines.push(format!("Country: {country}"));
        }
        if let Some(city) = &self.city {
            lines.push(format!("City: {city}"));
        }
        if let Some(district) = &self.district {
            lines.push(format!("District: {district}"));
        }
        if !self.streets.is_empty() {
            lines.push(format!("Streets: {}", self.streets.join(", ")));
        }
        if lines.is_empty() {
            lines.push(GLOBAL_LABEL.to_string());
        }
        lines
    }
}

const GLOBAL_LABEL: &str = "All locations";

fn street_count(n: usize) -> String {
    if n == 1 {
        "1 street".to_string()
    } else {
        format!("{n} streets")
    }
}

impl fmt::Display for LocationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationField {
    Country,
    City,
    District,
}

impl LocationField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::City => "city",
            Self::District => "district",
        }
    }
}

/// Case-insensitive substring test on one location column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationClause {
    pub field: LocationField,
    pub needle: String,
}

impl LocationClause {
    pub fn matches(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| v.to_lowercase().contains(&self.needle.to_lowercase()))
    }
}

/// Conjunction of location clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPredicate {
    pub clauses: Vec<LocationClause>,
    pub unenforced_streets: Vec<String>,
}

impl LocationPredicate {
    /// True when no column-level clause exists. Such a predicate must never
    /// be run as an unconstrained query.
    pub fn is_unconstrained(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, location: &AccountLocation) -> bool {
        self.clauses.iter().all(|clause| {
            let value = match clause.field {
                LocationField::Country => location.country.as_deref(),
                LocationField::City => location.city.as_deref(),
                LocationField::District => location.district.as_deref(),
            };
            clause.matches(value)
        })
    }
}

/// Where an ordinary account lives, as recorded on the account row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLocation {
    pub country: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downtown() -> LocationScope {
        LocationScope::new(
            Some("Canada".into()),
            Some("Toronto".into()),
            Some("Downtown".into()),
            vec!["Main St".into(), "Oak Ave".into()],
        )
    }

    #[test]
    fn legacy_state_is_read_as_district() {
        let scope =
            LocationScope::from_stored(serde_json::json!({"city": "Austin", "state": "Travis"}))
                .unwrap();
        assert_eq!(scope.district.as_deref(), Some("Travis"));
    }

    #[test]
    fn district_wins_over_legacy_state() {
        let scope = LocationScope::from_stored(
            serde_json::json!({"district": "Centre", "state": "Old", "streets": null}),
        )
        .unwrap();
        assert_eq!(scope.district.as_deref(), Some("Centre"));
        assert!(scope.streets.is_empty());
    }

    #[test]
    fn blank_fields_count_as_absent() {
        let scope = LocationScope::new(Some(" ".into()), None, Some("".into()), vec![" ".into()]);
        assert!(scope.is_unrestricted());
        assert!(scope.predicate().is_unconstrained());
    }

    #[test]
    fn renderings() {
        let scope = downtown();
        assert_eq!(
            scope.full_display(),
            "Main St, Oak Ave, Downtown, Toronto, Canada"
        );
        assert_eq!(scope.compact_display(), "2 streets in Downtown, Toronto");
        assert_eq!(
            scope.itemized_display(),
            vec![
                "Country: Canada",
                "City: Toronto",
                "District: Downtown",
                "Streets: Main St, Oak Ave"
            ]
        );
        assert_eq!(LocationScope::default().full_display(), "All locations");
        assert_eq!(LocationScope::city("Ottawa").compact_display(), "Ottawa");
    }

    #[test]
    fn predicate_is_conjunctive_substring() {
        let predicate = LocationScope::new(Some("can".into()), Some("TORONTO".into()), None, vec![])
            .predicate();
        let north = AccountLocation {
            country: Some("Canada".into()),
            city: Some("North Toronto".into()),
            district: None,
        };
        let ottawa = AccountLocation {
            country: Some("Canada".into()),
            city: Some("Ottawa".into()),
            district: None,
        };
        let missing_city = AccountLocation {
            country: Some("Canada".into()),
            ..Default::default()
        };
        assert!(predicate.matches(&north));
        assert!(!predicate.matches(&ottawa));
        assert!(!predicate.matches(&missing_city));
    }

    #[test]
    fn streets_are_not_turned_into_clauses() {
        let predicate = downtown().predicate();
        assert_eq!(predicate.clauses.len(), 3);
        assert_eq!(predicate.unenforced_streets, vec!["Main St", "Oak Ave"]);
    }
}
