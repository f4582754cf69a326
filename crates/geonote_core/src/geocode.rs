//! Reverse geocoding seam for reminder location labels.

use crate::geo::Coordinate;
use crate::tracking::provider::ProviderError;

/// Postal address resolved for a coordinate. Blank parts are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub name: String,
    pub street: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub postal_code: String,
}

impl Address {
    /// Human-readable label: name, street, city, region, country joined by `", "`.
    ///
    /// Blank parts are omitted; postal code is not part of the label.
    pub fn formatted_address(&self) -> String {
        [
            &self.name,
            &self.street,
            &self.city,
            &self.region,
            &self.country,
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Platform reverse geocoder.
pub trait Geocoder: Send + Sync {
    fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<Address>, ProviderError>;
}
