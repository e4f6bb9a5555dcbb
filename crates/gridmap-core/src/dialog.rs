//! Contract with the external edit-node dialog.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geom::LatLng;
use crate::model::{Node, NodeAttributes};

/// What the dialog hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Updated(NodeEdit),
    Canceled,
}

/// Draft form state for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeEdit {
    pub attributes: NodeAttributes,
}

impl NodeEdit {
    /// Form prefilled from `node`.
    pub fn for_node(node: &Node) -> Self {
        Self {
            attributes: NodeAttributes::from_node(node),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let name = self.attributes.name.as_deref().unwrap_or("");
        if name.trim().is_empty() {
            return Err(Error::InvalidAttributes {
                message: "Provider name is required".to_string(),
            });
        }
        if let Some(p) = self.attributes.position {
            if !p.is_finite() {
                return Err(Error::InvalidAttributes {
                    message: "Latitude and longitude must be valid numbers".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Address to send to the geocoder.
    pub fn geocode_query(&self) -> std::result::Result<&str, String> {
        match self.attributes.address.as_deref().map(str::trim) {
            Some(addr) if !addr.is_empty() => Ok(addr),
            _ => Err("Please enter an address to geolocate".to_string()),
        }
    }

    /// Applies a geocoder answer. `Ok` carries the success banner text; `Err` the error text.
    pub fn apply_geocode(&mut self, outcome: &GeocodeOutcome) -> std::result::Result<String, String> {
        match (&outcome.status, outcome.location) {
            (GeocodeStatus::Ok, Some(location)) => {
                self.attributes.position = Some(location);
                Ok(format!(
                    "Address geocoded successfully: {}",
                    outcome.formatted_address.as_deref().unwrap_or_default()
                ))
            }
            (GeocodeStatus::Ok, None) => {
                Err("Could not find coordinates for this address".to_string())
            }
            (status, _) => Err(status.message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeocodeStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    #[serde(untagged)]
    Other(String),
}

impl GeocodeStatus {
    pub fn message(&self) -> String {
        match self {
            GeocodeStatus::Ok => "Address geocoded successfully".to_string(),
            GeocodeStatus::ZeroResults => "No results found for this address".to_string(),
            GeocodeStatus::OverQueryLimit => "Too many requests, please try again later".to_string(),
            GeocodeStatus::RequestDenied => "Geocoding service request was denied".to_string(),
            GeocodeStatus::InvalidRequest => "Invalid geocoding request".to_string(),
            GeocodeStatus::Other(code) => format!("Geocoding error: {code}"),
        }
    }
}

/// Result of a delegated address lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeOutcome {
    pub status: GeocodeStatus,
    pub location: Option<LatLng>,
    pub formatted_address: Option<String>,
}
