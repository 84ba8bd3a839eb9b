//! Signer rows and the provenance captured when they sign

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}

impl LocationData {
    /// "Toronto, Canada", "Canada", or `None` when nothing useful is known.
    pub fn display(&self) -> Option<String> {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => match (self.latitude, self.longitude) {
                (Some(lat), Some(lon)) => Some(format!("{:.4}, {:.4}", lat, lon)),
                _ => None,
            },
        }
    }
}

/// Best-effort evidence about where and how a signature was made.
/// Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub ip_address: Option<String>,
    pub location: Option<LocationData>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub id: Uuid,
    pub document_id: Uuid,
    pub signer_name: String,
    pub signer_email: String,
    pub signer_role: String,
    pub required: bool,
    pub sort_order: u32,
    pub signed_at: Option<DateTime<Utc>>,
    /// PNG data URL
    pub signature_image: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<LocationData>,
    pub user_agent: Option<String>,
}

impl Signature {
    /// An unsigned signer row.
    pub fn pending(
        document_id: Uuid,
        signer_name: impl Into<String>,
        signer_email: impl Into<String>,
        signer_role: impl Into<String>,
        required: bool,
        sort_order: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            signer_name: signer_name.into(),
            signer_email: signer_email.into(),
            signer_role: signer_role.into(),
            required,
            sort_order,
            signed_at: None,
            signature_image: None,
            ip_address: None,
            location: None,
            user_agent: None,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signed_at.is_some() && self.signature_image.is_some()
    }

    pub fn email_matches(&self, email: &str) -> bool {
        self.signer_email.trim().eq_ignore_ascii_case(email.trim())
    }

    pub fn provenance(&self) -> Provenance {
        Provenance {
            ip_address: self.ip_address.clone(),
            location: self.location.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Everything written onto a signer row in the single signing update.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureCapture {
    pub image_data_url: String,
    pub signed_at: DateTime<Utc>,
    pub provenance: Provenance,
}
