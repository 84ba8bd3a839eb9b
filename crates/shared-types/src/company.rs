use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global branding record; read-only to the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanySettings {
    pub company_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    /// Hex colour, e.g. `#1e3a5f`
    pub primary_color: String,
    pub secondary_color: String,
    pub document_footer: Option<String>,
    pub logo_url: Option<String>,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            company_name: "CipherX Solutions".to_string(),
            email: None,
            phone: None,
            website: None,
            address: None,
            primary_color: "#1e3a5f".to_string(),
            secondary_color: "#3b82f6".to_string(),
            document_footer: None,
            logo_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub company_name: String,
    pub address: Option<String>,
    #[serde(default)]
    pub contacts: Vec<ClientContact>,
}

impl Client {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_name: company_name.into(),
            address: None,
            contacts: Vec::new(),
        }
    }

    /// The contact flagged primary, else the first one.
    pub fn primary_contact(&self) -> Option<&ClientContact> {
        self.contacts
            .iter()
            .find(|c| c.is_primary)
            .or_else(|| self.contacts.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, primary: bool) -> ClientContact {
        ClientContact {
            name: name.to_string(),
            email: format!("{}@client.com", name.to_lowercase()),
            phone: None,
            job_title: None,
            is_primary: primary,
        }
    }

    #[test]
    fn primary_contact_prefers_flag() {
        let mut client = Client::new("Acme");
        assert!(client.primary_contact().is_none());
        client.contacts = vec![contact("Ana", false), contact("Bo", true)];
        assert_eq!(client.primary_contact().unwrap().name, "Bo");
        client.contacts[1].is_primary = false;
        assert_eq!(client.primary_contact().unwrap().name, "Ana");
    }

    #[test]
    fn settings_fill_missing_fields() {
        let settings: CompanySettings =
            serde_json::from_str(r##"{"company_name": "Acme Web", "primary_color": "#000000"}"##)
                .unwrap();
        assert_eq!(settings.company_name, "Acme Web");
        assert_eq!(settings.secondary_color, "#3b82f6");
    }
}
