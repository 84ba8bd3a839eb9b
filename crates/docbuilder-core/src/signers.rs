//! Signers staged in the wizard before they become signature rows.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use shared_types::{ClientContact, CompanySettings, Signature};
use uuid::Uuid;

use crate::error::SignerError;

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex");
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerDraft {
    pub name: String,
    pub email: String,
    pub role: String,
    pub required: bool,
}

impl SignerDraft {
    pub fn new(name: &str, email: &str, role: &str, required: bool) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            role: role.trim().to_string(),
            required,
        }
    }

    pub fn from_contact(contact: &ClientContact) -> Self {
        let role = contact.job_title.as_deref().unwrap_or("Client");
        Self::new(&contact.name, &contact.email, role, true)
    }

    fn same_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignerList {
    signers: Vec<SignerDraft>,
}

impl SignerList {
    pub fn new(signers: Vec<SignerDraft>) -> Self {
        Self { signers }
    }

    /// Staged list mirroring existing signature rows.
    pub fn from_rows(rows: &[Signature]) -> Self {
        let mut rows: Vec<&Signature> = rows.iter().collect();
        rows.sort_by_key(|r| r.sort_order);
        Self::new(
            rows.into_iter()
                .map(|r| SignerDraft::new(&r.signer_name, &r.signer_email, &r.signer_role, r.required))
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[SignerDraft] {
        &self.signers
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn add(&mut self, signer: SignerDraft) -> Result<usize, SignerError> {
        if !signer.email.is_empty() && self.signers.iter().any(|s| s.same_email(&signer.email)) {
            return Err(SignerError::DuplicateEmail(signer.email));
        }
        self.signers.push(signer);
        Ok(self.signers.len() - 1)
    }

    pub fn add_contact(&mut self, contact: &ClientContact) -> Result<usize, SignerError> {
        self.add(SignerDraft::from_contact(contact))
    }

    /// The agency's own countersignature.
    pub fn add_company_representative(
        &mut self,
        company: &CompanySettings,
        name: &str,
        email: &str,
    ) -> Result<usize, SignerError> {
        let role = format!("{} Representative", company.company_name);
        self.add(SignerDraft::new(name, email, &role, true))
    }

    pub fn remove(&mut self, index: usize) -> Result<SignerDraft, SignerError> {
        if index >= self.signers.len() {
            return Err(SignerError::OutOfRange(index));
        }
        Ok(self.signers.remove(index))
    }

    pub fn toggle_required(&mut self, index: usize) -> Result<bool, SignerError> {
        let signer = self
            .signers
            .get_mut(index)
            .ok_or(SignerError::OutOfRange(index))?;
        signer.required = !signer.required;
        Ok(signer.required)
    }

    /// Move the signer at `index` by one position. Returns `false` at the edges.
    pub fn move_signer(&mut self, index: usize, up: bool) -> Result<bool, SignerError> {
        if index >= self.signers.len() {
            return Err(SignerError::OutOfRange(index));
        }
        let target = match (up, index) {
            (true, 0) => return Ok(false),
            (true, i) => i - 1,
            (false, i) if i + 1 == self.signers.len() => return Ok(false),
            (false, i) => i + 1,
        };
        self.signers.swap(index, target);
        Ok(true)
    }

    pub fn validate(&self) -> Result<(), SignerError> {
        if self.signers.is_empty() {
            return Err(SignerError::NoSigners);
        }
        for (i, s) in self.signers.iter().enumerate() {
            if s.name.trim().is_empty() {
                return Err(SignerError::MissingName(i + 1));
            }
            if !is_valid_email(&s.email) {
                return Err(SignerError::InvalidEmail(s.email.clone()));
            }
        }
        // completion is driven by required rows only
        if !self.signers.iter().any(|s| s.required) {
            return Err(SignerError::NoRequiredSigner);
        }
        Ok(())
    }

    /// Pending signature rows in list order.
    pub fn to_rows(&self, document_id: Uuid) -> Vec<Signature> {
        self.signers
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Signature::pending(document_id, &s.name, &s.email, &s.role, s.required, i as u32)
            })
            .collect()
    }
}
