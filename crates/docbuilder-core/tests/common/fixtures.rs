//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use docsign_core::{Point, SignaturePad};
use shared_types::{Client, ClientContact, MemoryStore, SessionContext};
use uuid::Uuid;

pub const STAFF_EMAIL: &str = "sam@cipherx.ca";
pub const ACME_ID: Uuid = Uuid::from_u128(0xac3e_0000_0000_0000_0000_0000_0000_0001);

pub fn contact(name: &str, email: &str, primary: bool) -> ClientContact {
    ClientContact {
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        job_title: Some("Director".to_string()),
        is_primary: primary,
    }
}

/// A client with two contacts, Ana being primary. Every call returns the
/// same client id.
pub fn acme() -> Client {
    let mut client = Client::new("Acme Dental");
    client.id = ACME_ID;
    client.address = Some("12 King St W, Toronto, ON".to_string());
    client.contacts.push(contact("Ana Silva", "ana@acme.ca", true));
    client.contacts.push(contact("Raj Patel", "raj@acme.ca", false));
    client
}

pub fn store_with(client: &Client) -> MemoryStore {
    let store = MemoryStore::new();
    store.add_client(client.clone()).expect("store lock");
    store
}

pub fn staff() -> SessionContext {
    SessionContext::staff(STAFF_EMAIL)
}

/// A pad with one diagonal stroke.
pub fn signed_pad() -> SignaturePad {
    let mut pad = SignaturePad::default();
    pad.begin(Point::new(30.0, 140.0));
    pad.extend(Point::new(120.0, 60.0));
    pad.extend(Point::new(260.0, 130.0));
    pad.end();
    pad
}
