use clientbook_core::{ClientRecord, ClientValidationError};

fn valid_record() -> ClientRecord {
    ClientRecord {
        email: "anna@example.com".to_string(),
        name: "Anna Berg".to_string(),
        city: "Bergen".to_string(),
        phone: "+47 911 22 333".to_string(),
        contact_ok: true,
        created_at: 1_700_000_000_000,
    }
}

#[test]
fn valid_record_passes_validation() {
    assert_eq!(valid_record().validate(), Ok(()));
}

#[test]
fn empty_email_is_rejected() {
    let mut record = valid_record();
    record.email = "   ".to_string();
    assert_eq!(record.validate(), Err(ClientValidationError::EmptyEmail));
}

#[test]
fn email_without_at_sign_is_rejected() {
    let mut record = valid_record();
    record.email = "anna.example.com".to_string();
    assert!(matches!(
        record.validate(),
        Err(ClientValidationError::MalformedEmail(_))
    ));
}

#[test]
fn email_with_embedded_whitespace_is_rejected() {
    let mut record = valid_record();
    record.email = "anna berg@example.com".to_string();
    assert!(matches!(
        record.validate(),
        Err(ClientValidationError::MalformedEmail(_))
    ));
}

#[test]
fn blank_name_is_rejected() {
    let mut record = valid_record();
    record.name = String::new();
    assert_eq!(record.validate(), Err(ClientValidationError::EmptyName));
}

#[test]
fn empty_city_and_phone_are_allowed() {
    let mut record = valid_record();
    record.city = String::new();
    record.phone = String::new();
    assert_eq!(record.validate(), Ok(()));
}

#[test]
fn new_stamps_current_creation_time() {
    let record = ClientRecord::new("anna@example.com", "Anna Berg", "Bergen", "", false);
    assert!(record.created_at > 0);
    assert!(!record.contact_ok);
}

#[test]
fn serde_field_names_match_storage_columns() {
    let json = serde_json::to_value(valid_record()).unwrap();
    assert!(json.get("contactOk").is_some());
    assert!(json.get("createdAt").is_some());
    assert!(json.get("contact_ok").is_none());

    let back: ClientRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, valid_record());
}
