use clientbook_core::{
    ClientRecord, ClientRepository, ClientService, ClientStore, RegisterClientRequest, RepoError,
    StoreConfig, StoreError,
};

fn open_store() -> ClientStore {
    ClientStore::open(StoreConfig::in_memory()).unwrap()
}

fn record(email: &str, created_at: i64) -> ClientRecord {
    ClientRecord {
        email: email.to_string(),
        name: "Anna Berg".to_string(),
        city: "Bergen".to_string(),
        phone: "+47 911 22 333".to_string(),
        contact_ok: true,
        created_at,
    }
}

#[test]
fn upsert_then_list_roundtrip_preserves_every_field() {
    let store = open_store();
    let accessor = store.accessor();

    let client = record("anna@example.com", 1_700_000_000_000);
    accessor.upsert(&client).unwrap();

    let listed = accessor.list_all().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], client);
}

#[test]
fn upsert_with_same_email_fully_replaces_the_row() {
    let store = open_store();
    let accessor = store.accessor();

    accessor.upsert(&record("anna@example.com", 1_000)).unwrap();

    let mut replacement = record("anna@example.com", 2_000);
    replacement.name = "Anna Berg-Olsen".to_string();
    replacement.city = "Oslo".to_string();
    replacement.contact_ok = false;
    accessor.upsert(&replacement).unwrap();

    let listed = accessor.list_all().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], replacement);
}

#[test]
fn delete_by_email_removes_the_row() {
    let store = open_store();
    let accessor = store.accessor();

    accessor.upsert(&record("anna@example.com", 1_000)).unwrap();
    accessor.upsert(&record("bo@example.com", 2_000)).unwrap();

    accessor.delete_by_email("anna@example.com").unwrap();

    let listed = accessor.list_all().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].email, "bo@example.com");
}

#[test]
fn delete_of_missing_email_is_a_noop() {
    let store = open_store();
    let accessor = store.accessor();

    accessor.upsert(&record("anna@example.com", 1_000)).unwrap();
    accessor.delete_by_email("nobody@example.com").unwrap();

    assert_eq!(accessor.count().unwrap(), 1);
}

#[test]
fn clear_leaves_an_empty_roster() {
    let store = open_store();
    let accessor = store.accessor();

    accessor.upsert(&record("anna@example.com", 1_000)).unwrap();
    accessor.upsert(&record("bo@example.com", 2_000)).unwrap();

    accessor.clear().unwrap();

    assert!(accessor.list_all().unwrap().is_empty());
}

#[test]
fn list_all_orders_by_created_at_descending() {
    let store = open_store();
    let accessor = store.accessor();

    accessor.upsert(&record("oldest@example.com", 1_000)).unwrap();
    accessor.upsert(&record("newest@example.com", 3_000)).unwrap();
    accessor.upsert(&record("middle@example.com", 2_000)).unwrap();

    let emails: Vec<String> = accessor
        .list_all()
        .unwrap()
        .into_iter()
        .map(|client| client.email)
        .collect();
    assert_eq!(
        emails,
        vec!["newest@example.com", "middle@example.com", "oldest@example.com"]
    );
}

#[test]
fn failed_batch_rolls_back_every_row_of_the_batch() {
    let store = open_store();
    let accessor = store.accessor();

    let existing = record("anna@example.com", 1_000);
    accessor.upsert(&existing).unwrap();

    // Second entry fails validation after the first one has been written
    // inside the transaction; the whole batch must roll back.
    let batch = vec![record("bo@example.com", 2_000), record("not-an-email", 3_000)];
    let err = accessor.upsert_all(&batch).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    let listed = accessor.list_all().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], existing);
}

#[test]
fn upsert_all_commits_the_whole_batch_on_success() {
    let store = open_store();
    let accessor = store.accessor();

    let batch = vec![
        record("anna@example.com", 1_000),
        record("bo@example.com", 2_000),
        record("cleo@example.com", 3_000),
    ];
    accessor.upsert_all(&batch).unwrap();

    assert_eq!(accessor.count().unwrap(), 3);
}

#[test]
fn invalid_record_is_rejected_before_any_write() {
    let store = open_store();
    let accessor = store.accessor();

    let mut nameless = record("anna@example.com", 1_000);
    nameless.name = "  ".to_string();

    let err = accessor.upsert(&nameless).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(accessor.count().unwrap(), 0);
}

#[test]
fn concurrent_first_accessor_calls_observe_one_instance() {
    let store = open_store();

    let mut addresses = Vec::new();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| store.accessor() as *const _ as usize))
            .collect();
        for handle in handles {
            addresses.push(handle.join().unwrap());
        }
    });

    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn interactive_thread_guard_rejects_accessor_operations() {
    let store = open_store();
    store.forbid_blocking_from_current_thread();

    let err = store.accessor().list_all().unwrap_err();
    assert!(matches!(err, RepoError::Store(StoreError::WrongThreadUsage)));

    std::thread::scope(|scope| {
        scope
            .spawn(|| store.accessor().count().unwrap())
            .join()
            .unwrap();
    });
}

#[test]
fn service_normalizes_email_and_stamps_creation_time() {
    let store = open_store();
    let service = ClientService::new(store.accessor());

    let registered = service
        .register_client(&RegisterClientRequest {
            name: "Anna Berg".to_string(),
            city: "Bergen".to_string(),
            email: "  Anna@Example.COM ".to_string(),
            phone: "+47 911 22 333".to_string(),
            contact_ok: true,
        })
        .unwrap();

    assert_eq!(registered.email, "anna@example.com");
    assert!(registered.created_at > 0);

    let roster = service.roster().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0], registered);

    service.remove_client("ANNA@example.com").unwrap();
    assert_eq!(service.client_count().unwrap(), 0);
}
