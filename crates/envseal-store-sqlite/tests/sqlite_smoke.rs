use chrono::Utc;
use envseal_storage::{
    Environment, IntegrationAuthorization, IntegrationId, IntegrationStore, Principal,
    PrincipalDirectory, PrincipalId, SecretLocator, SecretRecord, SecretRepository, SecretScope,
    StoreError, WorkspaceId, WrappedKeyRecord, WrappedKeyStore,
};
use envseal_store_sqlite::SqliteStore;

fn wrapped(ws: &WorkspaceId, recipient: &PrincipalId, byte: u8) -> WrappedKeyRecord {
    WrappedKeyRecord {
        workspace_id: ws.clone(),
        recipient_id: recipient.clone(),
        sender_id: PrincipalId::new(),
        ciphertext: vec![byte; 48],
        nonce: vec![byte; 24],
        created_at: Utc::now(),
    }
}

fn secret(ws: &WorkspaceId, env: Environment, name: &str, scope: SecretScope, byte: u8) -> SecretRecord {
    SecretRecord::new(
        SecretLocator {
            workspace_id: ws.clone(),
            environment: env,
            scope,
            name: name.to_string(),
        },
        vec![byte; 24],
        vec![byte; 32],
    )
    .unwrap()
}

#[tokio::test]
async fn wrapped_keys_upsert_list_and_delete() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let ws = WorkspaceId::new();
    let alice = PrincipalId::new();
    let bob = PrincipalId::new();

    s.put(&wrapped(&ws, &alice, 1)).await.unwrap();
    s.put(&wrapped(&ws, &bob, 2)).await.unwrap();
    s.put(&wrapped(&ws, &bob, 3)).await.unwrap();

    let got = s.get(&ws, &bob).await.unwrap().unwrap();
    assert_eq!(got.ciphertext, vec![3; 48]);
    assert_eq!(got.nonce, vec![3; 24]);

    let all = s.list_for_workspace(&ws).await.unwrap();
    assert_eq!(all.len(), 2);

    s.delete(&ws, &bob).await.unwrap();
    s.delete(&ws, &bob).await.unwrap();
    assert!(s.get(&ws, &bob).await.unwrap().is_none());
    assert!(s.get(&WorkspaceId::new(), &alice).await.unwrap().is_none());
}

#[tokio::test]
async fn secrets_are_scoped_by_environment_and_visibility() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let ws = WorkspaceId::new();
    let alice = PrincipalId::new();
    let bob = PrincipalId::new();
    let mine = SecretScope::Personal {
        owner_id: alice.clone(),
    };

    s.put_secret(&secret(&ws, Environment::Development, "DB", SecretScope::Shared, 1))
        .await
        .unwrap();
    s.put_secret(&secret(&ws, Environment::Development, "DB", mine.clone(), 2))
        .await
        .unwrap();
    s.put_secret(&secret(&ws, Environment::Production, "DB", SecretScope::Shared, 3))
        .await
        .unwrap();
    s.put_secret(&secret(&ws, Environment::Development, "API", SecretScope::Shared, 4))
        .await
        .unwrap();

    let for_alice = s
        .list_secrets(&ws, Environment::Development, &alice)
        .await
        .unwrap();
    let names: Vec<_> = for_alice.iter().map(|r| r.name().to_string()).collect();
    assert_eq!(names, vec!["API", "DB", "DB"]);

    let for_bob = s
        .list_secrets(&ws, Environment::Development, &bob)
        .await
        .unwrap();
    assert_eq!(for_bob.len(), 2);
    assert!(for_bob.iter().all(|r| *r.scope() == SecretScope::Shared));

    let locator = SecretLocator {
        workspace_id: ws.clone(),
        environment: Environment::Development,
        scope: mine,
        name: "DB".into(),
    };
    let got = s.get_secret(&locator).await.unwrap().unwrap();
    assert_eq!(got.ciphertext(), &[2; 32][..]);
    assert_eq!(got.scope().owner(), Some(&alice));

    assert_eq!(s.delete_personal_secrets(&ws, &alice).await.unwrap(), 1);
    assert!(s.get_secret(&locator).await.unwrap().is_none());
    s.delete_secret(&locator).await.unwrap();
}

#[tokio::test]
async fn secret_upsert_replaces_value() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let ws = WorkspaceId::new();

    s.put_secret(&secret(&ws, Environment::Staging, "TOKEN", SecretScope::Shared, 1))
        .await
        .unwrap();
    s.put_secret(&secret(&ws, Environment::Staging, "TOKEN", SecretScope::Shared, 9))
        .await
        .unwrap();

    let all = s
        .list_secrets(&ws, Environment::Staging, &PrincipalId::new())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].nonce(), &[9; 24][..]);
}

#[tokio::test]
async fn principals_register_once_per_key() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let principal = Principal {
        id: PrincipalId::new(),
        name: "laptop".into(),
        public_key: vec![7; 32],
        created_at: Utc::now(),
    };

    s.register_principal(&principal).await.unwrap();
    s.register_principal(&principal).await.unwrap();

    let mut rekeyed = principal.clone();
    rekeyed.public_key = vec![8; 32];
    let err = s.register_principal(&rekeyed).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let got = s.get_principal(&principal.id).await.unwrap();
    assert_eq!(got.public_key, vec![7; 32]);
    assert!(matches!(
        s.get_principal(&PrincipalId::new()).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn integrations_roundtrip_and_toggle() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let ws = WorkspaceId::new();
    let integration = IntegrationAuthorization {
        id: IntegrationId::new(),
        workspace_id: ws.clone(),
        environment: Environment::Production,
        provider: "dotenv".into(),
        target: "/tmp/prod.env".into(),
        credentials: vec![],
        is_active: true,
        created_at: Utc::now(),
    };
    s.put_integration(&integration).await.unwrap();

    s.set_integration_active(&integration.id, false).await.unwrap();
    let got = s.get_integration(&integration.id).await.unwrap();
    assert!(!got.is_active);
    assert_eq!(got.environment, Environment::Production);
    assert_eq!(s.list_integrations(&ws).await.unwrap().len(), 1);

    assert!(matches!(
        s.set_integration_active(&IntegrationId::new(), true).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.db");
    let ws = WorkspaceId::new();
    let alice = PrincipalId::new();

    {
        let s = SqliteStore::open_path(&path).await.unwrap();
        s.put(&wrapped(&ws, &alice, 5)).await.unwrap();
    }

    let s = SqliteStore::open_path(&path).await.unwrap();
    let got = s.get(&ws, &alice).await.unwrap().unwrap();
    assert_eq!(got.ciphertext, vec![5; 48]);
}

#[tokio::test]
async fn concurrent_puts_leave_one_record() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let ws = WorkspaceId::new();
    let alice = PrincipalId::new();

    let writes = (0..16u8).map(|i| {
        let record = wrapped(&ws, &alice, i);
        let s = &s;
        async move { s.put(&record).await }
    });
    for result in futures::future::join_all(writes).await {
        result.unwrap();
    }

    let all = s.list_for_workspace(&ws).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].ciphertext[0], all[0].nonce[0]);
}

#[tokio::test]
async fn concurrent_creators_claim_a_workspace_once() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let ws = WorkspaceId::new();

    let creators: Vec<PrincipalId> = (0..8).map(|_| PrincipalId::new()).collect();
    let claims = creators.iter().enumerate().map(|(i, creator)| {
        let record = wrapped(&ws, creator, i as u8);
        let s = &s;
        async move { s.put_first(&record).await }
    });
    let results = futures::future::join_all(claims).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(StoreError::Conflict(_)))));

    let all = s.list_for_workspace(&ws).await.unwrap();
    assert_eq!(all.len(), 1);
    let winner = results.iter().position(|r| r.is_ok()).unwrap();
    assert_eq!(all[0].recipient_id, creators[winner]);
}

#[tokio::test]
async fn put_first_refuses_a_workspace_that_already_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let ws = WorkspaceId::new();
    let alice = PrincipalId::new();
    let bob = PrincipalId::new();

    {
        let s = SqliteStore::open_path(&path).await.unwrap();
        s.put_first(&wrapped(&ws, &alice, 1)).await.unwrap();
    }

    let s = SqliteStore::open_path(&path).await.unwrap();
    assert!(matches!(
        s.put_first(&wrapped(&ws, &bob, 2)).await,
        Err(StoreError::Conflict(_))
    ));
    assert!(s.get(&ws, &bob).await.unwrap().is_none());

    s.put(&wrapped(&ws, &bob, 3)).await.unwrap();
    assert_eq!(s.list_for_workspace(&ws).await.unwrap().len(), 2);
}
