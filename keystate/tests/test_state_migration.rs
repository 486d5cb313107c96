mod common;
use common::{unsigned_jwt, Device};

use keystate::migration::{
    keys::{v1, v2, v3, LATEST_STATE_VERSION, STATE_VERSION_KEY},
    latest_state_version,
    state::State,
    MigrationError, StoreKind,
};
use serde_json::json;

/// A schema 1 device with a signed-in user whose stored identity lacks the email
fn seed_legacy_device(device: &Device) {
    let token = unsigned_jwt(&json!({
        "sub": "0c5f",
        "email": "grace@example.com",
        "name": "Grace",
        "email_verified": true,
        "premium": true,
    }));

    let docs = &device.documents;
    docs.put(v1::ENVIRONMENT_URLS, r#"{"base":"https://vault.example.com"}"#);
    docs.put(v1::APP_LOCALE, "\"en-GB\"");
    docs.put(v1::CLEAR_CLIPBOARD, "60");
    docs.put(v2::USER_ID, "\"0c5f\"");
    docs.put(v2::ACCESS_TOKEN, &serde_json::to_string(&token).unwrap());
    docs.put(v2::REFRESH_TOKEN, "\"refresh\"");
    docs.put(v2::KDF, "0");
    docs.put(v2::KDF_ITERATIONS, "600000");
    docs.put(v2::VAULT_TIMEOUT, "30");
    docs.put(v2::VAULT_TIMEOUT_ACTION, "\"logOut\"");
    docs.put(v2::ENC_KEY, "\"enc-key\"");
    docs.put(v2::LAST_SYNC, "\"2024-03-01T10:00:00Z\"");
    device.preferences.put(v2::BIOMETRIC_UNLOCK, "true");
    device.secure.put(v2::KEY, "\"user-key\"");
    device.secure.put(v2::KEY_HASH, "\"key-hash\"");
}

#[tokio::test]
async fn test_legacy_device_migrates_to_latest() -> anyhow::Result<()> {
    // 1) Device on schema 1, no version marker
    let device = Device::default();
    seed_legacy_device(&device);
    let controller = device.controller();

    assert_eq!(controller.state_version().await?, 1);
    assert!(controller.needs_migration().await?);

    // 2) Run the full chain
    let summary = controller.migrate_if_needed().await?;
    assert_eq!(summary.starting_version, 1);
    assert_eq!(summary.final_version, latest_state_version());
    assert_eq!(summary.steps_applied, 3);
    assert!(!summary.fresh_install);

    // 3) Account grouped, email and profile backfilled from the token
    let state: State = serde_json::from_str(
        &device
            .documents
            .raw(v3::STATE)
            .expect("state aggregate should exist"),
    )?;
    assert_eq!(state.active_user_id.as_deref(), Some("0c5f"));
    let account = &state.accounts["0c5f"];
    assert_eq!(account.profile.email, "grace@example.com");
    assert_eq!(account.profile.name.as_deref(), Some("Grace"));
    assert_eq!(account.profile.has_premium, Some(true));
    assert_eq!(account.profile.kdf_iterations, Some(600_000));
    assert_eq!(account.tokens.refresh_token.as_deref(), Some("refresh"));
    assert_eq!(account.settings.vault_timeout, None);

    // 4) Every store holds exactly the latest layout
    assert_eq!(
        device.documents.keys(),
        vec!["encKey_0c5f", "lastSync_0c5f", "state"]
    );
    assert_eq!(
        device.preferences.keys(),
        vec![
            "appLocale",
            "biometricUnlock_0c5f",
            "clearClipboard_0c5f",
            "preAuthEnvironmentUrls",
            STATE_VERSION_KEY,
            "vaultTimeoutAction_0c5f",
            "vaultTimeout_0c5f",
        ]
    );
    assert_eq!(device.secure.keys(), vec!["keyHash_0c5f", "key_0c5f"]);
    assert_eq!(device.preferences.raw("vaultTimeout_0c5f").as_deref(), Some("30"));
    assert_eq!(device.preferences.raw("clearClipboard_0c5f").as_deref(), Some("60"));
    assert_eq!(
        device.preferences.raw(STATE_VERSION_KEY),
        Some(LATEST_STATE_VERSION.to_string())
    );

    // 5) A second launch changes nothing
    let before = device.snapshot();
    let second = controller.migrate_if_needed().await?;
    assert_eq!(second.steps_applied + second.steps_empty, 0);
    assert_eq!(device.snapshot(), before);
    assert!(!controller.needs_migration().await?);

    Ok(())
}

#[tokio::test]
async fn test_malformed_token_blocks_incomplete_identity() -> anyhow::Result<()> {
    let device = Device::default();
    device.documents.put(v2::ACCESS_TOKEN, "\"not-a-jwt\"");
    device.preferences.put(STATE_VERSION_KEY, "2");

    let result = device.controller().migrate_if_needed().await;

    assert!(matches!(result, Err(MigrationError::TokenService(_))));
    assert_eq!(device.preferences.raw(STATE_VERSION_KEY).as_deref(), Some("2"));
    assert!(device.documents.raw(v2::ACCESS_TOKEN).is_some());

    Ok(())
}

#[tokio::test]
async fn test_missing_email_without_token_is_fatal() -> anyhow::Result<()> {
    let device = Device::default();
    device.documents.put(v2::USER_ID, "\"0c5f\"");

    let result = device.controller().migrate_if_needed().await;

    match result {
        Err(MigrationError::MissingRequiredKey { store, key }) => {
            assert_eq!(store, StoreKind::Documents);
            assert_eq!(key, v2::USER_EMAIL);
        }
        other => panic!("expected MissingRequiredKey, got {other:?}"),
    }
    assert_eq!(device.preferences.raw(STATE_VERSION_KEY), None);

    Ok(())
}

#[tokio::test]
async fn test_fresh_install_is_stamped_with_latest_version() -> anyhow::Result<()> {
    let device = Device::default();

    let summary = device.controller().migrate_if_needed().await?;

    assert!(summary.fresh_install);
    assert_eq!(device.documents.keys(), Vec::<String>::new());
    assert_eq!(device.preferences.keys(), vec![STATE_VERSION_KEY]);
    assert_eq!(device.secure.keys(), Vec::<String>::new());

    Ok(())
}
