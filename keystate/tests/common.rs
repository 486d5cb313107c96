use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use keystate::{
    device::{DeviceKeyValueStore, KeyValueStoreError},
    migration::MigrationController,
    session::jwt_token_service,
};

/// Host store double: a sorted map of raw JSON values
#[derive(Default)]
pub struct MemoryStore(Mutex<BTreeMap<String, String>>);

impl MemoryStore {
    pub fn put(&self, key: &str, raw_json: &str) {
        self.0
            .lock()
            .unwrap()
            .insert(key.to_string(), raw_json.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.0.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.lock().unwrap().keys().cloned().collect()
    }

    pub fn contents(&self) -> BTreeMap<String, String> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceKeyValueStore for MemoryStore {
    async fn get(&self, key: String) -> Result<Option<String>, KeyValueStoreError> {
        Ok(self.0.lock().unwrap().get(&key).cloned())
    }

    async fn set(&self, key: String, value: String) -> Result<(), KeyValueStoreError> {
        self.0.lock().unwrap().insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: String) -> Result<(), KeyValueStoreError> {
        self.0.lock().unwrap().remove(&key);
        Ok(())
    }
}

/// The three host stores of one simulated device
#[derive(Default)]
pub struct Device {
    pub documents: Arc<MemoryStore>,
    pub preferences: Arc<MemoryStore>,
    pub secure: Arc<MemoryStore>,
}

impl Device {
    /// A controller over this device's stores using the built-in JWT decoder
    pub fn controller(&self) -> Arc<MigrationController> {
        MigrationController::new(
            self.documents.clone(),
            self.preferences.clone(),
            self.secure.clone(),
            Some(jwt_token_service()),
        )
    }

    pub fn snapshot(&self) -> [BTreeMap<String, String>; 3] {
        [
            self.documents.contents(),
            self.preferences.contents(),
            self.secure.contents(),
        ]
    }
}

/// An unsigned JWT carrying `claims` as its payload
pub fn unsigned_jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
