use anyhow::anyhow;

use crate::storage::KeyValueStore;

/// Browser `window.localStorage`. Reads that the browser refuses (private
/// mode, missing window) are reported as absent.
#[derive(Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|window| window.local_storage().ok().flatten())
    }
}

impl KeyValueStore for LocalStorage {
    fn load(&self, key: &str) -> Option<String> {
        Self::storage().and_then(|storage| storage.get_item(key).ok().flatten())
    }

    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let storage = Self::storage().ok_or_else(|| anyhow!("localStorage is unavailable"))?;
        storage
            .set_item(key, value)
            .map_err(|err| anyhow!("localStorage rejected write for {key}: {err:?}"))
    }
}
