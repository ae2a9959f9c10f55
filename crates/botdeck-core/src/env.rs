// ── Bot environment values ──
//
// The `.env` pairs travel with the config. Values are held as secrets so
// snapshots, logs, and Debug output only ever show a masked form; the raw
// value is exposed only when building the save request.

use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// API key variables the bot reads. Always present (possibly empty) so
/// the editor has a slot for each.
pub const SECRET_KEYS: [&str; 2] = ["DEEPSEEK_API_KEY", "DASHSCOPE_API_KEY"];

#[derive(Clone)]
pub struct EnvVars {
    values: BTreeMap<String, SecretString>,
}

impl Default for EnvVars {
    fn default() -> Self {
        Self::from_plain(BTreeMap::new())
    }
}

impl fmt::Debug for EnvVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.masked()).finish()
    }
}

impl EnvVars {
    /// Take ownership of plain values as fetched from the server.
    pub fn from_plain(plain: BTreeMap<String, String>) -> Self {
        let mut values: BTreeMap<String, SecretString> = plain
            .into_iter()
            .map(|(k, v)| (k, SecretString::from(v)))
            .collect();
        for key in SECRET_KEYS {
            values
                .entry(key.to_owned())
                .or_insert_with(|| SecretString::from(String::new()));
        }
        Self { values }
    }

    pub fn set(&mut self, key: impl Into<String>, value: SecretString) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&SecretString> {
        self.values.get(key)
    }

    /// `true` when the key holds a non-blank value.
    pub fn is_set(&self, key: &str) -> bool {
        self.values
            .get(key)
            .is_some_and(|v| !v.expose_secret().trim().is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Values with everything but a short prefix replaced, for display.
    pub fn masked(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), mask(v.expose_secret())))
            .collect()
    }

    /// Raw values, for the save request only.
    pub fn expose(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.expose_secret().to_owned()))
            .collect()
    }
}

fn mask(value: &str) -> String {
    let len = value.chars().count();
    match len {
        0 => String::new(),
        1..=8 => "*".repeat(len),
        _ => {
            let prefix: String = value.chars().take(3).collect();
            format!("{prefix}{}", "*".repeat(8))
        }
    }
}
