// ── Bot configuration: deep merge, path access, trait text ──
//
// The server hands back whatever is in the bot's YAML file, which may be
// missing whole sections. Everything the console edits is declared in a
// default template, and every fetched config is merged over that template
// so the editable fields always exist.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::CoreError;

// ── Deep merge ───────────────────────────────────────────────────────

/// Recursively merge `partial` over `template`, returning a new value.
///
/// - Nested objects in `partial` merge field-by-field into the template's
///   object at the same key (or into an empty object if the template has
///   no such key or holds `null` there).
/// - Scalars, arrays, and `null` in `partial` overwrite outright; arrays
///   are never merged element-wise.
/// - Keys only in `template` are kept unchanged.
///
/// Neither input is modified and the result shares nothing with them.
///
/// A top-level `partial` of `null` is treated as an empty object. Any other
/// non-object at the top level, or an object landing on a template scalar,
/// is a [`CoreError::TypeMismatch`].
pub fn merge(template: &Value, partial: &Value) -> Result<Value, CoreError> {
    let Value::Object(template_map) = template else {
        return Err(mismatch("", "object", template));
    };
    match partial {
        Value::Object(partial_map) => Ok(Value::Object(merge_maps(
            template_map,
            partial_map,
            "",
        )?)),
        Value::Null => Ok(template.clone()),
        other => Err(mismatch("", "object", other)),
    }
}

fn merge_maps(
    template: &Map<String, Value>,
    partial: &Map<String, Value>,
    path: &str,
) -> Result<Map<String, Value>, CoreError> {
    let mut out = template.clone();
    for (key, incoming) in partial {
        let child_path = join_path(path, key);
        let merged = match incoming {
            Value::Object(incoming_map) => match template.get(key) {
                None | Some(Value::Null) => {
                    Value::Object(merge_maps(&Map::new(), incoming_map, &child_path)?)
                }
                Some(Value::Object(template_map)) => {
                    Value::Object(merge_maps(template_map, incoming_map, &child_path)?)
                }
                Some(scalar) => {
                    return Err(CoreError::TypeMismatch {
                        path: child_path,
                        expected: kind_of(scalar),
                        found: "object",
                    });
                }
            },
            other => other.clone(),
        };
        out.insert(key.clone(), merged);
    }
    Ok(out)
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// JSON type name for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &str, expected: &'static str, found: &Value) -> CoreError {
    CoreError::TypeMismatch {
        path: if path.is_empty() { "<root>".into() } else { path.into() },
        expected,
        found: kind_of(found),
    }
}

// ── Trait list <-> free text ─────────────────────────────────────────

/// Split free text into a trait list: newline- or semicolon-delimited,
/// each item trimmed, empty items dropped.
pub fn traits_from_text(text: &str) -> Vec<String> {
    text.split(['\n', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Render a trait list as one item per line, applying the same trim and
/// drop-empty normalization as [`traits_from_text`].
pub fn traits_to_text<S: AsRef<str>>(traits: &[S]) -> String {
    traits
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── BotConfig ────────────────────────────────────────────────────────

/// Path of the personality trait list inside the config.
pub const TRAITS_PATH: &str = "personality.character.traits";

/// The bot's nested configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotConfig(Value);

impl Default for BotConfig {
    fn default() -> Self {
        Self::template()
    }
}

impl BotConfig {
    /// Every field the console edits, with the values shown before the
    /// first load.
    pub fn template() -> Self {
        Self(json!({
            "bot": {
                "qq_number": "",
                "admin_qq": "",
                "target_group": ""
            },
            "personality": {
                "name": "",
                "nickname": "",
                "background": "",
                "appearance": {
                    "height": "",
                    "hair": "",
                    "features": "",
                    "aura": ""
                },
                "character": {
                    "core": "",
                    "traits": []
                },
                "speaking_style": {
                    "tone": "",
                    "manner": "",
                    "response": "",
                    "emoji_usage": ""
                }
            },
            "features": {
                "mention_reply": true,
                "keyword_reply": true,
                "name_reply": true,
                "smart_reply": true
            },
            "smart_reply": {
                "trigger_rate": 0.5
            },
            "ai": {
                "temperature": 0.7
            }
        }))
    }

    /// Wrap an arbitrary document. Must be an object.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        if value.is_object() {
            Ok(Self(value))
        } else {
            Err(mismatch("", "object", &value))
        }
    }

    /// Merge a server payload over this config (see [`merge`]).
    pub fn merged(&self, partial: &Value) -> Result<Self, CoreError> {
        merge(&self.0, partial).map(Self)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Look up a dotted path such as `bot.qq_number`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.0, |node, segment| node.as_object()?.get(segment))
    }

    /// Set a dotted path, creating intermediate objects (and replacing
    /// intermediate `null`s). Descending through a scalar or array is a
    /// [`CoreError::TypeMismatch`].
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<(), CoreError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(CoreError::InvalidPath { path: path.into() });
        }
        let Some((last, parents)) = segments.split_last() else {
            return Err(CoreError::InvalidPath { path: path.into() });
        };

        let mut node = &mut self.0;
        let mut walked = String::new();
        for segment in parents {
            walked = join_path(&walked, segment);
            let map = match node {
                Value::Object(map) => map,
                other => return Err(mismatch(&walked, "object", other)),
            };
            let child = map
                .entry((*segment).to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if child.is_null() {
                *child = Value::Object(Map::new());
            }
            if !child.is_object() {
                return Err(mismatch(&walked, "object", child));
            }
            node = child;
        }

        match node {
            Value::Object(map) => {
                map.insert((*last).to_owned(), value);
                Ok(())
            }
            other => Err(mismatch(&walked, "object", other)),
        }
    }

    /// Personality traits; non-string entries are skipped.
    pub fn traits(&self) -> Vec<String> {
        self.get_path(TRAITS_PATH)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn traits_text(&self) -> String {
        traits_to_text(&self.traits())
    }

    /// Replace the trait list from free text.
    pub fn set_traits_text(&mut self, text: &str) -> Result<(), CoreError> {
        let traits = traits_from_text(text)
            .into_iter()
            .map(Value::String)
            .collect();
        self.set_path(TRAITS_PATH, Value::Array(traits))
    }
}
