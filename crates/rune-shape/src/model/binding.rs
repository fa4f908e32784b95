use std::fmt;

use serde::{Deserialize, Serialize};

const PREFIX: &str = "function:";

/// Behavior reference attached to a shape.
///
/// Serialized as the namespaced string form (`function:renderProperties`). Names outside
/// the known set are kept verbatim in [`FunctionBinding::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FunctionBinding {
    RenderProperties,
    ShowStatus,
    SaveState,
    LoadState,
    Custom(String),
}

impl FunctionBinding {
    pub const KNOWN: [FunctionBinding; 4] = [
        FunctionBinding::RenderProperties,
        FunctionBinding::ShowStatus,
        FunctionBinding::SaveState,
        FunctionBinding::LoadState,
    ];

    /// Parses a raw binding. Accepts both `function:name` and bare `name`. Returns `None`
    /// for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let name = trimmed.strip_prefix(PREFIX).unwrap_or(trimmed);
        if name.is_empty() {
            return None;
        }
        let known = match name {
            "renderProperties" => FunctionBinding::RenderProperties,
            "showStatus" => FunctionBinding::ShowStatus,
            "saveState" => FunctionBinding::SaveState,
            "loadState" => FunctionBinding::LoadState,
            _ => return Some(FunctionBinding::Custom(trimmed.to_string())),
        };
        Some(known)
    }

    /// Keyword inference over free text or class names. Only the fixed vocabulary
    /// (properties, status, save, load) is recognized.
    pub fn from_keywords(haystack: &str) -> Option<Self> {
        let lower = haystack.to_ascii_lowercase();
        if lower.contains("properties") {
            Some(FunctionBinding::RenderProperties)
        } else if lower.contains("status") {
            Some(FunctionBinding::ShowStatus)
        } else if lower.contains("save") {
            Some(FunctionBinding::SaveState)
        } else if lower.contains("load") {
            Some(FunctionBinding::LoadState)
        } else {
            None
        }
    }

    /// Handler name used by the generated dispatcher.
    pub fn name(&self) -> &str {
        match self {
            FunctionBinding::RenderProperties => "renderProperties",
            FunctionBinding::ShowStatus => "showStatus",
            FunctionBinding::SaveState => "saveState",
            FunctionBinding::LoadState => "loadState",
            FunctionBinding::Custom(raw) => raw.strip_prefix(PREFIX).unwrap_or(raw),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FunctionBinding::Custom(_))
    }

    /// Canonical namespaced form.
    pub fn qualified(&self) -> String {
        match self {
            FunctionBinding::Custom(raw) => raw.clone(),
            known => format!("{PREFIX}{}", known.name()),
        }
    }
}

impl fmt::Display for FunctionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

impl TryFrom<String> for FunctionBinding {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FunctionBinding::parse(&value).ok_or_else(|| "function binding must not be empty".to_string())
    }
}

impl From<FunctionBinding> for String {
    fn from(value: FunctionBinding) -> Self {
        value.qualified()
    }
}
