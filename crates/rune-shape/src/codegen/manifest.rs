use serde::{Deserialize, Serialize};

const SHORT_NAME_MAX_CHARS: usize = 12;
const BACKGROUND_COLOR: &str = "#ffffff";
const THEME_COLOR: &str = "#1f2937";

/// Installable-app descriptor written as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppManifest {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub start_url: String,
    pub display: String,
    pub background_color: String,
    pub theme_color: String,
    pub icons: Vec<ManifestIcon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestIcon {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Static descriptor derived only from the page title.
pub fn build_manifest(title: &str) -> AppManifest {
    let name = match title.trim() {
        "" => "Generated Interface".to_string(),
        trimmed => trimmed.to_string(),
    };
    let short_name: String = name.chars().take(SHORT_NAME_MAX_CHARS).collect();
    AppManifest {
        description: format!("{name} (generated interface)"),
        short_name: short_name.trim_end().to_string(),
        start_url: "./index.html".to_string(),
        display: "standalone".to_string(),
        background_color: BACKGROUND_COLOR.to_string(),
        theme_color: THEME_COLOR.to_string(),
        icons: [192u32, 512]
            .into_iter()
            .map(|size| ManifestIcon {
                src: format!("icons/icon-{size}.png"),
                sizes: format!("{size}x{size}"),
                mime_type: "image/png".to_string(),
            })
            .collect(),
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_is_bounded() {
        let manifest = build_manifest("Desktop Pet Control Center");
        assert_eq!(manifest.short_name, "Desktop Pet");
        assert_eq!(manifest.icons.len(), 2);
        let json = serde_json::to_value(&manifest).expect("serialize");
        assert_eq!(json["icons"][0]["type"], "image/png");
        assert_eq!(json["start_url"], "./index.html");
    }

    #[test]
    fn blank_title_gets_a_name() {
        assert_eq!(build_manifest("  ").name, "Generated Interface");
    }
}
