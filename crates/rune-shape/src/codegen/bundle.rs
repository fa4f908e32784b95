use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Result, ShapeError};

use super::{BEHAVIOR_JS, GeneratedInterface, INDEX_HTML, MANIFEST_JSON, STYLES_CSS};

/// Name of the integrity listing written next to the bundle files.
pub const TOC_FILE: &str = "BUNDLE.TOC.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub sha256: String,
    pub size: u64,
}

/// `file name -> digest` for every written artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleToc {
    pub entries: BTreeMap<String, BundleEntry>,
}

impl GeneratedInterface {
    /// The named text artifacts, manifest last when present.
    pub fn files(&self) -> Result<Vec<(&'static str, String)>> {
        let mut files = vec![
            (INDEX_HTML, self.markup.clone()),
            (STYLES_CSS, self.styles.clone()),
            (BEHAVIOR_JS, self.behavior.clone()),
        ];
        if let Some(manifest) = &self.manifest {
            let json = serde_json::to_string_pretty(manifest).map_err(|source| {
                ShapeError::Serialize {
                    what: "manifest",
                    source,
                }
            })?;
            files.push((MANIFEST_JSON, json));
        }
        Ok(files)
    }

    /// Writes every artifact into `dir` (created if missing) plus [`TOC_FILE`].
    pub fn write_bundle(&self, dir: &Path) -> Result<BundleToc> {
        std::fs::create_dir_all(dir)?;
        let mut toc = BundleToc::default();
        for (name, contents) in self.files()? {
            std::fs::write(dir.join(name), contents.as_bytes())?;
            toc.entries.insert(
                name.to_string(),
                BundleEntry {
                    sha256: sha256_hex(contents.as_bytes()),
                    size: contents.len() as u64,
                },
            );
        }
        let listing = serde_json::to_string_pretty(&toc).map_err(|source| ShapeError::Serialize {
            what: "bundle table of contents",
            source,
        })?;
        std::fs::write(dir.join(TOC_FILE), listing)?;
        info!(dir = %dir.display(), files = toc.entries.len(), "wrote interface bundle");
        Ok(toc)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{GenerateOptions, generate};
    use crate::layout::Layout;

    #[test]
    fn bundle_lists_every_file_with_digest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let options = GenerateOptions {
            manifest: true,
            ..GenerateOptions::default()
        };
        let interface = generate(&Layout::default(), &options).value;
        let toc = interface.write_bundle(temp.path()).expect("bundle");
        assert_eq!(toc.entries.len(), 4);
        for name in [INDEX_HTML, STYLES_CSS, BEHAVIOR_JS, MANIFEST_JSON] {
            let bytes = std::fs::read(temp.path().join(name)).expect("written file");
            assert_eq!(toc.entries[name].sha256, sha256_hex(&bytes));
            assert_eq!(toc.entries[name].size, bytes.len() as u64);
        }
        assert!(temp.path().join(TOC_FILE).exists());
    }

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
