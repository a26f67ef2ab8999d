//! Parser for modpack presets exported by the Arma 3 launcher
//!
//! The export is an HTML table with one `<tr data-type="ModContainer">` row
//! per mod, holding a `DisplayName` cell and a Steam Workshop link ending in
//! `?id=<number>`. Rows without a workshop link (local mods) are skipped.

use crate::catalog::{Mod, ModList};
use crate::error::{Error, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

const ROW_MARKER: &str = r#"data-type="ModContainer""#;

#[allow(clippy::expect_used)]
static DISPLAY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<td data-type="DisplayName">([^<]*)</td>"#).expect("display name regex is valid")
});

#[allow(clippy::expect_used)]
static WORKSHOP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?id=(\d+)").expect("workshop id regex is valid"));

/// Parse an exported modpack document into a mod list, in document order
///
/// # Errors
///
/// Returns [`Error::CatalogParse`] if the document has no workshop mods, a
/// row lacks its display name, or an id appears twice.
pub fn parse_modpack(html: &str) -> Result<ModList> {
    let mut mods = Vec::new();

    for (row, block) in html.split(ROW_MARKER).skip(1).enumerate() {
        let Some(id) = WORKSHOP_ID.captures(block).map(|c| c[1].to_string()) else {
            let name = DISPLAY_NAME.captures(block).map(|c| c[1].to_string());
            warn!(row = row + 1, ?name, "skipping mod without a workshop id");
            continue;
        };

        let name = DISPLAY_NAME
            .captures(block)
            .map(|c| decode_entities(c[1].trim()))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                Error::CatalogParse(format!("mod row {} (id {}) has no display name", row + 1, id))
            })?;

        debug!(name = %name, id = %id, "found mod");
        mods.push(Mod::new(&name, id));
    }

    if mods.is_empty() {
        return Err(Error::CatalogParse(
            "no workshop mods found; is this an exported launcher preset?".to_string(),
        ));
    }

    ModList::new(mods)
}

/// Read and parse an exported modpack file
pub async fn load_modpack(path: &Path) -> Result<ModList> {
    let html = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::CatalogParse(format!("cannot read modpack {}: {}", path.display(), e))
    })?;
    parse_modpack(&html)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
