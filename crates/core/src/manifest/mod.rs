//! Manifest adapter: finding `mod_pv_db.txt` files and turning them into
//! [`CatalogEntry`](crate::models::CatalogEntry) values.
//!
//! The declaration-key grammar lives in [`parser`] and is shared with the
//! resolution executor, so both sides agree on which line declares which id and which
//! declarations are disabled.

pub mod discovery;
pub mod parser;

pub use discovery::{discover_manifests, DiscoveredManifest, ManifestLayout};
pub use parser::{
    declaration_id, disabled_declaration_id, parse_declaration_key, parse_manifest,
    parse_manifest_str, strip_marker, REMOVAL_MARKER,
};
