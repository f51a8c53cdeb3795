//! Parser for the line-oriented `pv_db` manifest format.
//!
//! ```text
//! # 1042 - Dreamy Theater
//! pv_1042.song_name=ドリーミーシアター
//! pv_1042.song_name_en=Dreamy Theater
//! ```
//!
//! A declaration disabled by a previous resolution carries [`REMOVAL_MARKER`]
//! in front of its key. An id whose declarations are all disabled is gone from
//! the manifest, even if its `# <id> - <title>` comment is still there.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::{debug, trace};

use crate::errors::ManifestError;
use crate::models::CatalogEntry;

/// Prefix written in front of a disabled declaration.
pub const REMOVAL_MARKER: &str = "#[pvmerge] ";

const MARKER_TAG: &str = "#[pvmerge]";

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^pv_(\d+)\.(.+)$").expect("static regex"))
}

fn comment_title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#\s*(\d+)\s*-\s*(.+)$").expect("static regex"))
}

/// Split a declaration key (`pv_<id>.<attribute>`) into id and attribute.
///
/// The `pv_` prefix is matched case-insensitively. Ids that do not fit in a
/// `u32` are rejected.
pub fn parse_declaration_key(key: &str) -> Option<(u32, &str)> {
    let caps = key_pattern().captures(key)?;
    let id = caps.get(1)?.as_str().parse().ok()?;
    let attribute = caps.get(2)?.as_str();
    Some((id, attribute))
}

/// Id declared by a manifest line, if the line is a declaration.
///
/// Blank lines, full-line comments and lines without `=` never declare
/// anything.
pub fn declaration_id(line: &str) -> Option<u32> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, _) = line.split_once('=')?;
    parse_declaration_key(key.trim()).map(|(id, _)| id)
}

/// Whether the line carries the removal marker.
pub fn is_marked(line: &str) -> bool {
    line.trim_start().starts_with(MARKER_TAG)
}

/// Remove the removal marker (repeated or not) from a line, keeping its
/// indentation. Unmarked lines come back unchanged.
pub fn strip_marker(line: &str) -> Cow<'_, str> {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];

    let mut rest = body;
    while let Some(after) = rest.strip_prefix(MARKER_TAG) {
        rest = after.strip_prefix(' ').unwrap_or(after);
    }
    if rest.len() == body.len() {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(format!("{indent}{rest}"))
    }
}

/// Id of a declaration disabled by the removal marker.
pub fn disabled_declaration_id(line: &str) -> Option<u32> {
    if !is_marked(line) {
        return None;
    }
    declaration_id(&strip_marker(line))
}

#[derive(Default)]
struct TitleFields {
    song_name: Option<String>,
    song_name_en: Option<String>,
    comment_title: Option<String>,
    live: bool,
    disabled: bool,
}

/// Parse manifest text into entries owned by `package`.
///
/// Entries come out in ascending id order. An id with neither `song_name`,
/// a `# <id> - <title>` comment nor `song_name_en` yields no entry, and
/// neither does an id whose every declaration is disabled.
pub fn parse_manifest_str(text: &str, package: &str, origin: &Path) -> Vec<CatalogEntry> {
    let mut fields: BTreeMap<u32, TitleFields> = BTreeMap::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(id) = disabled_declaration_id(line) {
            fields.entry(id).or_default().disabled = true;
            continue;
        }
        if let Some(caps) = comment_title_pattern().captures(line) {
            let id = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
            let title = caps.get(2).map(|m| m.as_str().trim().to_string());
            if let (Some(id), Some(title)) = (id, title) {
                fields.entry(id).or_default().comment_title = Some(title);
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let Some((id, attribute)) = parse_declaration_key(key.trim()) else {
            continue;
        };
        let value = value.trim().to_string();
        let f = fields.entry(id).or_default();
        f.live = true;
        match attribute.to_ascii_lowercase().as_str() {
            "song_name" => f.song_name = Some(value),
            "song_name_en" => f.song_name_en = Some(value),
            _ => {}
        }
    }

    let mut entries = Vec::with_capacity(fields.len());
    for (id, f) in fields {
        if f.disabled && !f.live {
            trace!(package, id, "skipping entry disabled by a previous resolution");
            continue;
        }
        let primary = f
            .song_name
            .filter(|s| !s.is_empty())
            .or(f.comment_title.filter(|s| !s.is_empty()));
        let secondary = f.song_name_en.filter(|s| !s.is_empty());
        let Some(title) = primary.or_else(|| secondary.clone()) else {
            trace!(package, id, "dropping entry without a title");
            continue;
        };
        entries.push(CatalogEntry::new(id, title, secondary, package, origin));
    }
    entries
}

/// Read and parse one manifest file.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn parse_manifest(path: &Path, package: &str) -> Result<Vec<CatalogEntry>, ManifestError> {
    let bytes = std::fs::read(path).map_err(|source| ManifestError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let entries = parse_manifest_str(&text, package, path);
    debug!(package, path = %path.display(), count = entries.len(), "parsed manifest");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<CatalogEntry> {
        parse_manifest_str(text, "modA", Path::new("/mods/modA/rom/mod_pv_db.txt"))
    }

    #[test]
    fn test_parse_declaration_key() {
        assert_eq!(parse_declaration_key("pv_42.song_name"), Some((42, "song_name")));
        assert_eq!(parse_declaration_key("PV_042.Song_Name_En"), Some((42, "Song_Name_En")));
        assert_eq!(parse_declaration_key("pv_.song_name"), None);
        assert_eq!(parse_declaration_key("pv_12"), None);
        assert_eq!(parse_declaration_key("xpv_12.song_name"), None);
        assert_eq!(parse_declaration_key("pv_99999999999.song_name"), None);
    }

    #[test]
    fn test_declaration_id() {
        assert_eq!(declaration_id("  pv_7.bpm = 120"), Some(7));
        assert_eq!(declaration_id("pv_7.song_name=a=b"), Some(7));
        assert_eq!(declaration_id("# pv_7.bpm = 120"), None);
        assert_eq!(declaration_id("pv_7.bpm"), None);
        assert_eq!(declaration_id("   "), None);
        assert_eq!(declaration_id("song_name = x"), None);
    }

    #[test]
    fn test_parse_basic_entry() {
        let entries = parse(
            "pv_1042.song_name=ドリーミーシアター\n\
             pv_1042.song_name_en= Dreamy Theater \n\
             pv_1042.bpm=140\n",
        );
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.id, 1042);
        assert_eq!(e.title, "ドリーミーシアター");
        assert_eq!(e.title_en.as_deref(), Some("Dreamy Theater"));
        assert_eq!(e.owner_package, "modA");
        assert_eq!(e.origin_label(), "mod:modA");
    }

    #[test]
    fn test_comment_title_is_fallback() {
        let entries = parse("# 12 - From Comment\npv_12.bpm=100\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "From Comment");
        assert_eq!(entries[0].title_en, None);

        let entries = parse("# 12 - From Comment\npv_12.song_name=Real\n");
        assert_eq!(entries[0].title, "Real");
    }

    #[test]
    fn test_localized_title_used_when_nothing_else() {
        let entries = parse("pv_3.song_name_en=Only English\n");
        assert_eq!(entries[0].title, "Only English");
        assert_eq!(entries[0].title_en.as_deref(), Some("Only English"));
    }

    #[test]
    fn test_untitled_entries_dropped() {
        let entries = parse("pv_5.bpm=100\npv_5.difficulty.easy.0.level=PV_LV_03_0\n");
        assert!(entries.is_empty());
    }

    #[test]
    fn test_skips_noise_and_sorts_by_id() {
        let entries = parse(
            "\n# just a comment\n\
             garbage line\n\
             other_1.song_name=nope\n\
             pv_20.SONG_NAME=Twenty\n\
             pv_3.song_name=Three\n",
        );
        let ids: Vec<u32> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 20]);
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("#[pvmerge] pv_1.song_name=A"), "pv_1.song_name=A");
        assert_eq!(strip_marker("  #[pvmerge] #[pvmerge] pv_1.x=A"), "  pv_1.x=A");
        assert_eq!(strip_marker("pv_1.song_name=A"), "pv_1.song_name=A");
        assert!(matches!(strip_marker("# plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_disabled_declaration_id() {
        assert_eq!(disabled_declaration_id("  #[pvmerge] pv_9.bpm=1"), Some(9));
        assert_eq!(disabled_declaration_id("pv_9.bpm=1"), None);
        assert_eq!(disabled_declaration_id("# 9 - Title"), None);
    }

    #[test]
    fn test_fully_disabled_id_is_not_an_entry() {
        let entries = parse(
            "# 5 - Shared Five
             #[pvmerge] pv_5.song_name=Five
             #[pvmerge] pv_5.song_name_en=Five
             pv_7.song_name=Seven
",
        );
        let ids: Vec<u32> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![7]);
    }

    #[test]
    fn test_partly_disabled_id_keeps_live_declarations() {
        let entries = parse(
            "# 5 - From Comment
             #[pvmerge] pv_5.song_name=Old
             pv_5.bpm=120
",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "From Comment");
    }

    #[test]
    fn test_parse_manifest_reads_lossy_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod_pv_db.txt");
        let mut bytes = b"pv_1.song_name=Ok\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        bytes.extend_from_slice(b"pv_2.song_name=Also ok\n");
        std::fs::write(&path, bytes).unwrap();

        let entries = parse_manifest(&path, "modA").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].origin_path, path);
    }

    #[test]
    fn test_parse_manifest_missing_file() {
        let result = parse_manifest(Path::new("/nonexistent/mod_pv_db.txt"), "modA");
        assert!(matches!(result, Err(ManifestError::ReadFailed { .. })));
    }
}
