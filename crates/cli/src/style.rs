//! Terminal styling for pvmerge reports.
//!
//! Status lines lead with a colored symbol. Package names are green when they
//! won a conflict and red when they lost one.

use console::Style;

fn marked(symbol: &str, style: Style, msg: &str) -> String {
    format!("{} {}", style.apply_to(symbol), msg)
}

/// A finished step, e.g. "Restored 2 manifest(s)".
pub fn success(msg: &str) -> String {
    marked("✓", Style::new().green(), msg)
}

/// A package that failed to resolve.
pub fn error(msg: &str) -> String {
    marked("✗", Style::new().red(), msg)
}

/// Nothing happened that the user may have expected (dry run, no backups).
pub fn warn(msg: &str) -> String {
    marked("⚠", Style::new().yellow(), msg)
}

/// Section title above a table.
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Secondary detail: paths, ignored packages, inactive outcomes.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

pub fn winner(name: &str) -> String {
    Style::new().green().bold().apply_to(name).to_string()
}

pub fn loser(name: &str) -> String {
    Style::new().red().apply_to(name).to_string()
}

/// Ids as `5, 20, 31`; `-` when there are none.
pub fn id_list(ids: &[u32]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_list() {
        assert_eq!(id_list(&[5, 20, 31]), "5, 20, 31");
        assert_eq!(id_list(&[]), "-");
    }

    #[test]
    fn test_status_lines_keep_message() {
        console::set_colors_enabled(false);
        assert_eq!(success("done"), "✓ done");
        assert_eq!(error("modB: boom"), "✗ modB: boom");
        assert_eq!(warn("dry run"), "⚠ dry run");
    }
}
