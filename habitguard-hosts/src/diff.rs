//! Unified diff preview for `habitguard diff`.

use similar::TextDiff;

/// Unified diff from `current` to `proposed`, or `None` when identical.
pub fn unified(current: &str, proposed: &str, label: &str) -> Option<String> {
    if current == proposed {
        return None;
    }
    let old_header = format!("a/{label}");
    let new_header = format!("b/{label}");
    Some(
        TextDiff::from_lines(current, proposed)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string(),
    )
}
