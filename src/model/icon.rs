/// Icon assigned to folders created without an explicit choice.
pub const DEFAULT_ICON: &str = "folder";

/// Icon names a folder can carry, in cycling order.
pub const ICONS: &[&str] = &["folder", "work", "star", "book", "home", "code", "idea"];

pub fn glyph(icon: Option<&str>) -> &'static str {
    match icon.unwrap_or(DEFAULT_ICON) {
        "work" => "■",
        "star" => "★",
        "book" => "▤",
        "home" => "⌂",
        "code" => "‹›",
        "idea" => "✦",
        _ => "▸",
    }
}

/// The icon after `current` in [`ICONS`], wrapping around.
pub fn next_icon(current: Option<&str>) -> &'static str {
    let idx = current
        .and_then(|name| ICONS.iter().position(|icon| *icon == name))
        .map(|idx| (idx + 1) % ICONS.len())
        .unwrap_or(1);
    ICONS[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_icon_uses_default_glyph() {
        assert_eq!(glyph(Some("nope")), glyph(None));
    }

    #[test]
    fn cycling_wraps() {
        assert_eq!(next_icon(Some("folder")), "work");
        assert_eq!(next_icon(Some("idea")), "folder");
        assert_eq!(next_icon(None), "work");
    }
}
