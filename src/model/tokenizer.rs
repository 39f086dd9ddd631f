//! Trailing `@folder ` / `#tag ` detection for the note editor.
//!
//! A token commits once the user types whitespace right after the name, so a
//! half-typed `@wor` never fires. Only the end of the buffer is inspected.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static FOLDER_TRIGGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_-]+)\s$").expect("valid folder trigger regex"));
static TAG_TRIGGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z0-9_-]+)\s$").expect("valid tag trigger regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Folder,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    pub kind: TokenKind,
    /// Name as typed. Tags are lower-cased by the caller.
    pub name: String,
    /// Byte range of the trigger, sigil through trailing whitespace.
    pub span: Range<usize>,
}

impl TokenMatch {
    /// `text` with the trigger removed.
    pub fn strip_from(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() - self.span.len());
        out.push_str(&text[..self.span.start]);
        out.push_str(&text[self.span.end..]);
        out
    }
}

/// Find a committed trigger at the end of `text`. Folders are checked first;
/// at most one match is returned.
pub fn scan(text: &str) -> Option<TokenMatch> {
    if text.is_empty() {
        return None;
    }

    [
        (&*FOLDER_TRIGGER_RE, TokenKind::Folder),
        (&*TAG_TRIGGER_RE, TokenKind::Tag),
    ]
    .into_iter()
    .find_map(|(re, kind)| {
        let caps = re.captures(text)?;
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        Some(TokenMatch {
            kind,
            name: name.as_str().to_string(),
            span: whole.range(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_trigger_is_stripped() {
        let text = "Meeting notes @work ";
        let m = scan(text).unwrap();
        assert_eq!(m.kind, TokenKind::Folder);
        assert_eq!(m.name, "work");
        assert_eq!(m.strip_from(text), "Meeting notes ");
    }

    #[test]
    fn tag_trigger_is_stripped() {
        let text = "Buy milk #errand ";
        let m = scan(text).unwrap();
        assert_eq!(m.kind, TokenKind::Tag);
        assert_eq!(m.name, "errand");
        assert_eq!(m.strip_from(text), "Buy milk ");
    }

    #[test]
    fn newline_commits_a_token() {
        let m = scan("todo #Home\n").unwrap();
        assert_eq!(m.name, "Home");
        assert_eq!(m.strip_from("todo #Home\n"), "todo ");
    }

    #[test]
    fn unfinished_token_does_not_fire() {
        assert_eq!(scan("Meeting @wor"), None);
        assert_eq!(scan("Buy #err"), None);
        assert_eq!(scan(""), None);
        assert_eq!(scan("   "), None);
    }

    #[test]
    fn two_trailing_spaces_do_not_fire() {
        assert_eq!(scan("note @work  "), None);
    }

    #[test]
    fn characters_outside_the_name_set_block_the_match() {
        assert_eq!(scan("cost @work! "), None);
        assert_eq!(scan("#café "), None);
        assert_eq!(scan("@ "), None);
    }

    #[test]
    fn hyphen_and_underscore_are_part_of_the_name() {
        let m = scan("x @side-project_2 ").unwrap();
        assert_eq!(m.name, "side-project_2");
    }

    #[test]
    fn only_the_final_occurrence_is_removed() {
        let text = "@work then more @work ";
        let m = scan(text).unwrap();
        assert_eq!(m.strip_from(text), "@work then more ");
    }

    #[test]
    fn earlier_text_is_left_alone() {
        let text = "#keep this @work ";
        let m = scan(text).unwrap();
        assert_eq!(m.kind, TokenKind::Folder);
        assert_eq!(m.strip_from(text), "#keep this ");
    }

    #[test]
    fn multibyte_prefix_keeps_span_on_char_boundaries() {
        let text = "café ☕ #drinks ";
        let m = scan(text).unwrap();
        assert_eq!(m.strip_from(text), "café ☕ ");
    }
}
