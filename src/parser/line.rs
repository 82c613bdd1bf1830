//! Line classification for checklist documents
//!
//! Every line of a document falls into exactly one [`LineKind`]. The parser
//! reduces the classified stream into sections and tasks; keeping the
//! classification in one place isolates the format's ambiguity into a single
//! tested unit.

/// The kind of a single document line
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind<'a> {
    /// `#`..`######` + space + text at column 0
    Heading { level: u8, title: &'a str },

    /// A checkbox task line, e.g. `- [ ] 1.2 Title`. The marker is case- and
    /// space-tolerant: `[ ]`, `[x]`, `[X]` and `[ x]` all match. `payload`
    /// is the trimmed text after the closing bracket.
    Checkbox { checked: bool, payload: &'a str },

    /// `_Requirements: a, b_` annotation; empty annotations yield no tags
    Requirements { tags: Vec<String> },

    /// An indented `- ` bullet, accumulated into the current task's
    /// description
    Bullet { text: &'a str },

    /// Whitespace-only line
    Blank,

    /// Anything else; ignored by the parser
    Other,
}

/// Classifies one raw line
pub fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();

    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    if indent == 0 && trimmed.starts_with('#') {
        if let Some(kind) = classify_heading(trimmed) {
            return kind;
        }
        return LineKind::Other;
    }

    if let Some(kind) = classify_checkbox(trimmed) {
        return kind;
    }

    if let Some(tags) = classify_requirements(trimmed) {
        return LineKind::Requirements { tags };
    }

    if indent > 0 && trimmed.starts_with('-') {
        let text = trimmed[1..].trim();
        return LineKind::Bullet { text };
    }

    LineKind::Other
}

fn classify_heading(trimmed: &str) -> Option<LineKind<'_>> {
    let level = trimmed.bytes().take_while(|b| *b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }

    let rest = &trimmed[level..];
    let title = rest.strip_prefix(' ')?.trim();
    if title.is_empty() {
        return None;
    }

    Some(LineKind::Heading {
        level: level as u8,
        title,
    })
}

fn classify_checkbox(trimmed: &str) -> Option<LineKind<'_>> {
    let inner_and_rest = trimmed.strip_prefix("- [")?;
    let close = inner_and_rest.find(']')?;
    let inner = &inner_and_rest[..close];

    // The marker is at most two characters of space/x/X.
    if inner.is_empty()
        || inner.len() > 2
        || !inner.chars().all(|c| c == ' ' || c == 'x' || c == 'X')
    {
        return None;
    }

    let checked = inner.chars().any(|c| c == 'x' || c == 'X');
    let payload = inner_and_rest[close + 1..].trim();

    Some(LineKind::Checkbox { checked, payload })
}

fn classify_requirements(trimmed: &str) -> Option<Vec<String>> {
    let rest = trimmed.strip_prefix("_Requirements:")?;
    let inner = rest.strip_suffix('_')?;

    Some(
        inner
            .split(',')
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect(),
    )
}

/// Splits a checkbox payload into an optional id token and the title
///
/// The id is the text before the first whitespace split. A payload with no
/// such split (a single-word task) is all title: the parser captures no id
/// and validation reports it, rather than silently corrupting ids.
pub fn split_task_payload(payload: &str) -> (Option<&str>, &str) {
    match payload.split_once(char::is_whitespace) {
        Some((id, rest)) => (Some(id), rest.trim_start()),
        None if payload.is_empty() => (None, ""),
        None => (None, payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_headings() {
        assert_eq!(
            classify("# Top"),
            LineKind::Heading {
                level: 1,
                title: "Top"
            }
        );
        assert_eq!(
            classify("###### Deep"),
            LineKind::Heading {
                level: 6,
                title: "Deep"
            }
        );
    }

    #[test]
    fn rejects_malformed_headings() {
        // Seven hashes, no space, and empty title are not headings
        assert_eq!(classify("####### Too deep"), LineKind::Other);
        assert_eq!(classify("#NoSpace"), LineKind::Other);
        assert_eq!(classify("## "), LineKind::Other);
        // Indented hash is not a heading
        assert_eq!(classify("  # Indented"), LineKind::Other);
    }

    #[test]
    fn classifies_checkboxes() {
        assert_eq!(
            classify("- [ ] 1.1 Set up"),
            LineKind::Checkbox {
                checked: false,
                payload: "1.1 Set up"
            }
        );
        assert_eq!(
            classify("- [x] 1.2 Done"),
            LineKind::Checkbox {
                checked: true,
                payload: "1.2 Done"
            }
        );
        assert_eq!(
            classify("- [X] 1.3 Also done"),
            LineKind::Checkbox {
                checked: true,
                payload: "1.3 Also done"
            }
        );
        assert_eq!(
            classify("- [ x] 1.4 Space tolerant"),
            LineKind::Checkbox {
                checked: true,
                payload: "1.4 Space tolerant"
            }
        );
    }

    #[test]
    fn rejects_malformed_checkboxes() {
        assert_eq!(classify("- [y] 1.1 Bad marker"), LineKind::Other);
        assert_eq!(classify("- [] 1.1 Empty marker"), LineKind::Other);
        assert_eq!(classify("- [xxx] 1.1 Too wide"), LineKind::Other);
        assert_eq!(classify("- [ 1.1 Unclosed"), LineKind::Other);
    }

    #[test]
    fn classifies_requirements() {
        assert_eq!(
            classify("_Requirements: 2.1, 3.4_"),
            LineKind::Requirements {
                tags: vec!["2.1".to_string(), "3.4".to_string()]
            }
        );
        assert_eq!(
            classify("  _Requirements: auth_"),
            LineKind::Requirements {
                tags: vec!["auth".to_string()]
            }
        );
    }

    #[test]
    fn empty_requirements_yield_no_tags() {
        assert_eq!(
            classify("_Requirements: _"),
            LineKind::Requirements { tags: vec![] }
        );
        assert_eq!(
            classify("_Requirements:_"),
            LineKind::Requirements { tags: vec![] }
        );
    }

    #[test]
    fn classifies_bullets() {
        assert_eq!(
            classify("  - a description line"),
            LineKind::Bullet {
                text: "a description line"
            }
        );
        // Unindented dashes that are not checkboxes are ignored
        assert_eq!(classify("- plain dash"), LineKind::Other);
    }

    #[test]
    fn classifies_blank_and_other() {
        assert_eq!(classify(""), LineKind::Blank);
        assert_eq!(classify("   "), LineKind::Blank);
        assert_eq!(classify("prose paragraph"), LineKind::Other);
    }

    #[test]
    fn splits_payload_into_id_and_title() {
        assert_eq!(split_task_payload("1.1 Set up"), (Some("1.1"), "Set up"));
        assert_eq!(
            split_task_payload("setup Install the toolchain"),
            (Some("setup"), "Install the toolchain")
        );
    }

    #[test]
    fn single_word_payload_is_all_title() {
        assert_eq!(split_task_payload("Refactor"), (None, "Refactor"));
        assert_eq!(split_task_payload(""), (None, ""));
    }
}
