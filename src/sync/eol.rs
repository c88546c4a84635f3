//! Line-ending normalization at the document boundary.

/// Line-ending convention of the external document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Convention of `text`: CRLF when its first line break is `\r\n`.
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(i) if text[..i].ends_with('\r') => Self::CrLf,
            _ => Self::Lf,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Convert `\r\n`, `\r` and `\n` to `\n`.
pub fn normalize(text: &str) -> String {
    to_line_ending(text, LineEnding::Lf)
}

/// Convert every line break in `text` to `eol`.
pub fn to_line_ending(text: &str, eol: LineEnding) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push_str(eol.as_str());
            }
            '\n' => out.push_str(eol.as_str()),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_mixed_breaks() {
        assert_eq!(normalize("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn test_blank_lines_preserved() {
        assert_eq!(normalize("a\r\n\r\n\r\nb"), "a\n\n\nb");
        assert_eq!(to_line_ending("a\n\nb\n", LineEnding::CrLf), "a\r\n\r\nb\r\n");
    }

    #[test]
    fn test_detect() {
        assert_eq!(LineEnding::detect("a\r\nb"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a\nb\r\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("single line"), LineEnding::Lf);
    }

    proptest! {
        #[test]
        fn prop_round_trip_keeps_line_boundaries(
            lines in proptest::collection::vec("[a-z #*/-]{0,12}", 1..8),
            breaks in proptest::collection::vec(prop_oneof![Just("\n"), Just("\r\n")], 8),
            crlf in any::<bool>(),
        ) {
            let mut source = String::new();
            for (i, line) in lines.iter().enumerate() {
                if i > 0 {
                    source.push_str(breaks[i]);
                }
                source.push_str(line);
            }
            let eol = if crlf { LineEnding::CrLf } else { LineEnding::Lf };
            let internal = normalize(&source);
            prop_assert!(!internal.contains('\r'));
            let external = to_line_ending(&internal, eol);
            prop_assert_eq!(normalize(&external), internal.clone());
            let source_lines: Vec<&str> = internal.split('\n').collect();
            prop_assert_eq!(source_lines, lines.iter().map(String::as_str).collect::<Vec<_>>());
            prop_assert_eq!(external.matches(eol.as_str()).count(), lines.len() - 1);
        }
    }
}
