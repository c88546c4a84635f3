//! Core document types.

/// Inline formatting carried by a text run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

impl InlineStyle {
    pub const PLAIN: Self = Self {
        bold: false,
        italic: false,
        code: false,
    };

    pub const fn is_plain(self) -> bool {
        !self.bold && !self.italic && !self.code
    }
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    data: String,
    style: InlineStyle,
}

impl TextRun {
    pub fn new(data: impl Into<String>, style: InlineStyle) -> Self {
        Self {
            data: data.into(),
            style,
        }
    }

    pub fn plain(data: impl Into<String>) -> Self {
        Self::new(data, InlineStyle::PLAIN)
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub const fn style(&self) -> InlineStyle {
        self.style
    }

    /// Length in characters (the unit of model offsets).
    pub fn char_len(&self) -> usize {
        self.data.chars().count()
    }

    pub(crate) fn data_mut(&mut self) -> &mut String {
        &mut self.data
    }
}

/// List item flavour, kept verbatim so serialization reproduces the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListMarker {
    Bullet {
        indent: String,
        symbol: char,
    },
    Numbered {
        indent: String,
        number: String,
        delimiter: char,
    },
    Task {
        indent: String,
        symbol: char,
        checked: bool,
    },
}

impl ListMarker {
    pub fn bullet() -> Self {
        Self::Bullet {
            indent: String::new(),
            symbol: '-',
        }
    }

    pub fn numbered() -> Self {
        Self::Numbered {
            indent: String::new(),
            number: "1".to_string(),
            delimiter: '.',
        }
    }

    pub fn task() -> Self {
        Self::Task {
            indent: String::new(),
            symbol: '-',
            checked: false,
        }
    }

    /// The marker a new item continuing this list gets (Enter at item end).
    pub fn continuation(&self) -> Self {
        match self {
            Self::Bullet { .. } => self.clone(),
            Self::Numbered {
                indent,
                number,
                delimiter,
            } => Self::Numbered {
                indent: indent.clone(),
                number: number
                    .parse::<u64>()
                    .map_or_else(|_| number.clone(), |n| (n + 1).to_string()),
                delimiter: *delimiter,
            },
            Self::Task { indent, symbol, .. } => Self::Task {
                indent: indent.clone(),
                symbol: *symbol,
                checked: false,
            },
        }
    }

    pub fn prefix(&self) -> String {
        match self {
            Self::Bullet { indent, symbol } => format!("{indent}{symbol} "),
            Self::Numbered {
                indent,
                number,
                delimiter,
            } => format!("{indent}{number}{delimiter} "),
            Self::Task {
                indent,
                symbol,
                checked,
            } => format!("{indent}{symbol} [{}] ", if *checked { 'x' } else { ' ' }),
        }
    }
}

/// Element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Root,
    Paragraph,
    /// Heading with level (1-6)
    Heading(u8),
    ListItem(ListMarker),
    BlockQuote,
    CodeBlock {
        language: String,
    },
    HorizontalLine {
        marker: String,
    },
    Table {
        delimiter: String,
    },
    TableRow,
    TableCell,
}

impl ElementKind {
    /// Elements whose children are text runs only.
    pub const fn is_text_block(&self) -> bool {
        matches!(
            self,
            Self::Paragraph
                | Self::Heading(_)
                | Self::ListItem(_)
                | Self::BlockQuote
                | Self::CodeBlock { .. }
                | Self::TableCell
        )
    }

    /// Text blocks in which slash commands are recognized.
    pub const fn accepts_commands(&self) -> bool {
        self.is_text_block() && !matches!(self, Self::CodeBlock { .. })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Paragraph => "paragraph",
            Self::Heading(_) => "heading",
            Self::ListItem(_) => "listItem",
            Self::BlockQuote => "blockQuote",
            Self::CodeBlock { .. } => "codeBlock",
            Self::HorizontalLine { .. } => "horizontalLine",
            Self::Table { .. } => "table",
            Self::TableRow => "tableRow",
            Self::TableCell => "tableCell",
        }
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(TextRun),
}

impl Node {
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            Self::Text(_) => None,
        }
    }

    pub const fn as_text(&self) -> Option<&TextRun> {
        match self {
            Self::Text(t) => Some(t),
            Self::Element(_) => None,
        }
    }
}

/// Borrowed view of a node addressed by path, including the root.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Element(&'a Element),
    Text(&'a TextRun),
}

/// An element and its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    kind: ElementKind,
    children: Vec<Node>,
}

impl Element {
    pub const fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: ElementKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    /// A text block holding `runs`.
    pub fn text_block(kind: ElementKind, runs: Vec<TextRun>) -> Self {
        let mut element = Self::with_children(kind, runs.into_iter().map(Node::Text).collect());
        element.normalize_runs();
        element
    }

    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: ElementKind) {
        self.kind = kind;
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub(crate) const fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Node at `path` below this element; the empty path is the element itself.
    pub fn node(&self, path: &[usize]) -> Option<NodeRef<'_>> {
        let Some((first, rest)) = path.split_first() else {
            return Some(NodeRef::Element(self));
        };
        match self.children.get(*first)? {
            Node::Element(child) => child.node(rest),
            Node::Text(run) if rest.is_empty() => Some(NodeRef::Text(run)),
            Node::Text(_) => None,
        }
    }

    pub fn element(&self, path: &[usize]) -> Option<&Self> {
        match self.node(path)? {
            NodeRef::Element(e) => Some(e),
            NodeRef::Text(_) => None,
        }
    }

    pub(crate) fn element_mut(&mut self, path: &[usize]) -> Option<&mut Self> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self.children.get_mut(*first)? {
            Node::Element(child) => child.element_mut(rest),
            Node::Text(_) => None,
        }
    }

    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.children.iter().filter_map(Node::as_text)
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.runs().map(TextRun::data).collect()
    }

    /// Length of [`Self::text`] in characters.
    pub fn text_len(&self) -> usize {
        self.runs().map(TextRun::char_len).sum()
    }

    pub fn is_empty_text_block(&self) -> bool {
        self.kind.is_text_block() && self.text_len() == 0
    }

    /// Style of the character before `offset`, or of the first run at 0.
    pub fn style_at(&self, offset: usize) -> InlineStyle {
        let mut acc = 0;
        let mut last = InlineStyle::PLAIN;
        for run in self.runs() {
            let len = run.char_len();
            if offset > acc && offset <= acc + len {
                return run.style();
            }
            if offset == 0 {
                return run.style();
            }
            acc += len;
            last = run.style();
        }
        last
    }

    /// Insert `text` with `style` at character `offset`.
    pub(crate) fn insert_text(&mut self, offset: usize, text: &str, style: InlineStyle) {
        if text.is_empty() {
            return;
        }
        let mut tail = self.split_off(offset);
        self.children.push(Node::Text(TextRun::new(text, style)));
        self.children.append(&mut tail);
        self.normalize_runs();
    }

    /// Remove characters in `start..end`.
    pub(crate) fn remove_text(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut tail = self.split_off(end);
        let _removed = self.split_off(start);
        self.children.append(&mut tail);
        self.normalize_runs();
    }

    /// Split the text runs at `offset`, returning everything after it.
    pub(crate) fn split_off(&mut self, offset: usize) -> Vec<Node> {
        let mut acc = 0;
        let mut index = self.children.len();
        let mut cut: Option<(usize, usize)> = None;
        for (i, child) in self.children.iter().enumerate() {
            let len = child.as_text().map_or(0, TextRun::char_len);
            if offset <= acc {
                index = i;
                break;
            }
            if offset < acc + len {
                cut = Some((i, offset - acc));
                index = i + 1;
                break;
            }
            acc += len;
        }
        let mut tail = self.children.split_off(index);
        if let Some((i, at)) = cut
            && let Some(Node::Text(run)) = self.children.get_mut(i)
        {
            let byte = char_to_byte(run.data(), at);
            let rest = run.data_mut().split_off(byte);
            tail.insert(0, Node::Text(TextRun::new(rest, run.style())));
        }
        tail
    }

    /// Merge adjacent runs with equal styles and drop empty runs.
    pub(crate) fn normalize_runs(&mut self) {
        let mut merged: Vec<Node> = Vec::with_capacity(self.children.len());
        for child in self.children.drain(..) {
            match child {
                Node::Text(run) if run.data().is_empty() => {}
                Node::Text(run) => {
                    if let Some(Node::Text(prev)) = merged.last_mut()
                        && prev.style() == run.style()
                    {
                        prev.data_mut().push_str(run.data());
                        continue;
                    }
                    merged.push(Node::Text(run));
                }
                element @ Node::Element(_) => merged.push(element),
            }
        }
        self.children = merged;
    }
}

/// Byte index of the `chars`-th character of `s` (clamped to the end).
pub(crate) fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> InlineStyle {
        InlineStyle {
            bold: true,
            ..InlineStyle::PLAIN
        }
    }

    fn paragraph(runs: Vec<TextRun>) -> Element {
        Element::text_block(ElementKind::Paragraph, runs)
    }

    #[test]
    fn test_text_concatenates_runs() {
        let p = paragraph(vec![TextRun::plain("Hello "), TextRun::new("world", bold())]);
        assert_eq!(p.text(), "Hello world");
        assert_eq!(p.text_len(), 11);
    }

    #[test]
    fn test_text_block_merges_equal_styles() {
        let p = paragraph(vec![TextRun::plain("a"), TextRun::plain("b"), TextRun::plain("")]);
        assert_eq!(p.child_count(), 1);
        assert_eq!(p.text(), "ab");
    }

    #[test]
    fn test_insert_text_inside_styled_run_splits_it() {
        let mut p = paragraph(vec![TextRun::new("bold", bold())]);
        p.insert_text(2, "XY", InlineStyle::PLAIN);
        assert_eq!(p.text(), "boXYld");
        assert_eq!(p.child_count(), 3);
    }

    #[test]
    fn test_insert_text_with_same_style_merges() {
        let mut p = paragraph(vec![TextRun::plain("helo")]);
        p.insert_text(3, "l", InlineStyle::PLAIN);
        assert_eq!(p.text(), "hello");
        assert_eq!(p.child_count(), 1);
    }

    #[test]
    fn test_remove_text_across_runs() {
        let mut p = paragraph(vec![TextRun::plain("ab"), TextRun::new("cd", bold()), TextRun::plain("ef")]);
        p.remove_text(1, 5);
        assert_eq!(p.text(), "af");
        assert_eq!(p.child_count(), 1);
    }

    #[test]
    fn test_split_off_multibyte() {
        let mut p = paragraph(vec![TextRun::plain("café/x")]);
        let tail = p.split_off(4);
        assert_eq!(p.text(), "café");
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].as_text().unwrap().data(), "/x");
    }

    #[test]
    fn test_style_at_uses_preceding_character() {
        let p = paragraph(vec![TextRun::new("ab", bold()), TextRun::plain("cd")]);
        assert_eq!(p.style_at(0), bold());
        assert_eq!(p.style_at(2), bold());
        assert_eq!(p.style_at(3), InlineStyle::PLAIN);
    }

    #[test]
    fn test_node_paths() {
        let root = Element::with_children(
            ElementKind::Root,
            vec![Node::Element(paragraph(vec![TextRun::plain("x")]))],
        );
        assert!(matches!(root.node(&[]), Some(NodeRef::Element(_))));
        assert!(matches!(root.node(&[0, 0]), Some(NodeRef::Text(_))));
        assert!(root.node(&[0, 0, 0]).is_none());
        assert!(root.node(&[1]).is_none());
    }

    #[test]
    fn test_numbered_continuation_increments() {
        let marker = ListMarker::Numbered {
            indent: "  ".to_string(),
            number: "3".to_string(),
            delimiter: ')',
        };
        assert_eq!(marker.continuation().prefix(), "  4) ");
    }

    #[test]
    fn test_task_continuation_is_unchecked() {
        let marker = ListMarker::Task {
            indent: String::new(),
            symbol: '-',
            checked: true,
        };
        assert_eq!(marker.continuation().prefix(), "- [ ] ");
    }
}
