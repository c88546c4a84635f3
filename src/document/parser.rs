//! Markdown parsing with comrak.
//!
//! Block structure is recognized line by line; inline runs come from comrak.
//! Every mapping is checked to serialize back to its source text, so
//! `serialize(&parse(s)) == s` for any input.

use std::sync::LazyLock;

use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options, parse_document};
use regex::Regex;

use super::types::{Element, ElementKind, InlineStyle, ListMarker, Node, TextRun};

static TASK_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]*)([-*+]) \[([ x])\] ").expect("valid regex")
});
static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)([-*+]) ").expect("valid regex"));
static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]*)([0-9]{1,9})([.)]) ").expect("valid regex")
});

/// Parse markdown source into a root element.
///
/// # Example
///
/// ```
/// use narkdown::document::{parse, serialize};
///
/// let root = parse("# Title\n\n- item");
/// assert_eq!(root.child_count(), 3);
/// assert_eq!(serialize(&root), "# Title\n\n- item");
/// ```
pub fn parse(source: &str) -> Element {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if let Some((block, consumed)) = parse_code_block(&lines[i..]) {
            blocks.push(block);
            i += consumed;
            continue;
        }
        if let Some((block, consumed)) = parse_table(&lines[i..]) {
            blocks.push(block);
            i += consumed;
            continue;
        }
        blocks.push(parse_line(lines[i]));
        i += 1;
    }
    Element::with_children(ElementKind::Root, blocks.into_iter().map(Node::Element).collect())
}

/// Serialize a root element back to markdown. Blocks are joined with `\n`.
pub fn serialize(root: &Element) -> String {
    root.children()
        .iter()
        .filter_map(Node::as_element)
        .map(serialize_block)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse one line of inline markdown into styled runs.
///
/// Lines comrak would reshape (escapes, entities, links, `_` emphasis,
/// surrounding whitespace) become a single plain run.
pub fn parse_inline(text: &str) -> Vec<TextRun> {
    if text.is_empty() {
        return Vec::new();
    }
    if !text.contains(['*', '`']) {
        return vec![TextRun::plain(text)];
    }
    let arena = Arena::new();
    let root = parse_document(&arena, text, &Options::default());
    let runs = root
        .first_child()
        .filter(|p| {
            matches!(p.data.borrow().value, NodeValue::Paragraph) && p.next_sibling().is_none()
        })
        .and_then(|paragraph| {
            let mut runs = Vec::new();
            for child in paragraph.children() {
                collect_runs(child, InlineStyle::PLAIN, &mut runs)?;
            }
            Some(merge_runs(runs))
        });
    match runs {
        Some(runs) if serialize_inline(&runs) == text => runs,
        _ => vec![TextRun::plain(text)],
    }
}

/// Serialize runs with `**`, `*` and backtick markers.
pub fn serialize_inline<'a>(runs: impl IntoIterator<Item = &'a TextRun>) -> String {
    let mut out = String::new();
    for run in runs {
        let style = run.style();
        let open = format!(
            "{}{}{}",
            if style.bold { "**" } else { "" },
            if style.italic { "*" } else { "" },
            if style.code { "`" } else { "" },
        );
        let close: String = open.chars().rev().collect();
        out.push_str(&open);
        out.push_str(run.data());
        out.push_str(&close);
    }
    out
}

fn collect_runs<'a>(node: &'a AstNode<'a>, style: InlineStyle, runs: &mut Vec<TextRun>) -> Option<()> {
    match &node.data.borrow().value {
        NodeValue::Text(t) => runs.push(TextRun::new(t.clone(), style)),
        NodeValue::Code(code) => {
            let mut code_style = style;
            code_style.code = true;
            runs.push(TextRun::new(code.literal.clone(), code_style));
        }
        NodeValue::Emph => {
            let mut next = style;
            next.italic = true;
            for child in node.children() {
                collect_runs(child, next, runs)?;
            }
        }
        NodeValue::Strong => {
            let mut next = style;
            next.bold = true;
            for child in node.children() {
                collect_runs(child, next, runs)?;
            }
        }
        _ => return None,
    }
    Some(())
}

fn merge_runs(runs: Vec<TextRun>) -> Vec<TextRun> {
    let block = Element::text_block(ElementKind::Paragraph, runs);
    block.runs().cloned().collect()
}

fn text_block(kind: ElementKind, content: &str) -> Element {
    Element::text_block(kind, parse_inline(content))
}

fn parse_line(line: &str) -> Element {
    if is_horizontal_rule(line) {
        return Element::new(ElementKind::HorizontalLine {
            marker: line.to_string(),
        });
    }
    if let Some((level, content)) = heading(line) {
        return text_block(ElementKind::Heading(level), content);
    }
    if let Some(caps) = TASK_ITEM.captures(line) {
        let marker = ListMarker::Task {
            indent: caps[1].to_string(),
            symbol: caps[2].chars().next().unwrap_or('-'),
            checked: &caps[3] == "x",
        };
        return text_block(ElementKind::ListItem(marker), &line[caps[0].len()..]);
    }
    if let Some(caps) = BULLET_ITEM.captures(line) {
        let marker = ListMarker::Bullet {
            indent: caps[1].to_string(),
            symbol: caps[2].chars().next().unwrap_or('-'),
        };
        return text_block(ElementKind::ListItem(marker), &line[caps[0].len()..]);
    }
    if let Some(caps) = NUMBERED_ITEM.captures(line) {
        let marker = ListMarker::Numbered {
            indent: caps[1].to_string(),
            number: caps[2].to_string(),
            delimiter: caps[3].chars().next().unwrap_or('.'),
        };
        return text_block(ElementKind::ListItem(marker), &line[caps[0].len()..]);
    }
    if let Some(content) = line.strip_prefix("> ") {
        return text_block(ElementKind::BlockQuote, content);
    }
    text_block(ElementKind::Paragraph, line)
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let content = line[hashes..].strip_prefix(' ')?;
    u8::try_from(hashes).ok().map(|level| (level, content))
}

fn is_horizontal_rule(line: &str) -> bool {
    let trimmed = line.trim();
    let Some(first) = trimmed.chars().next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_')
        && trimmed.chars().filter(|c| *c == first).count() >= 3
        && trimmed.chars().all(|c| c == first || c == ' ')
}

fn parse_code_block(lines: &[&str]) -> Option<(Element, usize)> {
    let language = lines.first()?.strip_prefix("```")?;
    if language.contains('`') {
        return None;
    }
    let close = lines.iter().skip(1).position(|l| *l == "```")? + 1;
    if close == 1 {
        return None;
    }
    let code = lines[1..close].join("\n");
    let block = Element::text_block(
        ElementKind::CodeBlock {
            language: language.to_string(),
        },
        vec![TextRun::plain(code)],
    );
    Some((block, close + 1))
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn is_delimiter_row(line: &str) -> bool {
    is_table_row(line)
        && line.contains('-')
        && line.trim().chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn split_cells(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    trimmed[1..trimmed.len() - 1].split('|').map(str::trim).collect()
}

fn parse_table(lines: &[&str]) -> Option<(Element, usize)> {
    let header = *lines.first()?;
    let delimiter = *lines.get(1)?;
    if !is_table_row(header) || !is_delimiter_row(delimiter) {
        return None;
    }
    let columns = split_cells(header).len();
    if split_cells(delimiter).len() != columns {
        return None;
    }
    let mut source_rows = vec![header];
    source_rows.extend(
        lines[2..]
            .iter()
            .take_while(|l| is_table_row(l) && split_cells(l).len() == columns)
            .copied(),
    );
    let rows: Vec<Node> = source_rows
        .iter()
        .map(|line| {
            let cells = split_cells(line)
                .into_iter()
                .map(|cell| Node::Element(text_block(ElementKind::TableCell, cell)))
                .collect();
            Node::Element(Element::with_children(ElementKind::TableRow, cells))
        })
        .collect();
    let table = Element::with_children(
        ElementKind::Table {
            delimiter: delimiter.to_string(),
        },
        rows,
    );
    let lossless = serialize_block(&table)
        .split('\n')
        .zip(lines)
        .all(|(rendered, source)| rendered == *source);
    lossless.then_some((table, source_rows.len() + 1))
}

fn serialize_row(row: &Element) -> String {
    let cells: Vec<String> = row
        .children()
        .iter()
        .filter_map(Node::as_element)
        .map(|cell| {
            let text = serialize_inline(cell.runs());
            if text.is_empty() {
                " ".to_string()
            } else {
                format!(" {text} ")
            }
        })
        .collect();
    format!("|{}|", cells.join("|"))
}

fn serialize_block(block: &Element) -> String {
    let inline = || serialize_inline(block.runs());
    match block.kind() {
        ElementKind::Heading(level) => {
            format!("{} {}", "#".repeat(usize::from(*level)), inline())
        }
        ElementKind::ListItem(marker) => format!("{}{}", marker.prefix(), inline()),
        ElementKind::BlockQuote => format!("> {}", inline()),
        ElementKind::CodeBlock { language } => format!("```{language}\n{}\n```", block.text()),
        ElementKind::HorizontalLine { marker } => marker.clone(),
        ElementKind::Table { delimiter } => {
            let mut rows = block.children().iter().filter_map(Node::as_element);
            let mut lines = Vec::new();
            if let Some(header) = rows.next() {
                lines.push(serialize_row(header));
            }
            lines.push(delimiter.clone());
            lines.extend(rows.map(serialize_row));
            lines.join("\n")
        }
        ElementKind::TableRow => serialize_row(block),
        ElementKind::Paragraph | ElementKind::TableCell | ElementKind::Root => inline(),
    }
}
