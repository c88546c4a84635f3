//! Task checkbox toggling.

use std::sync::LazyLock;

use regex::Regex;

static TASK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(- \[[ x]\])\s*(.*)").expect("valid regex"));

/// Flip `[ ]` and `[x]` on a task line. Other lines yield `None`.
///
/// The line is rebuilt as indent, box, one space, content.
pub fn toggle_task_line(line: &str) -> Option<String> {
    let caps = TASK_LINE.captures(line)?;
    let new_box = if caps[2].contains('x') { "- [ ]" } else { "- [x]" };
    Some(format!("{}{new_box} {}", &caps[1], &caps[3]))
}
