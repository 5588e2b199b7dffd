//! Lenient extraction of named tables from `Summary.htm` reports.
//!
//! The reports are not reliably well-formed (unescaped `<=` inside cells,
//! unclosed `<br>`), so they are tokenized with a tag regex rather than parsed
//! as XML. A table is "named" by the text of the nearest preceding `<h2>` or
//! `<p>` element.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Groups: `close` = "/" for end tags, `name` = tag name, `empty` = "/" for `<x/>`
    static ref TAG_RE: Regex = Regex::new(
        r"(?s)<!--.*?-->|<![^>]*>|<\?.*?\?>|<(?P<close>/?)(?P<name>[A-Za-z][A-Za-z0-9]*)(?:\s[^>]*?)?(?P<empty>/?)>"
    )
    .unwrap();
}

/// Table rows of flattened cell text, keyed by table name
pub type NamedTables = BTreeMap<String, Vec<Vec<String>>>;

#[derive(Default)]
struct TableBuilder {
    name: Option<String>,
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<String>,
}

impl TableBuilder {
    fn finish_cell(&mut self) {
        if let Some(cell) = self.cell.take() {
            self.row.get_or_insert_with(Vec::new).push(normalize(&cell));
        }
    }

    fn finish_row(&mut self) {
        self.finish_cell();
        if let Some(row) = self.row.take() {
            if !row.is_empty() {
                self.rows.push(row);
            }
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn push_text(text: &str, stack: &mut [TableBuilder], heading: &mut Option<String>) {
    let text = decode_entities(text);
    if let Some(cell) = stack.last_mut().and_then(|t| t.cell.as_mut()) {
        cell.push_str(&text);
    } else if let Some(h) = heading.as_mut() {
        h.push_str(&text);
    }
}

/// Collect every table preceded by an `<h2>` or `<p>` heading.
///
/// A later table with the same name replaces an earlier one.
#[must_use]
pub fn extract_named_tables(document: &str) -> NamedTables {
    let mut tables = NamedTables::new();
    let mut stack: Vec<TableBuilder> = Vec::new();
    let mut heading: Option<String> = None;
    let mut last_heading: Option<String> = None;

    let mut cursor = 0;
    for caps in TAG_RE.captures_iter(document) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&document[cursor..whole.start()], &mut stack, &mut heading);
        cursor = whole.end();

        let Some(name) = caps.name("name") else {
            continue; // comment, doctype or processing instruction
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.name("close").is_some_and(|m| !m.as_str().is_empty());
        let empty = caps.name("empty").is_some_and(|m| !m.as_str().is_empty());

        match (name.as_str(), closing) {
            ("table", false) if !empty => stack.push(TableBuilder {
                name: last_heading.take(),
                ..TableBuilder::default()
            }),
            ("table", true) => {
                if let Some(mut table) = stack.pop() {
                    table.finish_row();
                    if let Some(table_name) = table.name {
                        tables.insert(table_name, table.rows);
                    }
                }
            }
            ("tr", false) => {
                if let Some(table) = stack.last_mut() {
                    table.finish_row();
                    table.row = Some(Vec::new());
                }
            }
            ("tr", true) => {
                if let Some(table) = stack.last_mut() {
                    table.finish_row();
                }
            }
            ("td" | "th", false) => {
                if let Some(table) = stack.last_mut() {
                    table.finish_cell();
                    table.cell = Some(String::new());
                    if empty {
                        table.finish_cell();
                    }
                }
            }
            ("td" | "th", true) => {
                if let Some(table) = stack.last_mut() {
                    table.finish_cell();
                }
            }
            ("h2" | "p", false) if stack.is_empty() && !empty => heading = Some(String::new()),
            ("h2" | "p", true) if stack.is_empty() => {
                if let Some(text) = heading.take() {
                    last_heading = Some(normalize(&text));
                }
            }
            _ => {}
        }
    }
    push_text(&document[cursor..], &mut stack, &mut heading);

    // tolerate a document truncated inside a table
    while let Some(mut table) = stack.pop() {
        table.finish_row();
        if let Some(table_name) = table.name {
            tables.entry(table_name).or_insert(table.rows);
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<html>
<body>
<title>Summary Information</title>
<h1>Chip Summary</h1>
<table><tr><td>Machine</td><td>HWI-EAS229</td></tr></table>
<h2>Lane Results Summary</h2>
<div>
<table border="1" cellpadding="5">
<tr><td colspan="2">Lane Info</td><td colspan="8">Tile Mean +/- SD for Lane</td></tr>
<tr><th>Lane </th><th>Lane Yield (kbases) </th><th>Clusters (raw)</th></tr>
<tr><td>1</td><td>17500</td><td>27349 +/- 8221</td></tr>
<tr><td>2</td><td>
  34280</td><td>unknown</td></tr>
</table>
</div>
<p>Filter: '((CHASTITY>=0.6))' and CHASTITY<=1 &amp; more</p>
<table><tr><td>a<br/>b</td><td/></tr></table>
<!-- <h2>Commented</h2><table><tr><td>x</td></tr></table> -->
</body>
</html>
"#;

    #[test]
    fn test_extract_named_tables() {
        let tables = extract_named_tables(DOC);
        assert_eq!(tables.len(), 2);

        let lane = &tables["Lane Results Summary"];
        assert_eq!(lane.len(), 4);
        assert_eq!(lane[0], vec!["Lane Info", "Tile Mean +/- SD for Lane"]);
        assert_eq!(lane[2], vec!["1", "17500", "27349 +/- 8221"]);
        assert_eq!(lane[3], vec!["2", "34280", "unknown"]);
    }

    #[test]
    fn test_paragraph_names_table_and_decodes_entities() {
        let tables = extract_named_tables(DOC);
        let (name, rows) = tables
            .iter()
            .find(|(name, _)| name.starts_with("Filter"))
            .unwrap();
        assert_eq!(name, "Filter: '((CHASTITY>=0.6))' and CHASTITY<=1 & more");
        assert_eq!(rows[0], vec!["ab", ""]);
    }

    #[test]
    fn test_unnamed_tables_are_ignored() {
        let tables = extract_named_tables("<table><tr><td>1</td></tr></table>");
        assert!(tables.is_empty());
    }

    #[test]
    fn test_truncated_document() {
        let tables = extract_named_tables("<h2>T</h2><table><tr><td>1</td><td>2");
        assert_eq!(tables["T"], vec![vec!["1".to_string(), "2".to_string()]]);
    }
}
