use std::fmt::Write;

use crate::record::Record;

/// Fields written first, in this order; everything else follows alphabetically.
const FIELD_ORDER: &[&str] = &[
    "title",
    "author",
    "booktitle",
    "journal",
    "year",
    "volume",
    "number",
    "pages",
    "publisher",
    "howpublished",
    "doi",
    "url",
    "eprint",
    "archiveprefix",
    "primaryclass",
];

pub fn render(records: &[Record], generated_at: &str) -> String {
    let mut out = String::new();
    out.push_str("% AUTO-GENERATED FILE. DO NOT EDIT.\n");
    let _ = writeln!(out, "% Generated at: {generated_at}");
    for record in records {
        out.push('\n');
        write_entry(&mut out, record);
    }
    out
}

fn write_entry(out: &mut String, record: &Record) {
    let _ = writeln!(out, "@{}{{{},", record.entry_type, record.id);
    let preferred = FIELD_ORDER
        .iter()
        .filter_map(|f| record.fields.get_key_value(*f));
    let rest = record
        .fields
        .iter()
        .filter(|(k, _)| !FIELD_ORDER.contains(&k.as_str()));
    for (field, value) in preferred.chain(rest) {
        let _ = writeln!(out, "  {field} = {{{}}},", brace_safe(value));
    }
    out.push_str("}\n");
}

/// Values with unbalanced braces would break the entry; escape their braces.
fn brace_safe(value: &str) -> String {
    let mut depth = 0i32;
    let balanced = value.chars().all(|c| {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
        depth >= 0
    }) && depth == 0;
    if balanced {
        value.to_string()
    } else {
        value.replace('{', "\\{").replace('}', "\\}")
    }
}
