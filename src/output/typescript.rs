use std::fmt::Write;

use crate::record::Record;

pub fn render(records: &[Record], generated_at: &str) -> String {
    let mut out = String::new();
    out.push_str("// AUTO-GENERATED FILE. DO NOT EDIT.\n");
    let _ = writeln!(out, "// Generated at: {generated_at}");
    out.push('\n');
    out.push_str("export const publications = [\n");
    for r in records {
        let field = |name: &str| r.get(name).unwrap_or_default();
        let venue = ["journal", "booktitle", "howpublished"]
            .into_iter()
            .map(field)
            .find(|v| !v.is_empty())
            .unwrap_or_default();
        let authors = field("author").split(" and ").collect::<Vec<_>>().join(", ");

        out.push_str("  {\n");
        let _ = writeln!(out, "    title: {},", literal(field("title")));
        let _ = writeln!(out, "    authors: {},", literal(&authors));
        let _ = writeln!(out, "    journal: {},", literal(venue));
        let _ = writeln!(out, "    time: {},", literal(field("year")));
        let _ = writeln!(out, "    link: {},", optional(field("url")));
        out.push_str("    github: undefined,\n");
        out.push_str("    slides: undefined,\n");
        let _ = writeln!(out, "    abstract: {},", literal(field("abstract")));
        out.push_str("  },\n");
    }
    out.push_str("] as const;\n");
    out
}

/// Single-quoted TypeScript string literal.
fn literal(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\r', "")
        .replace('\n', "\\n");
    format!("'{escaped}'")
}

fn optional(s: &str) -> String {
    if s.is_empty() {
        "undefined".to_string()
    } else {
        literal(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EntryType, Fields};

    #[test]
    fn renders_publications_constant() {
        let fields: Fields = [
            ("title", "Smith's Paper"),
            ("author", "Jane Smith and Wei Zhang"),
            ("howpublished", "arXiv"),
            ("year", "2025"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let record = Record {
            entry_type: EntryType::Misc,
            id: "smith2025smithspaper".into(),
            fields,
            source: "seed",
        };
        let out = render(&[record], "2025-06-01T00:00:00Z");
        assert!(out.starts_with("// AUTO-GENERATED FILE. DO NOT EDIT.\n"));
        assert!(out.contains("    title: 'Smith\\'s Paper',\n"));
        assert!(out.contains("    authors: 'Jane Smith, Wei Zhang',\n"));
        assert!(out.contains("    journal: 'arXiv',\n"));
        assert!(out.contains("    link: undefined,\n"));
        assert!(out.contains("    abstract: '',\n"));
        assert!(out.ends_with("] as const;\n"));
    }

    #[test]
    fn literal_escapes_newlines_and_backslashes() {
        assert_eq!(literal("a\\b\r\nc"), "'a\\\\b\\nc'");
    }
}
