//! Reader for the `key=value` properties files Hudi keeps under `.hoodie/`

use std::collections::HashMap;

/// Parse properties file text: `#`/`!` comments, `=`, `:` or whitespace
/// separators, backslash escapes and line continuations.
pub(crate) fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();
    let mut logical = String::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if logical.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!')) {
            continue;
        }

        if ends_with_continuation(trimmed) {
            logical.push_str(&trimmed[..trimmed.len() - 1]);
            continue;
        }
        logical.push_str(trimmed);

        let (key, value) = split_entry(&logical);
        props.insert(unescape(&key), unescape(value.trim_start()));
        logical.clear();
    }

    if !logical.is_empty() {
        let (key, value) = split_entry(&logical);
        props.insert(unescape(&key), unescape(value.trim_start()));
    }

    props
}

// An odd number of trailing backslashes continues the line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(entry: &str) -> (String, &str) {
    let mut escaped = false;
    for (i, c) in entry.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (entry[..i].trim_end().to_string(), &entry[i + 1..]),
            c if c.is_whitespace() => {
                let rest = entry[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (entry[..i].to_string(), rest);
            }
            _ => {}
        }
    }
    (entry.to_string(), "")
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hoodie_properties() {
        let text = "#Properties saved on 2024-05-01\n\
                    #Wed May 01 10:00:00 UTC 2024\n\
                    hoodie.table.name=orders\n\
                    hoodie.table.type=MERGE_ON_READ\n\
                    hoodie.table.partition.fields=region,dt\n\
                    hoodie.table.create.schema={\"type\"\\:\"record\",\"name\"\\:\"orders\"}\n";
        let props = parse_properties(text);

        assert_eq!(props["hoodie.table.name"], "orders");
        assert_eq!(props["hoodie.table.type"], "MERGE_ON_READ");
        assert_eq!(props["hoodie.table.partition.fields"], "region,dt");
        assert_eq!(
            props["hoodie.table.create.schema"],
            r#"{"type":"record","name":"orders"}"#
        );
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn test_separators_escapes_and_continuations() {
        let text = "a : 1\n\
                    b 2\n\
                    ! bang comment\n\
                    c=multi \\\n    line\n\
                    d=caf\\u00e9\n\
                    e\\=key=value\n\
                    empty=\n";
        let props = parse_properties(text);

        assert_eq!(props["a"], "1");
        assert_eq!(props["b"], "2");
        assert_eq!(props["c"], "multi line");
        assert_eq!(props["d"], "café");
        assert_eq!(props["e=key"], "value");
        assert_eq!(props["empty"], "");
    }
}
