//! Go lexical helpers: string literals, identifiers and protoc-gen-go naming.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// ASCII Go identifier that is not a keyword.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s) && !is_keyword(s)
}

/// Go interpreted string literal for `s`, quotes included.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// protoc-gen-go's CamelCase rule: `foo_bar` → `FooBar`, `Outer.inner` →
/// `OuterInner`, `Outer.Inner` → `Outer_Inner`, leading `_` → `X`.
pub fn camel_case(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let next_is_lower = bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase);
        match c {
            b'.' if next_is_lower => {}
            b'.' => out.push('_'),
            b'_' if i == 0 || bytes[i - 1] == b'.' => out.push('X'),
            b'_' if next_is_lower => {}
            c if c.is_ascii_digit() => out.push(c as char),
            c => {
                out.push(c.to_ascii_uppercase() as char);
                while bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase) {
                    i += 1;
                    out.push(bytes[i] as char);
                }
            }
        }
        i += 1;
    }
    out
}

/// Methods protoc-gen-go generates on every message.
const RESERVED_METHODS: &[&str] = &[
    "Reset",
    "String",
    "ProtoMessage",
    "Marshal",
    "Unmarshal",
    "ExtensionRangeArray",
    "ExtensionMap",
    "Descriptor",
];

/// Per-message Go field names, uniqued the way protoc-gen-go does: a name
/// that clashes with a reserved method, an earlier field or an earlier
/// getter gets `_` appended until it is free.
#[derive(Debug)]
pub struct FieldNames {
    used: HashSet<String>,
}

impl Default for FieldNames {
    fn default() -> Self {
        FieldNames { used: RESERVED_METHODS.iter().map(|m| m.to_string()).collect() }
    }
}

impl FieldNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`; oneofs claim without a getter.
    pub fn claim(&mut self, name: &str, has_getter: bool) -> String {
        let mut name = name.to_string();
        while self.used.contains(&name) || (has_getter && self.used.contains(&format!("Get{name}"))) {
            name.push('_');
        }
        self.used.insert(format!("Get{name}"));
        self.used.insert(name.clone());
        name
    }
}

/// protoc's default `json_name`: drop underscores, upper-case the letter after.
pub fn json_name(field_name: &str) -> String {
    let mut out = String::with_capacity(field_name.len());
    let mut upper_next = false;
    for c in field_name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Package name for a file: the `;name` suffix or last path element of
/// `go_package`, else the last segment of the proto package, else the file stem.
pub fn package_name(go_package: Option<&str>, proto_package: &str, file_name: &str) -> Option<String> {
    let raw = match go_package {
        Some(gp) if gp.contains(';') => gp.rsplit(';').next().unwrap_or_default(),
        Some(gp) => gp.rsplit('/').next().unwrap_or_default(),
        None if !proto_package.is_empty() => proto_package.rsplit('.').next().unwrap_or_default(),
        None => {
            let base = file_name.rsplit('/').next().unwrap_or_default();
            base.strip_suffix(".proto").unwrap_or(base)
        }
    };
    if raw.is_empty() {
        return None;
    }
    Some(sanitize(raw))
}

fn sanitize(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let starts_with_letter = mapped.chars().next().is_some_and(char::is_alphabetic);
    if is_keyword(&mapped) || !starts_with_letter {
        format!("_{mapped}")
    } else {
        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_json_fragments() {
        assert_eq!(quote(r#"{"a":"#), r#""{\"a\":""#);
        assert_eq!(quote("tab\there"), r#""tab\there""#);
        assert_eq!(quote("\u{1}"), r#""\x01""#);
        assert_eq!(quote(r"back\slash"), r#""back\\slash""#);
    }

    #[test]
    fn camel_case_follows_protoc_gen_go() {
        assert_eq!(camel_case("foo_bar"), "FooBar");
        assert_eq!(camel_case("foo_bar_2"), "FooBar_2");
        assert_eq!(camel_case("_private"), "XPrivate");
        assert_eq!(camel_case("Outer.Inner"), "Outer_Inner");
        assert_eq!(camel_case("Outer.inner"), "OuterInner");
        assert_eq!(camel_case("a"), "A");
    }

    #[test]
    fn field_names_avoid_reserved_methods_and_getters() {
        let mut names = FieldNames::new();
        assert_eq!(names.claim("String", true), "String_");
        assert_eq!(names.claim("Descriptor", true), "Descriptor_");
        assert_eq!(names.claim("Foo", true), "Foo");
        assert_eq!(names.claim("GetFoo", true), "GetFoo_");
        assert_eq!(names.claim("Foo", true), "Foo_");
        assert_eq!(names.claim("Choice", false), "Choice");
        assert_eq!(names.claim("Choice", true), "Choice_");
    }

    #[test]
    fn default_json_names() {
        assert_eq!(json_name("foo_bar"), "fooBar");
        assert_eq!(json_name("a"), "a");
        assert_eq!(json_name("x_1"), "x1");
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("buf"));
        assert!(is_identifier("Outer_Inner"));
        assert!(!is_identifier("range"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("a-b"));
    }

    #[test]
    fn package_names() {
        assert_eq!(package_name(Some("example.com/foo/e2e;e2epb"), "x", "a.proto").as_deref(), Some("e2epb"));
        assert_eq!(package_name(Some("example.com/foo/e2e"), "x", "a.proto").as_deref(), Some("e2e"));
        assert_eq!(package_name(None, "acme.v1", "a.proto").as_deref(), Some("v1"));
        assert_eq!(package_name(None, "", "dir/basic.proto").as_deref(), Some("basic"));
        assert_eq!(package_name(Some("example.com/go-json"), "", "a.proto").as_deref(), Some("go_json"));
        assert_eq!(package_name(Some("example.com/type"), "", "a.proto").as_deref(), Some("_type"));
    }
}
