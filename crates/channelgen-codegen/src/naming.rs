//! Naming convention utilities for code generation.
//!
//! Interface documents use whatever spelling their authors liked (`order-book`,
//! `orderBook`, `/market/trades`, `Event-Items-object`). These helpers turn
//! those into Rust identifiers.
//!
//! | Input | Function | Output |
//! |-------|----------|--------|
//! | `Event-Items-object` | [`type_ident`] | `EventItemsObject` |
//! | `orderBook` | [`field_ident`] | `order_book` |
//! | `type` | [`field_ident`] | `r#type` |
//! | `/market/trades` | [`snake_ident`] | `market_trades` |

/// Words a field or method may not use unescaped.
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while",
    "abstract", "become", "box", "do", "final", "gen", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

/// Keywords that cannot be written as raw identifiers.
const RESERVED: &[&str] = &["self", "Self", "super", "crate", "_"];

/// Split a name into words on separators and case boundaries.
fn words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Capitalize the first letter of a string.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Convert any spelling to PascalCase.
///
/// Only the first letter of each word is changed, so acronyms survive.
pub fn to_pascal_case(s: &str) -> String {
    words(s).iter().map(|w| capitalize(w)).collect()
}

/// Convert any spelling to snake_case.
pub fn to_snake_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Escape a Rust keyword.
///
/// Ordinary keywords become raw identifiers; the few that cannot be raw get a
/// trailing underscore.
pub fn escape_keyword(ident: &str) -> String {
    if RESERVED.contains(&ident) {
        format!("{ident}_")
    } else if KEYWORDS.contains(&ident) {
        format!("r#{ident}")
    } else {
        ident.to_string()
    }
}

/// Strip a raw-identifier prefix.
pub fn unraw(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

/// Sanitize a name into a type identifier.
pub fn type_ident(name: &str) -> String {
    let ident = to_pascal_case(name);
    if ident.is_empty() {
        return "Unnamed".to_string();
    }
    if ident.starts_with(|c: char| c.is_numeric()) {
        return format!("T{ident}");
    }
    escape_keyword(&ident)
}

/// Sanitize a name into a snake_case identifier without keyword escaping.
pub fn snake_ident(name: &str) -> String {
    let ident = to_snake_case(name);
    if ident.is_empty() {
        return "unnamed".to_string();
    }
    if ident.starts_with(|c: char| c.is_numeric()) {
        return format!("n{ident}");
    }
    ident
}

/// Sanitize a wire name into a field identifier.
pub fn field_ident(wire_name: &str) -> String {
    escape_keyword(&snake_ident(wire_name))
}

/// Build a method name from a prefix and a message name.
///
/// An empty prefix yields the bare message name, escaped if needed.
pub fn method_ident(prefix: &str, message: &str) -> String {
    if prefix.is_empty() {
        field_ident(message)
    } else {
        format!("{prefix}_{}", snake_ident(message))
    }
}
