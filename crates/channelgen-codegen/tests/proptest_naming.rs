//! Property-based tests for identifier sanitization
//!
//! Whatever spelling a document uses for a schema, field or channel, the
//! generated identifier must be something rustc accepts.

use channelgen_codegen::naming::{field_ident, method_ident, snake_ident, type_ident, unraw};
use proptest::prelude::*;

// Strategy: printable ASCII names, including separators and digits
fn arb_name() -> impl Strategy<Value = String> {
    "[ -~]{0,24}"
}

fn is_ident(ident: &str) -> bool {
    syn::parse_str::<syn::Ident>(ident).is_ok()
}

proptest! {
    /// Property: type identifiers always parse as Rust identifiers
    #[test]
    fn proptest_type_ident_is_valid(name in arb_name()) {
        let ident = type_ident(&name);
        prop_assert!(is_ident(&ident), "{:?} -> {:?}", name, ident);
    }

    /// Property: field identifiers always parse, keywords included
    #[test]
    fn proptest_field_ident_is_valid(name in arb_name()) {
        let ident = field_ident(&name);
        prop_assert!(is_ident(&ident), "{:?} -> {:?}", name, ident);
    }

    /// Property: prefixed method names always parse
    #[test]
    fn proptest_method_ident_is_valid(name in arb_name()) {
        for prefix in ["send", "on", ""] {
            let ident = method_ident(prefix, &name);
            prop_assert!(is_ident(&ident), "{:?} -> {:?}", name, ident);
        }
    }

    /// Property: snake identifiers are lowercase words joined by underscores
    #[test]
    fn proptest_snake_ident_shape(name in arb_name()) {
        let ident = snake_ident(&name);
        prop_assert!(!ident.is_empty());
        prop_assert!(!ident.starts_with(|c: char| c.is_ascii_digit()));
        prop_assert!(
            ident
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        );
        prop_assert!(!ident.contains("__"));
    }

    /// Property: sanitizing a type identifier again changes nothing
    #[test]
    fn proptest_type_ident_is_stable(name in arb_name()) {
        let once = type_ident(&name);
        prop_assert_eq!(type_ident(unraw(&once)), once);
    }
}
