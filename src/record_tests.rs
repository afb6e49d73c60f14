use super::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Quote {
    price: f64,
}
impl RecordType for Quote {
    const TYPE_NAME: &'static str = "Quote";
}

#[derive(Serialize, Deserialize)]
struct TradeQuote {
    price: f64,
    volume: i64,
}
impl RecordType for TradeQuote {
    const TYPE_NAME: &'static str = "TradeQuote";
    const ANCESTORS: &'static [&'static str] = &["Quote"];
}

#[derive(Serialize, Deserialize)]
struct OtherSibling {
    x: i64,
}
impl RecordType for OtherSibling {
    const TYPE_NAME: &'static str = "OtherSibling";
    const ANCESTORS: &'static [&'static str] = &["Quote"];
}

#[test]
fn root_is_own_root_when_no_ancestors() {
    assert_eq!(Quote::root_name(), "Quote");
    assert_eq!(Quote::full_chain(), vec!["Quote".to_string()]);
}

#[test]
fn subtype_root_is_ancestor() {
    assert_eq!(TradeQuote::root_name(), "Quote");
    assert_eq!(TradeQuote::full_chain(), vec!["Quote".to_string(), "TradeQuote".to_string()]);
}

#[test]
fn registry_assignability_covers_ancestors_and_self() {
    let mut reg = TypeRegistry::new();
    reg.register::<Quote>();
    reg.register::<TradeQuote>();
    reg.register::<OtherSibling>();

    assert!(reg.is_assignable("TradeQuote", "Quote"));
    assert!(reg.is_assignable("TradeQuote", "TradeQuote"));
    assert!(!reg.is_assignable("TradeQuote", "OtherSibling"));
    assert_eq!(reg.root_of("TradeQuote"), Some("Quote"));
}
