use super::*;

#[test]
fn default_strips_conventional_suffixes() {
    let router = CollectionRouter::default();
    assert_eq!(router.collection_for("TradeQuoteData", None), "TradeQuote");
    assert_eq!(router.collection_for("InstrumentKey", None), "Instrument");
}

#[test]
fn first_match_wins_for_suffix() {
    let mut router = CollectionRouter::default();
    router.ignored_class_name_suffixes = vec!["Data".to_string(), "QuoteData".to_string()];
    // "Data" matches first even though "QuoteData" would also match.
    assert_eq!(router.collection_for("TradeQuoteData", None), "TradeQuote");
}

#[test]
fn no_match_leaves_name_untouched() {
    let router = CollectionRouter::default();
    assert_eq!(router.collection_for("Order", None), "Order");
}

#[test]
fn namespace_prefix_and_suffix_are_stripped_independently() {
    let mut router = CollectionRouter::default();
    router.ignored_namespace_prefixes = vec!["com.acme.".to_string()];
    router.ignored_namespace_suffixes = vec![".v1".to_string()];
    assert_eq!(router.collection_for("Order", Some("com.acme.trading.v1")), "trading.Order");
}
