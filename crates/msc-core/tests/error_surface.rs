use msc_core::errors::{ErrorInfo, MscError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("node", "n3")
        .with_context("height", "2.5")
}

#[test]
fn tree_error_surface() {
    let err = MscError::Tree(sample_info("height-order", "node below child"));
    assert_eq!(err.info().code, "height-order");
    assert!(err.info().context.contains_key("node"));
}

#[test]
fn config_error_surface() {
    let err = MscError::Config(
        sample_info("beta-non-positive", "beta must be positive").with_hint("use beta > 0"),
    );
    assert_eq!(err.info().code, "beta-non-positive");
    assert_eq!(err.info().hint.as_deref(), Some("use beta > 0"));
}

#[test]
fn display_lists_context_and_hint() {
    let err = MscError::Operator(
        ErrorInfo::new("accumulator-unset", "no bound recorded")
            .with_context("gene_trees", "0")
            .with_hint("seed the accumulator first"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("operator error: no bound recorded (code: accumulator-unset)"));
    assert!(rendered.contains("gene_trees=0"));
    assert!(rendered.contains("hint: seed the accumulator first"));
}

#[test]
fn errors_round_trip_json() {
    let err = MscError::Parse(sample_info("newick-eof", "unexpected end of input"));
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"Parse\""));
    let decoded: MscError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}

#[test]
fn every_family_prefixes_its_diagnostic() {
    let info = ErrorInfo::new("invalid-draw", "draw must be non-negative")
        .with_context("draw", "-1")
        .with_context("draw", "-2");
    let families = [
        (MscError::Tree(info.clone()), "tree error: "),
        (MscError::Config(info.clone()), "config error: "),
        (MscError::Operator(info.clone()), "operator error: "),
        (MscError::Parse(info.clone()), "parse error: "),
        (MscError::Rng(info.clone()), "rng error: "),
        (MscError::Serde(info.clone()), "serde error: "),
    ];
    for (err, prefix) in families {
        assert_eq!(err.info(), &info);
        assert_eq!(
            err.to_string(),
            format!("{prefix}draw must be non-negative (code: invalid-draw) | context: [draw=-2]")
        );
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["detail"]["code"], "invalid-draw");
    }
}
