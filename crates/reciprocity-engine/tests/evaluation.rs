//! End-to-end evaluation tests.
//!
//! These tests build small federations of delivery companies and check the
//! decision, the justifications and the trace produced for their requests.

use reciprocity_engine::prelude::*;
use tracing_subscriber::filter::LevelFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(LevelFilter::TRACE)
        .try_init();
}

fn store(pairs: &[(&str, &str)]) -> AttributeStore {
    AttributeStore::from_pairs(pairs.iter().copied()).expect("distinct names")
}

fn company(name: &str) -> AttributeStore {
    store(&[("service", "delivery"), ("company", name)])
}

fn address(city: &str) -> AttributeStore {
    store(&[("type", "addrInfo"), ("city", city)])
}

fn requester_gives_to_me(resource: AttributeStore) -> Exchange {
    Exchange::single(
        ExchangeTo::me(),
        resource,
        AttributeStore::new(),
        ExchangeFrom::requester(),
    )
}

/// RabbitService (1) shares Lucca unconditionally. FastAndFurious (2) shares
/// Prato if the requester shares Pistoia or Lucca in return.
fn couriers() -> Policies {
    let mut policies = Policies::new();
    policies.register(Policy::new(company("RabbitService")).with_rule(Rule::new(address("Lucca"))));
    policies.register(
        Policy::new(company("FastAndFurious")).with_rule(
            Rule::new(address("Prato")).requiring(
                requester_gives_to_me(address("Pistoia"))
                    .or(requester_gives_to_me(address("Lucca"))),
            ),
        ),
    );
    policies
}

fn prato_request() -> Request {
    Request::new(
        1,
        address("Prato"),
        AttributeStore::new(),
        RequestFrom::any_such_that(company("FastAndFurious")),
    )
    .expect("distinct parties")
}

// =============================================================================
// Courier Scenario
// =============================================================================

#[test]
fn test_courier_exchange_is_granted() {
    init_tracing();
    let mut evaluator = Evaluator::new(couriers());
    let result = evaluator.evaluate(&prato_request()).unwrap();

    assert!(result.is_permitted());
    let lucca = Request::new(2, address("Lucca"), AttributeStore::new(), RequestFrom::policy(1))
        .unwrap();
    let prato = Request::new(1, address("Prato"), AttributeStore::new(), RequestFrom::policy(2))
        .unwrap();
    assert_eq!(result.justifications, vec![lucca, prato]);
}

#[test]
fn test_courier_trace() {
    init_tracing();
    let mut evaluator = Evaluator::new(couriers());
    evaluator.evaluate(&prato_request()).unwrap();

    let expected = [
        r#"evaluating 1 asks anySuchThat [service = "delivery", company = "FastAndFurious"] for [type = "addrInfo", city = "Prato"]"#,
        r#"  evaluating 1 asks 2 for [type = "addrInfo", city = "Prato"]"#,
        r#"    rule 2.1: condition true holds, exchange required"#,
        r#"      exchange requester gives [type = "addrInfo", city = "Pistoia"] to me"#,
        r#"        evaluating 2 asks 1 for [type = "addrInfo", city = "Pistoia"]"#,
        r#"          rule 1.1: resource [type = "addrInfo", city = "Lucca"] not matched"#,
        r#"          no rule of policy 1 grants the request"#,
        r#"        result: false"#,
        r#"      exchange satisfied: false"#,
        r#"    OR"#,
        r#"      exchange requester gives [type = "addrInfo", city = "Lucca"] to me"#,
        r#"        evaluating 2 asks 1 for [type = "addrInfo", city = "Lucca"]"#,
        r#"          rule 1.1: granted"#,
        r#"        result: true"#,
        r#"      exchange satisfied: true"#,
        r#"    rule 2.1: granted"#,
        r#"  result: true"#,
        r#"result: true"#,
    ];
    let lines: Vec<&str> = evaluator.trace().lines().collect();
    assert_eq!(lines, expected);
}

#[test]
fn test_courier_without_alternative_is_denied() {
    init_tracing();
    let mut policies = Policies::new();
    policies.register(Policy::new(company("RabbitService")).with_rule(Rule::new(address("Lucca"))));
    policies.register(
        Policy::new(company("FastAndFurious")).with_rule(
            Rule::new(address("Prato")).requiring(requester_gives_to_me(address("Pistoia"))),
        ),
    );

    let mut evaluator = Evaluator::new(policies);
    let result = evaluator.evaluate(&prato_request()).unwrap();
    assert!(!result.is_permitted());
    assert!(result.justifications.is_empty());
    assert!(!evaluator.trace().contains("OR"));
    assert!(evaluator.trace().ends_with("result: false\n"));
}

#[test]
fn test_condition_on_requester_party() {
    init_tracing();
    let mut policies = couriers();
    policies.register(
        Policy::new(company("SlowButSteady")).with_rule(
            Rule::new(address("Siena")).when(Condition::eq("company", "RabbitService")),
        ),
    );
    let mut evaluator = Evaluator::new(policies);

    let from_rabbit =
        Request::new(1, address("Siena"), AttributeStore::new(), RequestFrom::policy(3)).unwrap();
    let from_fast =
        Request::new(2, address("Siena"), AttributeStore::new(), RequestFrom::policy(3)).unwrap();

    assert!(evaluator.evaluate(&from_rabbit).unwrap().is_permitted());
    assert!(!evaluator.evaluate(&from_fast).unwrap().is_permitted());
}

#[test]
fn test_context_bindings_feed_conditions() {
    init_tracing();
    let mut policies = Policies::new();
    policies.register(Policy::new(company("RabbitService")).with_rule(
        Rule::new(address("Lucca")).when(Condition::gt("capacity", 10)),
    ));
    let mut evaluator = Evaluator::new(policies);
    let request =
        Request::new(0, address("Lucca"), AttributeStore::new(), RequestFrom::policy(1)).unwrap();

    // Unbound: the rule does not apply.
    assert!(!evaluator.evaluate(&request).unwrap().is_permitted());
    assert!(evaluator.trace().contains("Undefined name 'capacity'"));

    evaluator.context_mut().bind(1, "capacity", 25).unwrap();
    assert!(evaluator.evaluate(&request).unwrap().is_permitted());
}

// =============================================================================
// Cycles
// =============================================================================

/// Two couriers that each share their city only against the other's.
fn mutual_couriers() -> Policies {
    let mut policies = Policies::new();
    policies.register(
        Policy::new(company("RabbitService"))
            .with_rule(Rule::new(address("Lucca")).requiring(requester_gives_to_me(address("Prato")))),
    );
    policies.register(
        Policy::new(company("FastAndFurious"))
            .with_rule(Rule::new(address("Prato")).requiring(requester_gives_to_me(address("Lucca")))),
    );
    policies
}

#[test]
fn test_mutual_exchange_terminates() {
    init_tracing();
    let evaluator = Evaluator::new(mutual_couriers());
    let request =
        Request::new(2, address("Lucca"), AttributeStore::new(), RequestFrom::policy(1)).unwrap();
    let report = evaluator.evaluate_with_audit(&request).unwrap();

    assert!(report.is_permitted());
    assert_eq!(report.compliance_shortcuts, 1);
    assert_eq!(report.requests_evaluated, 2);
    assert!(report.trace.contains(
        r#"2 asks 1 for [type = "addrInfo", city = "Lucca"] complies with in-flight request 2 asks 1 for [type = "addrInfo", city = "Lucca"]"#
    ));
}

#[test]
fn test_mutual_exchange_trace() {
    init_tracing();
    let mut evaluator = Evaluator::new(mutual_couriers());
    let request =
        Request::new(2, address("Lucca"), AttributeStore::new(), RequestFrom::policy(1)).unwrap();
    evaluator.evaluate(&request).unwrap();

    let expected = [
        r#"evaluating 2 asks 1 for [type = "addrInfo", city = "Lucca"]"#,
        r#"  rule 1.1: condition true holds, exchange required"#,
        r#"  exchange requester gives [type = "addrInfo", city = "Prato"] to me"#,
        r#"    evaluating 1 asks 2 for [type = "addrInfo", city = "Prato"]"#,
        r#"      rule 2.1: condition true holds, exchange required"#,
        r#"      exchange requester gives [type = "addrInfo", city = "Lucca"] to me"#,
        r#"        2 asks 1 for [type = "addrInfo", city = "Lucca"] complies with in-flight request 2 asks 1 for [type = "addrInfo", city = "Lucca"]"#,
        r#"      exchange satisfied: true"#,
        r#"      rule 2.1: granted"#,
        r#"    result: true"#,
        r#"  exchange satisfied: true"#,
        r#"  rule 1.1: granted"#,
        r#"result: true"#,
    ];
    let lines: Vec<&str> = evaluator.trace().lines().collect();
    assert_eq!(lines, expected);
}

#[test]
fn test_recursion_ceiling_without_compliance() {
    init_tracing();
    let mut evaluator =
        Evaluator::new(mutual_couriers()).with_compliance_checker(|_: &Request, _: &Request| false);
    let request =
        Request::new(2, address("Lucca"), AttributeStore::new(), RequestFrom::policy(1)).unwrap();
    let err = evaluator.evaluate(&request).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Evaluation);
    assert!(matches!(
        err,
        EngineError::RecursionLimitExceeded { limit: 128, .. }
    ));
}

#[test]
fn test_configured_ceiling_from_toml() {
    init_tracing();
    let config = EngineConfig::from_toml_str(
        r#"
max_depth = 3

[trace]
indent_width = 4
emit_events = true
"#,
    )
    .unwrap();
    let mut evaluator = Evaluator::with_config(mutual_couriers(), config)
        .unwrap()
        .with_compliance_checker(|_: &Request, _: &Request| false);
    let request =
        Request::new(2, address("Lucca"), AttributeStore::new(), RequestFrom::policy(1)).unwrap();

    let err = evaluator.evaluate(&request).unwrap_err();
    assert!(matches!(
        err,
        EngineError::RecursionLimitExceeded { depth: 4, limit: 3 }
    ));
    assert!(evaluator.trace().contains("\n    rule 1.1:"));
}

// =============================================================================
// Registry and Audit
// =============================================================================

#[test]
fn test_describe_couriers() {
    let expected = concat!(
        r#"1 = [service = "delivery", company = "RabbitService"], rules=[[type = "addrInfo", city = "Lucca"] if true]"#,
        "\n",
        r#"2 = [service = "delivery", company = "FastAndFurious"], rules=[[type = "addrInfo", city = "Prato"] if true exchange (requester gives [type = "addrInfo", city = "Pistoia"] to me or requester gives [type = "addrInfo", city = "Lucca"] to me)]"#,
        "\n",
    );
    assert_eq!(couriers().describe(), expected);
}

#[test]
fn test_audit_report_export() {
    init_tracing();
    let evaluator = Evaluator::new(couriers());
    let report = evaluator.evaluate_with_audit(&prato_request()).unwrap();

    assert_eq!(report.requests_evaluated, 4);
    assert_eq!(report.max_depth_reached, 3);
    assert_eq!(report.compliance_shortcuts, 0);

    let json = report.to_json().unwrap();
    assert_eq!(json["result"]["permitted"], true);
    assert_eq!(json["requestsEvaluated"], 4);
    assert_eq!(json["request"]["requester"]["index"], 1);
    assert_eq!(
        json["request"]["from"]["quantified"]["quantifier"],
        "any"
    );
    assert_eq!(
        json["result"]["justifications"][0]["resource"]["city"],
        "Lucca"
    );
    assert!(json["evaluatedAt"].is_string());
    assert!(json["trace"].as_str().unwrap().ends_with("result: true\n"));
}

#[test]
fn test_invalid_models_are_rejected_up_front() {
    let err = Request::new(1, address("Lucca"), AttributeStore::new(), RequestFrom::policy(1))
        .unwrap_err();
    assert!(err.is_construction_error());

    let err = AttributeStore::from_pairs([("city", "Lucca"), ("city", "Prato")]).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateAttribute { .. }));

    let err = ExchangeTo::try_from(Participant::Requester).unwrap_err();
    assert!(matches!(err, EngineError::InvalidParticipant { .. }));
}
