use edge_router::control_plane::validator::validate_pair;
use edge_router::{admit_rule, EndpointKind, Rule, RuleCatalog, RuleEndpoint};
use proptest::prelude::*;
use serde_json::json;

struct EmptyCatalog;

#[async_trait::async_trait]
impl RuleCatalog for EmptyCatalog {
    async fn get_rule_endpoint(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<RuleEndpoint>, String> {
        Ok(None)
    }

    async fn list_rules(&self, _namespace: &str) -> Result<Vec<Rule>, String> {
        Ok(Vec::new())
    }

    async fn list_rule_endpoints(&self, _namespace: &str) -> Result<Vec<RuleEndpoint>, String> {
        Ok(Vec::new())
    }
}

fn review(operation: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "request": {
            "uid": "review-1",
            "operation": operation,
            "object": Rule::new("default", "r1", "a", "b"),
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn unknown_operation_is_denied_with_generic_message() {
    let reply = admit_rule(&EmptyCatalog, &review("UNKNOWN"))
        .await
        .response
        .unwrap();

    assert_eq!(reply.uid, "review-1");
    assert!(!reply.allowed);
    assert_eq!(reply.message(), Some("Unsupported webhook operation!"));
}

#[tokio::test]
async fn create_for_missing_source_endpoint_is_denied() {
    let reply = admit_rule(&EmptyCatalog, &review("CREATE"))
        .await
        .response
        .unwrap();

    assert!(!reply.allowed);
    assert_eq!(
        reply.message(),
        Some("source ruleEndpoint default/a has not been created")
    );
}

fn kind() -> impl Strategy<Value = EndpointKind> {
    prop_oneof![
        Just(EndpointKind::Rest),
        Just(EndpointKind::EventBus),
        Just(EndpointKind::ServiceBus),
    ]
}

proptest! {
    #[test]
    fn only_the_three_legal_pairs_validate(source in kind(), target in kind()) {
        let legal = matches!(
            (source, target),
            (EndpointKind::Rest, EndpointKind::EventBus)
                | (EndpointKind::Rest, EndpointKind::ServiceBus)
                | (EndpointKind::EventBus, EndpointKind::Rest)
        );
        let outcome = validate_pair(source, target);
        prop_assert_eq!(outcome.is_ok(), legal);
        if let Err(err) = outcome {
            prop_assert_eq!(
                err.to_string(),
                format!(
                    "the rule which is from source ruleEndpoint type {source} to target ruleEndpoint type {target} is not validate"
                )
            );
        }
    }
}
