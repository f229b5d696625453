use plume_core::{Context, DependsOn, Injectable, Param, ParamList, ResolveError, solve_dependencies};
use tokio_test::{assert_err, assert_ok};

#[derive(Clone, Debug, PartialEq, Injectable)]
struct Limits {
    #[inject(default = 256)]
    max_tokens: u32,
}

#[derive(Clone, Debug, PartialEq, Injectable)]
struct BestResponseConfig {
    #[inject(default = "Claude-3-Haiku".to_string())]
    decision_bot: String,
    #[inject(default = vec!["GPT-4o".to_string(), "Claude-3-Opus".to_string()])]
    candidates: Vec<String>,
    #[inject(default)]
    retries: u32,
    #[inject(auto)]
    limits: Limits,
}

#[derive(Clone, Debug, Injectable)]
struct Renamed {
    #[inject(name = "bot_name")]
    name: String,
}

fn load_region() -> String {
    "eu-west".to_string()
}

#[derive(Clone, Debug, Injectable)]
struct Deployment {
    #[inject(depends_on = DependsOn::new((), load_region))]
    region: String,
}

#[derive(Clone, Debug, Injectable)]
struct Marker;

#[tokio::test]
async fn test_derived_defaults_recursive() {
    let signature = Param::<BestResponseConfig>::new("config").auto().signature();

    let resolved = assert_ok!(solve_dependencies(&signature, &Context::new()).await);
    let config = assert_ok!(resolved.get::<BestResponseConfig>("config"));

    assert_eq!(
        config,
        BestResponseConfig {
            decision_bot: "Claude-3-Haiku".to_string(),
            candidates: vec!["GPT-4o".to_string(), "Claude-3-Opus".to_string()],
            retries: 0,
            limits: Limits { max_tokens: 256 },
        }
    );
}

#[tokio::test]
async fn test_derived_field_overridden_by_context() {
    let signature = Param::<BestResponseConfig>::new("config").auto().signature();
    let ctx = Context::new().with("decision_bot", "GPT-4o-Mini".to_string());

    let resolved = assert_ok!(solve_dependencies(&signature, &ctx).await);
    let config = assert_ok!(resolved.get::<BestResponseConfig>("config"));

    assert_eq!(config.decision_bot, "GPT-4o-Mini");
    assert_eq!(config.limits.max_tokens, 256);
}

#[tokio::test]
async fn test_whole_data_type_from_context_wins() {
    let signature = Param::<Limits>::new("limits").auto().signature();
    let ctx = Context::new().with("limits", Limits { max_tokens: 8 });

    let resolved = assert_ok!(solve_dependencies(&signature, &ctx).await);

    assert_eq!(assert_ok!(resolved.get::<Limits>("limits")).max_tokens, 8);
}

#[tokio::test]
async fn test_renamed_field_without_default_is_unresolvable() {
    let signature = Param::<Renamed>::new("renamed").auto().signature();

    let err = assert_err!(solve_dependencies(&signature, &Context::new()).await);
    assert!(matches!(err, ResolveError::Unresolvable { ref param } if param == "bot_name"));

    let ctx = Context::new().with("bot_name", "EchoBot".to_string());
    let resolved = assert_ok!(solve_dependencies(&signature, &ctx).await);
    assert_eq!(assert_ok!(resolved.get::<Renamed>("renamed")).name, "EchoBot");
}

#[tokio::test]
async fn test_field_dependency() {
    let signature = Param::<Deployment>::new("deployment").auto().signature();

    let resolved = assert_ok!(solve_dependencies(&signature, &Context::new()).await);

    assert_eq!(assert_ok!(resolved.get::<Deployment>("deployment")).region, "eu-west");
}

#[test]
fn test_unit_struct_has_empty_signature() {
    assert!(Marker::signature().is_empty());
    assert_eq!(BestResponseConfig::signature().len(), 4);
}
