//! The dependency resolver.
//!
//! Each parameter of a [`Signature`] is resolved by the first rule that
//! applies:
//!
//! 1. an entry of the same name in the [`Context`];
//! 2. the declared dependency, resolved recursively and cached by factory
//!    identity when caching is on;
//! 3. the declared default;
//! 4. the declared data type, built from its own fields resolved with the
//!    same context and cache;
//!
//! otherwise resolution fails with [`ResolveError::Unresolvable`].
//!
//! Siblings are resolved concurrently. The cache is checked before a factory
//! runs and filled after it completes, so a cached asynchronous factory that
//! suspends can be entered once per sibling that needs it.

use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use tracing::{debug, trace};

use crate::cache::ResolutionCache;
use crate::context::{Context, Value};
use crate::dependency::Dependency;
use crate::error::{ResolveError, ResolveResult};
use crate::param::{ParamSpec, Resolved, Signature};

/// Resolves every parameter of `signature` against `context`.
///
/// A fresh cache is created for the pass: factory results are never shared
/// between two calls.
pub async fn solve_dependencies(signature: &Signature, context: &Context) -> ResolveResult<Resolved> {
    let cache = ResolutionCache::new();
    solve_with_cache(signature, context, &cache).await
}

/// Synchronous entry point, for callers outside any async runtime.
///
/// Asynchronous factories are driven to completion on the calling thread.
pub fn solve_dependencies_blocking(
    signature: &Signature,
    context: &Context,
) -> ResolveResult<Resolved> {
    futures::executor::block_on(solve_dependencies(signature, context))
}

/// Resolves `signature` sharing `cache` with the enclosing pass.
pub fn solve_with_cache<'a>(
    signature: &'a Signature,
    context: &'a Context,
    cache: &'a ResolutionCache,
) -> BoxFuture<'a, ResolveResult<Resolved>> {
    async move {
        let values = try_join_all(
            signature
                .iter()
                .map(|param| resolve_param(param, context, cache)),
        )
        .await?;

        Ok(signature.names().map(str::to_owned).zip(values).collect())
    }
    .boxed()
}

async fn resolve_param(
    param: &ParamSpec,
    context: &Context,
    cache: &ResolutionCache,
) -> ResolveResult<Value> {
    if let Some(value) = context.get_value(param.name()) {
        trace!(param = param.name(), "Resolved from context");
        return Ok(value.clone());
    }

    if let Some(dependency) = param.dependency() {
        return resolve_dependency(param, dependency, context, cache).await;
    }

    if let Some(value) = param.default_value() {
        trace!(param = param.name(), "Resolved from default");
        return Ok(value);
    }

    if let Some(data) = param.data_type() {
        trace!(
            param = param.name(),
            data_type = data.type_name(),
            "Constructing data type"
        );
        let signature = data.signature();
        let fields = solve_with_cache(&signature, context, cache).await?;
        return data.construct(fields);
    }

    debug!(
        param = param.name(),
        param_type = param.type_name(),
        "No rule resolves parameter"
    );
    Err(ResolveError::unresolvable(param.name()))
}

async fn resolve_dependency(
    param: &ParamSpec,
    dependency: &Dependency,
    context: &Context,
    cache: &ResolutionCache,
) -> ResolveResult<Value> {
    let id = dependency.id();

    if dependency.use_cache() {
        if let Some(value) = cache.get(id) {
            debug!(param = param.name(), factory = id.name(), "Dependency cache hit");
            return Ok(value);
        }
    }

    let args = solve_with_cache(dependency.signature(), context, cache).await?;
    trace!(param = param.name(), factory = id.name(), "Invoking factory");
    let value = dependency.call(args).await?;

    if dependency.use_cache() {
        cache.insert(id, value.clone());
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::dependency::DependsOn;
    use crate::injectable::Injectable;
    use crate::param::{Param, ParamList};

    fn get_base() -> u32 {
        10
    }

    fn get_multiplier(base: u32) -> u32 {
        base * 2
    }

    fn counter_factory(counter: &Arc<AtomicUsize>) -> impl Fn() -> u32 + Send + Sync + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            7
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Limits {
        max_tokens: u32,
    }

    impl Injectable for Limits {
        fn signature() -> Signature {
            Param::<u32>::new("max_tokens").with_default(256).signature()
        }

        fn construct(resolved: &mut Resolved) -> ResolveResult<Self> {
            Ok(Self {
                max_tokens: resolved.take("max_tokens")?,
            })
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct BotSettings {
        decision_bot: String,
        retries: u32,
        limits: Limits,
    }

    impl Injectable for BotSettings {
        fn signature() -> Signature {
            (
                Param::<String>::new("decision_bot").with_default("Claude-3-Haiku".to_string()),
                Param::<u32>::new("retries").with_default(3),
                Param::<Limits>::new("limits").auto(),
            )
                .signature()
        }

        fn construct(resolved: &mut Resolved) -> ResolveResult<Self> {
            Ok(Self {
                decision_bot: resolved.take("decision_bot")?,
                retries: resolved.take("retries")?,
                limits: resolved.take("limits")?,
            })
        }
    }

    #[tokio::test]
    async fn test_resolve_from_context() {
        let signature = Param::<String>::new("bot_name").signature();
        let ctx = Context::new().with("bot_name", "EchoBot".to_string());

        let resolved = solve_dependencies(&signature, &ctx).await.unwrap();

        assert_eq!(resolved.get::<String>("bot_name").unwrap(), "EchoBot");
    }

    #[tokio::test]
    async fn test_nested_dependencies() {
        let signature = Param::<u32>::new("multiplier")
            .depends_on(DependsOn::new(
                Param::<u32>::new("base").depends_on(DependsOn::new((), get_base)),
                get_multiplier,
            ))
            .signature();

        let resolved = solve_dependencies(&signature, &Context::new()).await.unwrap();

        assert_eq!(resolved.get::<u32>("multiplier").unwrap(), 20);
    }

    #[tokio::test]
    async fn test_context_entry_wins_over_dependency() {
        let counter = Arc::new(AtomicUsize::new(0));
        let signature = Param::<u32>::new("value")
            .depends_on(DependsOn::new((), counter_factory(&counter)))
            .signature();
        let ctx = Context::new().with("value", 99_u32);

        let resolved = solve_dependencies(&signature, &ctx).await.unwrap();

        assert_eq!(resolved.get::<u32>("value").unwrap(), 99);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_context_entry_feeds_nested_factory() {
        let signature = Param::<u32>::new("multiplier")
            .depends_on(DependsOn::new(
                Param::<u32>::new("base").depends_on(DependsOn::new((), get_base)),
                get_multiplier,
            ))
            .signature();
        let ctx = Context::new().with("base", 4_u32);

        let resolved = solve_dependencies(&signature, &ctx).await.unwrap();

        assert_eq!(resolved.get::<u32>("multiplier").unwrap(), 8);
    }

    #[tokio::test]
    async fn test_async_factory() {
        let signature = Param::<String>::new("greeting")
            .depends_on(DependsOn::new_async(
                Param::<String>::new("user_id"),
                |user_id: String| async move {
                    tokio::task::yield_now().await;
                    format!("hello {user_id}")
                },
            ))
            .signature();
        let ctx = Context::new().with("user_id", "u1".to_string());

        let resolved = solve_dependencies(&signature, &ctx).await.unwrap();

        assert_eq!(resolved.get::<String>("greeting").unwrap(), "hello u1");
    }

    #[tokio::test]
    async fn test_cached_factory_invoked_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let dep = DependsOn::new((), counter_factory(&counter));
        let signature = (
            Param::<u32>::new("first").depends_on(dep.clone()),
            Param::<u32>::new("second").depends_on(dep),
        )
            .signature();

        let resolved = solve_dependencies(&signature, &Context::new()).await.unwrap();

        assert_eq!(resolved.get::<u32>("first").unwrap(), 7);
        assert_eq!(resolved.get::<u32>("second").unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    fn constant(value: u32) -> impl Fn() -> u32 + Send + Sync + 'static {
        move || value
    }

    #[tokio::test]
    async fn test_capturing_factories_cached_separately() {
        let signature = (
            Param::<u32>::new("one").depends_on(DependsOn::new((), constant(1))),
            Param::<u32>::new("two").depends_on(DependsOn::new((), constant(2))),
        )
            .signature();
        let cache = ResolutionCache::new();

        let resolved = solve_with_cache(&signature, &Context::new(), &cache)
            .await
            .unwrap();

        assert_eq!(resolved.get::<u32>("one").unwrap(), 1);
        assert_eq!(resolved.get::<u32>("two").unwrap(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_fn_item_declared_twice_shares_slot() {
        let signature = (
            Param::<u32>::new("first").depends_on(DependsOn::new((), get_base)),
            Param::<u32>::new("second").depends_on(DependsOn::new((), get_base)),
        )
            .signature();
        let cache = ResolutionCache::new();

        solve_with_cache(&signature, &Context::new(), &cache)
            .await
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(DependsOn::new((), get_base).id()));
    }

    #[tokio::test]
    async fn test_uncached_factory_leaves_cache_empty() {
        let signature = Param::<u32>::new("value")
            .depends_on(DependsOn::new((), get_base).no_cache())
            .signature();
        let cache = ResolutionCache::new();

        solve_with_cache(&signature, &Context::new(), &cache)
            .await
            .unwrap();

        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_uncached_factory_invoked_per_use() {
        let counter = Arc::new(AtomicUsize::new(0));
        let dep = DependsOn::new((), counter_factory(&counter)).no_cache();
        let signature = (
            Param::<u32>::new("first").depends_on(dep.clone()),
            Param::<u32>::new("second").depends_on(dep),
        )
            .signature();

        solve_dependencies(&signature, &Context::new()).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_not_shared_between_passes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let signature = Param::<u32>::new("value")
            .depends_on(DependsOn::new((), counter_factory(&counter)))
            .signature();

        solve_dependencies(&signature, &Context::new()).await.unwrap();
        solve_dependencies(&signature, &Context::new()).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_suspending_cached_factory_races_between_siblings() {
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = counter.clone();
        let dep = DependsOn::new_async((), move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                5_u32
            }
        });
        let signature = (
            Param::<u32>::new("first").depends_on(dep.clone()),
            Param::<u32>::new("second").depends_on(dep),
        )
            .signature();

        let resolved = solve_dependencies(&signature, &Context::new()).await.unwrap();

        assert_eq!(resolved.get::<u32>("first").unwrap(), 5);
        assert_eq!(resolved.get::<u32>("second").unwrap(), 5);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_default_used_when_absent() {
        let signature = Param::<u32>::new("retries").with_default(3).signature();

        let resolved = solve_dependencies(&signature, &Context::new()).await.unwrap();

        assert_eq!(resolved.get::<u32>("retries").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_data_type_built_from_defaults() {
        let signature = Param::<BotSettings>::new("settings").auto().signature();

        let resolved = solve_dependencies(&signature, &Context::new()).await.unwrap();

        assert_eq!(
            resolved.get::<BotSettings>("settings").unwrap(),
            BotSettings {
                decision_bot: "Claude-3-Haiku".to_string(),
                retries: 3,
                limits: Limits { max_tokens: 256 },
            }
        );
    }

    #[tokio::test]
    async fn test_data_type_fields_read_context() {
        let signature = Param::<BotSettings>::new("settings").auto().signature();
        let ctx = Context::new()
            .with("retries", 5_u32)
            .with("max_tokens", 1024_u32);

        let resolved = solve_dependencies(&signature, &ctx).await.unwrap();
        let settings = resolved.get::<BotSettings>("settings").unwrap();

        assert_eq!(settings.retries, 5);
        assert_eq!(settings.limits.max_tokens, 1024);
        assert_eq!(settings.decision_bot, "Claude-3-Haiku");
    }

    #[tokio::test]
    async fn test_unresolvable_parameter() {
        let signature = (
            Param::<String>::new("bot_name").with_default("EchoBot".to_string()),
            Param::<String>::new("missing"),
        )
            .signature();

        let err = solve_dependencies(&signature, &Context::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Unresolvable { ref param } if param == "missing"));
    }

    #[tokio::test]
    async fn test_factory_failure_propagates() {
        let signature = Param::<u32>::new("value")
            .depends_on(DependsOn::try_new((), || {
                Err::<u32, _>(std::io::Error::other("backend down"))
            }))
            .signature();

        let err = solve_dependencies(&signature, &Context::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Factory(_)));
        assert_eq!(err.to_string(), "backend down");
    }

    #[test]
    fn test_blocking_entry_point() {
        let signature = (
            Param::<u32>::new("multiplier").depends_on(DependsOn::new(
                Param::<u32>::new("base").depends_on(DependsOn::new((), get_base)),
                get_multiplier,
            )),
            Param::<String>::new("label").depends_on(DependsOn::new_async((), || async {
                "async".to_string()
            })),
        )
            .signature();

        let resolved = solve_dependencies_blocking(&signature, &Context::new()).unwrap();

        assert_eq!(resolved.get::<u32>("multiplier").unwrap(), 20);
        assert_eq!(resolved.get::<String>("label").unwrap(), "async");
    }
}
