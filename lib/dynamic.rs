//! Dynamic configuration values.
//!
//! An operator can configure list-valued settings (conda environments,
//! spawner profiles) as a literal list, leave them unset, or point them at a
//! named provider that computes the list on demand. Providers come in two
//! flavours: plain ones that take no input, and context-aware ones that
//! receive the caller's [`CallerContext`] and may be asynchronous.
//!
//! Provider failures (errors and panics) never reach the caller of
//! [`resolve_list`]; they are logged and turn into an empty list. A raw value
//! that has none of the recognized shapes is a hard error.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::CallerContext;
use crate::error::{LaunchError, LaunchResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Key that marks a raw value as a provider reference: `{ provider = "name" }`.
pub const PROVIDER_KEY: &str = "provider";

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// A provider that computes a list without any input.
pub trait ListProvider<T>: Send + Sync {
    fn provide(&self) -> anyhow::Result<Vec<T>>;
}

/// A provider that computes a list for a specific caller.
#[async_trait]
pub trait ContextListProvider<T>: Send + Sync {
    async fn provide(&self, caller: &CallerContext) -> anyhow::Result<Vec<T>>;
}

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A list-valued configuration entry in one of its four shapes.
pub enum DynamicValue<T> {
    /// Already materialized entries.
    List(Vec<T>),
    /// Nothing configured.
    Unset,
    /// Zero-argument provider.
    Callable(Arc<dyn ListProvider<T>>),
    /// Provider that takes the caller context.
    ContextCallable(Arc<dyn ContextListProvider<T>>),
}

/// What resolving a [`DynamicValue`] actually produced.
///
/// [`resolve_list`] flattens this to a plain list; callers that need to tell
/// "nothing configured" from "provider broken" use [`resolve_outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome<T> {
    /// Entries from a static list or a successful provider call.
    Resolved(Vec<T>),
    /// The value was unset.
    NotConfigured,
    /// The provider returned an error or panicked.
    ProviderFailed { message: String },
}

/// Named providers that raw configuration may reference.
pub struct ProviderRegistry<T> {
    providers: BTreeMap<String, DynamicValue<T>>,
}

/// Classifies raw configuration values and resolves them.
pub struct DynamicConfigResolver<T> {
    providers: ProviderRegistry<T>,
}

struct FnProvider<F>(F);

struct ContextFnProvider<F>(F);

struct AsyncContextFnProvider<F>(F);

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<T, F> ListProvider<T> for FnProvider<F>
where
    F: Fn() -> anyhow::Result<Vec<T>> + Send + Sync,
{
    fn provide(&self) -> anyhow::Result<Vec<T>> {
        (self.0)()
    }
}

#[async_trait]
impl<T, F> ContextListProvider<T> for ContextFnProvider<F>
where
    T: Send + 'static,
    F: Fn(&CallerContext) -> anyhow::Result<Vec<T>> + Send + Sync,
{
    async fn provide(&self, caller: &CallerContext) -> anyhow::Result<Vec<T>> {
        (self.0)(caller)
    }
}

#[async_trait]
impl<T, F, Fut> ContextListProvider<T> for AsyncContextFnProvider<F>
where
    T: Send + 'static,
    F: Fn(CallerContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<T>>> + Send + 'static,
{
    async fn provide(&self, caller: &CallerContext) -> anyhow::Result<Vec<T>> {
        (self.0)(caller.clone()).await
    }
}

impl<T: Clone> Clone for DynamicValue<T> {
    fn clone(&self) -> Self {
        match self {
            Self::List(items) => Self::List(items.clone()),
            Self::Unset => Self::Unset,
            Self::Callable(p) => Self::Callable(Arc::clone(p)),
            Self::ContextCallable(p) => Self::ContextCallable(Arc::clone(p)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DynamicValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Unset => f.write_str("Unset"),
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::ContextCallable(_) => f.write_str("ContextCallable(..)"),
        }
    }
}

impl<T> Default for DynamicValue<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Default for ProviderRegistry<T> {
    fn default() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<T: Send + 'static> DynamicValue<T> {
    /// Wrap a zero-argument closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(FnProvider(f)))
    }

    /// Wrap a synchronous closure that takes the caller context.
    pub fn from_context_fn<F>(f: F) -> Self
    where
        F: Fn(&CallerContext) -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
    {
        Self::ContextCallable(Arc::new(ContextFnProvider(f)))
    }

    /// Wrap an asynchronous closure that takes the caller context.
    pub fn from_context_async<F, Fut>(f: F) -> Self
    where
        F: Fn(CallerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<T>>> + Send + 'static,
    {
        Self::ContextCallable(Arc::new(AsyncContextFnProvider(f)))
    }

    /// Short name of the shape, for logs and diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Unset => "unset",
            Self::Callable(_) => "callable",
            Self::ContextCallable(_) => "context callable",
        }
    }
}

impl<T: DeserializeOwned + Clone> DynamicValue<T> {
    /// Classify a raw configuration value.
    ///
    /// `None` and `null` are unset, arrays are static lists, and
    /// `{ provider = "name" }` looks the provider up in `providers`.
    /// Everything else is an [`LaunchError::InvalidConfigurationShape`].
    pub fn classify(
        key: &str,
        raw: Option<&Value>,
        providers: &ProviderRegistry<T>,
    ) -> LaunchResult<Self> {
        match raw {
            Some(Value::Array(items)) => items
                .iter()
                .map(T::deserialize)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List)
                .map_err(|e| LaunchError::InvalidConfigurationShape {
                    key: key.to_string(),
                    observed: format!("array with an invalid entry ({})", e),
                }),
            None | Some(Value::Null) => Ok(Self::Unset),
            Some(Value::Object(map)) if map.len() == 1 => match map.get(PROVIDER_KEY) {
                Some(Value::String(name)) => {
                    providers
                        .get(name)
                        .ok_or_else(|| LaunchError::UnknownProvider {
                            key: key.to_string(),
                            name: name.clone(),
                        })
                }
                _ => Err(invalid_shape(key, raw)),
            },
            Some(_) => Err(invalid_shape(key, raw)),
        }
    }
}

impl<T> ListOutcome<T> {
    /// Flatten to a list; anything but `Resolved` is empty.
    pub fn into_entries(self) -> Vec<T> {
        match self {
            Self::Resolved(items) => items,
            Self::NotConfigured | Self::ProviderFailed { .. } => Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ProviderFailed { .. })
    }
}

impl<T: Send + 'static> ProviderRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zero-argument provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn ListProvider<T>>) {
        self.providers
            .insert(name.into(), DynamicValue::Callable(provider));
    }

    /// Register a context-aware provider.
    pub fn register_context(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn ContextListProvider<T>>,
    ) {
        self.providers
            .insert(name.into(), DynamicValue::ContextCallable(provider));
    }

    /// Register a zero-argument closure.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn() -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
    {
        self.providers.insert(name.into(), DynamicValue::from_fn(f));
    }

    /// Register an asynchronous closure that takes the caller context.
    pub fn register_context_async<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(CallerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<T>>> + Send + 'static,
    {
        self.providers
            .insert(name.into(), DynamicValue::from_context_async(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl<T: Clone> ProviderRegistry<T> {
    /// Look up a provider as a ready-to-resolve value.
    pub fn get(&self, name: &str) -> Option<DynamicValue<T>> {
        self.providers.get(name).cloned()
    }
}

impl<T> DynamicConfigResolver<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    pub fn new(providers: ProviderRegistry<T>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &ProviderRegistry<T> {
        &self.providers
    }

    /// Classify a raw value and resolve it to a list.
    ///
    /// Only shape errors surface; provider failures become an empty list.
    pub async fn resolve_raw(
        &self,
        key: &str,
        raw: Option<&Value>,
        caller: Option<&CallerContext>,
    ) -> LaunchResult<Vec<T>> {
        Ok(self
            .resolve_raw_outcome(key, raw, caller)
            .await?
            .into_entries())
    }

    /// Classify a raw value and resolve it, keeping the outcome distinguishable.
    pub async fn resolve_raw_outcome(
        &self,
        key: &str,
        raw: Option<&Value>,
        caller: Option<&CallerContext>,
    ) -> LaunchResult<ListOutcome<T>> {
        let value = DynamicValue::classify(key, raw, &self.providers)?;
        tracing::debug!("Resolving {} ({})", key, value.shape());
        Ok(resolve_outcome(&value, caller).await)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Resolve a dynamic value to a list.
///
/// Static lists come back as-is, unset values and failing providers as an
/// empty list.
pub async fn resolve_list<T: Clone + Send + 'static>(
    value: &DynamicValue<T>,
    caller: Option<&CallerContext>,
) -> Vec<T> {
    resolve_outcome(value, caller).await.into_entries()
}

/// Resolve a dynamic value, reporting what happened.
///
/// Context-aware providers get `caller`, or an anonymous context when there
/// is none. Zero-argument providers may block, so they run on the blocking
/// pool. The provider call is the only await point.
pub async fn resolve_outcome<T: Clone + Send + 'static>(
    value: &DynamicValue<T>,
    caller: Option<&CallerContext>,
) -> ListOutcome<T> {
    match value {
        DynamicValue::List(items) => ListOutcome::Resolved(items.clone()),
        DynamicValue::Unset => ListOutcome::NotConfigured,
        DynamicValue::ContextCallable(provider) => {
            tracing::info!("Configured value is a context callable, calling now..");
            let caller = caller.cloned().unwrap_or_default();
            let result = AssertUnwindSafe(provider.provide(&caller))
                .catch_unwind()
                .await;
            contain_failure(result)
        }
        DynamicValue::Callable(provider) => {
            tracing::info!("Configured value is a callable, calling now..");
            let provider = Arc::clone(provider);
            match tokio::task::spawn_blocking(move || provider.provide()).await {
                Ok(result) => contain_failure(Ok(result)),
                Err(e) if e.is_panic() => contain_failure(Err(e.into_panic())),
                Err(e) => contain_failure(Ok(Err(anyhow::Error::new(e)))),
            }
        }
    }
}

/// Turn a provider result into an outcome, logging failures.
fn contain_failure<T>(
    result: Result<anyhow::Result<Vec<T>>, Box<dyn Any + Send>>,
) -> ListOutcome<T> {
    match result {
        Ok(Ok(items)) => ListOutcome::Resolved(items),
        Ok(Err(e)) => {
            tracing::error!("Configuration provider failed: {:?}", e);
            ListOutcome::ProviderFailed {
                message: format!("{:#}", e),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("Configuration provider panicked: {}", message);
            ListOutcome::ProviderFailed { message }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "provider panicked".to_string()
    }
}

fn invalid_shape(key: &str, raw: Option<&Value>) -> LaunchError {
    LaunchError::InvalidConfigurationShape {
        key: key.to_string(),
        observed: raw.map(json_type_name).unwrap_or("nothing").to_string(),
    }
}

/// JSON type name of a value.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
