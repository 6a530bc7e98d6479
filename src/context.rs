//! Request middleware: attaches entity lookups to each update context
//!
//! [`Wikibase`] owns the shared state (entity cache, resource keys,
//! configuration). For every incoming update, [`Wikibase::attach`] resolves
//! the user's language and hangs a [`WikibaseContext`] onto the framework's
//! context under the configured key.
//!
//! ## Session contract
//!
//! The framework owns the session. The only field read or written here is
//! `__wikibase_language_code`; everything else is carried through untouched
//! in [`Session::extra`].

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{EntityCache, EntityId, EntityStore};
use crate::config::WikibaseConfig;
use crate::error::{Result, WikibaseError};
use crate::fetch::EntityFetcher;
use crate::locale::{self, LocaleProgress};
use crate::reader::EntityReader;
use crate::resource_keys::ResourceKeyRegistry;

/// Session record shared between the framework and the middleware
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Stored language preference
    #[serde(
        rename = "__wikibase_language_code",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub wikibase_language_code: Option<String>,

    /// Fields owned by the framework or other middlewares
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Session handle as kept by the framework
pub type SharedSession = Arc<RwLock<Session>>;

/// What the middleware needs from a chat framework's per-update context
pub trait UpdateContext {
    /// Session of the chat, if the framework keeps one
    fn session(&self) -> Option<SharedSession>;

    /// Language declared by the sender of the update
    fn from_language_code(&self) -> Option<String>;

    /// Attach the request facade under `key`
    fn insert_wikibase(&mut self, key: &str, wikibase: WikibaseContext);
}

/// Shared entity lookup state of one bot
pub struct Wikibase {
    cache: EntityCache,
    resource_keys: ResourceKeyRegistry,
    config: WikibaseConfig,
}

impl Wikibase {
    /// Create with the in-process memory store
    pub fn new(fetcher: Arc<dyn EntityFetcher>, config: WikibaseConfig) -> Result<Self> {
        config.validate()?;
        let cache = EntityCache::new(fetcher, config.clone());
        Ok(Self::from_parts(cache, config))
    }

    /// Create with a custom store backend
    pub fn with_store(
        fetcher: Arc<dyn EntityFetcher>,
        store: Arc<dyn EntityStore>,
        config: WikibaseConfig,
    ) -> Result<Self> {
        config.validate()?;
        let cache = EntityCache::with_store(fetcher, store, config.clone());
        Ok(Self::from_parts(cache, config))
    }

    fn from_parts(cache: EntityCache, config: WikibaseConfig) -> Self {
        Self {
            cache,
            resource_keys: ResourceKeyRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &WikibaseConfig {
        &self.config
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn resource_keys(&self) -> &ResourceKeyRegistry {
        &self.resource_keys
    }

    /// Register resource keys, see [`ResourceKeyRegistry::add_resource_keys`]
    pub async fn add_resource_keys<I, K, V>(&self, mapping: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        self.resource_keys.add_resource_keys(mapping).await
    }

    /// Resolve a resource key or raw identifier
    pub async fn entity_id_from_key(&self, key_or_id: &str) -> Result<EntityId> {
        self.resource_keys.entity_id_from_key(key_or_id).await
    }

    /// Reader for a resource key or identifier in the given language
    pub async fn reader(&self, key_or_id: &str, language_code: &str) -> Result<EntityReader> {
        let id = self.entity_id_from_key(key_or_id).await?;
        let entity = self.cache.get(&id).await?;
        Ok(EntityReader::new(id, entity, language_code))
    }

    /// Warm the cache for resource keys or identifiers
    ///
    /// Every key is validated before anything is fetched.
    pub async fn preload<I, S>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids = Vec::new();
        for key in keys {
            ids.push(self.entity_id_from_key(key.as_ref()).await?);
        }
        self.cache.preload(ids).await
    }

    /// Label coverage per language over all resource-key entities
    pub async fn all_locale_progress(&self) -> Result<LocaleProgress> {
        let ids = self.resource_keys.entity_ids().await;
        let entities = self.cache.get_many(ids, false).await?;
        Ok(locale::all_locale_progress(
            entities.values().map(|entity| entity.as_ref()),
        ))
    }

    /// Label coverage of one language
    pub async fn locale_progress(&self, language_code: &str, use_base: bool) -> Result<f64> {
        let progress = self.all_locale_progress().await?;
        Ok(locale::locale_progress(&progress, language_code, use_base))
    }

    /// Languages covered above `threshold` (configured default when `None`)
    pub async fn available_locales(&self, threshold: Option<f64>) -> Result<Vec<String>> {
        let threshold = threshold.unwrap_or(self.config.available_locales_threshold);
        let progress = self.all_locale_progress().await?;
        Ok(locale::available_locales(&progress, threshold))
    }

    /// Fetch every resource-key entity again, returning how many resolved
    pub async fn refresh_resource_keys(&self) -> Result<usize> {
        let ids = self.resource_keys.entity_ids().await;
        let refreshed = self.cache.refresh(ids).await?;
        Ok(refreshed.len())
    }

    /// Language for an update: session preference, sender language, then the default
    pub async fn resolve_language(
        &self,
        session: Option<&SharedSession>,
        from_language_code: Option<&str>,
    ) -> String {
        if let Some(session) = session {
            if let Some(code) = session.read().await.wikibase_language_code.clone() {
                return code;
            }
        }

        from_language_code
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_language_code.clone())
    }

    /// Middleware step: attach a [`WikibaseContext`] to the update context
    ///
    /// The resolved language is written back to the session when there is one.
    pub async fn attach<C: UpdateContext>(self: &Arc<Self>, ctx: &mut C) -> Result<()> {
        let session = ctx.session();
        let from = ctx.from_language_code();
        let language_code = self.resolve_language(session.as_ref(), from.as_deref()).await;

        if let Some(session) = &session {
            session.write().await.wikibase_language_code = Some(language_code.clone());
        }

        debug!(
            "Attaching wikibase context as {:?} (language: {})",
            self.config.context_key, language_code
        );

        let facade = WikibaseContext {
            wikibase: Arc::clone(self),
            language_code,
            session,
        };
        ctx.insert_wikibase(&self.config.context_key, facade);
        Ok(())
    }

    /// Sweep expired entries out of the store every `cleanup_interval`
    ///
    /// Stops once the `Wikibase` is dropped.
    pub fn start_cleanup(&self) -> JoinHandle<()> {
        self.cache.start_auto_cleanup()
    }

    /// Keep resource-key entities warm by refreshing them every `ttl * refresh_factor`
    ///
    /// Failures go to `on_error` as [`WikibaseError::Refresh`]; the task keeps
    /// running and stops once the `Wikibase` is dropped.
    pub fn start_refresh<F>(self: &Arc<Self>, on_error: F) -> JoinHandle<()>
    where
        F: Fn(WikibaseError) + Send + Sync + 'static,
    {
        let interval = self.config.refresh_interval();
        let weak: Weak<Self> = Arc::downgrade(self);

        info!("Starting periodic entity refresh (interval: {:?})", interval);

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let Some(wikibase) = weak.upgrade() else {
                    debug!("Wikibase dropped, stopping periodic refresh");
                    break;
                };

                match wikibase.refresh_resource_keys().await {
                    Ok(count) => debug!("Periodic refresh: {} entities", count),
                    Err(e) => {
                        warn!("Periodic refresh failed: {}", e);
                        on_error(e.into_refresh());
                    }
                }
            }
        })
    }
}

/// Request-scoped facade attached to each update context
#[derive(Clone)]
pub struct WikibaseContext {
    wikibase: Arc<Wikibase>,
    language_code: String,
    session: Option<SharedSession>,
}

impl WikibaseContext {
    /// Language of this request
    pub fn locale(&self) -> &str {
        &self.language_code
    }

    /// Override the language, stored in the session for later updates
    pub async fn set_locale(&mut self, language_code: impl Into<String>) -> &str {
        self.language_code = language_code.into();
        if let Some(session) = &self.session {
            session.write().await.wikibase_language_code = Some(self.language_code.clone());
        }
        &self.language_code
    }

    /// Reader for a resource key or identifier in the request language
    pub async fn reader(&self, key_or_id: &str) -> Result<EntityReader> {
        self.wikibase.reader(key_or_id, &self.language_code).await
    }

    /// Short alias of [`WikibaseContext::reader`]
    pub async fn r(&self, key_or_id: &str) -> Result<EntityReader> {
        self.reader(key_or_id).await
    }

    pub async fn preload<I, S>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.wikibase.preload(keys).await
    }

    /// Progress of `language_code`, the request language when `None`
    pub async fn locale_progress(&self, language_code: Option<&str>, use_base: bool) -> Result<f64> {
        let code = language_code.unwrap_or(&self.language_code);
        self.wikibase.locale_progress(code, use_base).await
    }

    pub async fn all_locale_progress(&self) -> Result<LocaleProgress> {
        self.wikibase.all_locale_progress().await
    }

    pub async fn available_locales(&self, threshold: Option<f64>) -> Result<Vec<String>> {
        self.wikibase.available_locales(threshold).await
    }

    /// The shared state behind this facade
    pub fn wikibase(&self) -> &Arc<Wikibase> {
        &self.wikibase
    }
}
