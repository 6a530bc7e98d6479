//! Bulk fetch collaborator
//!
//! The cache never talks to a knowledge base itself. The embedding
//! application supplies an [`EntityFetcher`] that resolves a batch of
//! identifiers in one call.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;

use crate::cache::types::{Entity, EntityId};
use crate::error::Result;

/// Options forwarded to every bulk fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Identifying tag for outbound requests
    pub user_agent: String,
}

/// Resolves many identifiers in one call
///
/// Identifiers missing from the returned map are treated as not existing
/// upstream; they are omitted from lookup results rather than reported
/// as errors.
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    async fn fetch_entities(
        &self,
        ids: &[EntityId],
        options: &FetchOptions,
    ) -> Result<HashMap<EntityId, Entity>>;
}

/// Adapter turning a closure into an [`EntityFetcher`]
///
/// ```
/// use futures::FutureExt;
/// use std::collections::HashMap;
/// use wikibase_context::fetch::FnFetcher;
///
/// let fetcher = FnFetcher::new(|ids, _options| {
///     async move {
///         let _ = ids;
///         Ok::<_, wikibase_context::WikibaseError>(HashMap::new())
///     }
///     .boxed()
/// });
/// # let _ = fetcher;
/// ```
pub struct FnFetcher<F> {
    func: F,
}

impl<F> FnFetcher<F>
where
    F: Fn(Vec<EntityId>, FetchOptions) -> BoxFuture<'static, Result<HashMap<EntityId, Entity>>>
        + Send
        + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> EntityFetcher for FnFetcher<F>
where
    F: Fn(Vec<EntityId>, FetchOptions) -> BoxFuture<'static, Result<HashMap<EntityId, Entity>>>
        + Send
        + Sync,
{
    async fn fetch_entities(
        &self,
        ids: &[EntityId],
        options: &FetchOptions,
    ) -> Result<HashMap<EntityId, Entity>> {
        (self.func)(ids.to_vec(), options.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WikibaseError;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_fn_fetcher_forwards_ids_and_options() {
        let fetcher = FnFetcher::new(|ids: Vec<EntityId>, options: FetchOptions| {
            async move {
                assert_eq!(options.user_agent, "test-agent");
                Ok(ids
                    .into_iter()
                    .map(|id| (id.clone(), Entity::item(id)))
                    .collect::<HashMap<_, _>>())
            }
            .boxed()
        });

        let ids = vec![EntityId::new("Q1").unwrap(), EntityId::new("Q2").unwrap()];
        let options = FetchOptions {
            user_agent: "test-agent".to_string(),
        };

        let entities = fetcher.fetch_entities(&ids, &options).await.unwrap();
        assert_eq!(entities.len(), 2);
        assert!(entities.contains_key(&ids[1]));
    }

    #[tokio::test]
    async fn test_fn_fetcher_propagates_errors() {
        let fetcher = FnFetcher::new(|_ids, _options| {
            async { Err::<HashMap<EntityId, Entity>, _>(WikibaseError::Fetch("offline".to_string())) }
                .boxed()
        });

        let options = FetchOptions {
            user_agent: String::new(),
        };
        let result = fetcher
            .fetch_entities(&[EntityId::new("Q1").unwrap()], &options)
            .await;
        assert_eq!(result, Err(WikibaseError::Fetch("offline".to_string())));
    }
}
