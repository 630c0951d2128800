use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use omnifeed_retriever::{HandlerRegistry, InvocationResult, RetrievalContext, RetrievalResult, Retriever, ResultType};
use omnifeed_scoring::{select_retrievers, RetrieverScorer};
use omnifeed_store::Store;

/// Drives retriever invocation: dispatches to the handler registry, recurses
/// through sub-retrievers within a depth cap, and guarantees termination via
/// a per-traversal seen-set on `uri`.
pub struct Orchestrator {
    store: Arc<dyn Store>,
    handlers: Arc<HandlerRegistry>,
    scorer: Arc<RetrieverScorer>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, handlers: Arc<HandlerRegistry>, scorer: Arc<RetrieverScorer>) -> Self {
        Self {
            store,
            handlers,
            scorer,
        }
    }

    /// Invoke a single retriever and recurse into any sub-retrievers it
    /// discovers, up to `ctx.max_depth`. `seen` is shared across the whole
    /// traversal so DAG back-edges cannot cause infinite descent.
    pub async fn invoke(
        &self,
        retriever: &Retriever,
        ctx: &RetrievalContext,
        depth: u32,
        seen: &mut HashSet<String>,
    ) -> Result<InvocationResult> {
        if seen.contains(&retriever.uri) {
            return Ok(InvocationResult::default());
        }
        seen.insert(retriever.uri.clone());

        let mut result = InvocationResult::default();

        let handler = match self.handlers.by_handler_type(&retriever.handler_type) {
            Some(h) => h,
            None => {
                result
                    .errors
                    .push(format!("no handler registered for type: {}", retriever.handler_type));
                return Ok(result);
            }
        };

        let invoked = handler.invoke(retriever, ctx).await;
        let raw_results = match invoked {
            Ok(results) => {
                self.store
                    .update_retriever_invoked(&retriever.id, Utc::now())
                    .await?;
                results
            }
            Err(e) => {
                result.errors.push(format!("{}: {e}", retriever.id));
                return Ok(result);
            }
        };

        for item in raw_results {
            match item.result_type {
                ResultType::Content => {
                    if let Some(content) = item.item {
                        result.items.push(content);
                    }
                }
                ResultType::Retriever => {
                    if let Some(mut sub) = item.retriever {
                        if seen.contains(&sub.uri) {
                            continue;
                        }
                        sub.parent_id = Some(retriever.id.clone());
                        sub.depth = depth + 1;

                        let already_existed = self.store.get_retriever_by_uri(&sub.uri).await?.is_some();
                        let persisted = self.store.upsert_retriever(sub).await?;
                        if !already_existed {
                            result.new_retrievers.push(persisted.clone());
                        }

                        if depth < ctx.max_depth {
                            let child_result =
                                Box::pin(self.invoke(&persisted, ctx, depth + 1, seen)).await?;
                            result.merge(child_result);
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    /// Select retrievers for a feed build via the scorer's explore/exploit
    /// policy, invoke each (fresh seen-set), and merge their results.
    pub async fn invoke_for_feed(&self, ctx: &RetrievalContext) -> Result<InvocationResult> {
        let candidates = self.store.list_retrievers(ctx.include_disabled).await?;
        let selection = select_retrievers(candidates, ctx.max_results, ctx.explore_ratio, 0.3);

        let mut result = InvocationResult::default();
        let mut seen = HashSet::new();

        for retriever in selection.all() {
            let r = self.invoke(&retriever, ctx, retriever.depth, &mut seen).await?;
            result.merge(r);
        }

        Ok(result)
    }

    pub fn scorer(&self) -> &RetrieverScorer {
        &self.scorer
    }
}
