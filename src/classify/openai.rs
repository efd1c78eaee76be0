use async_openai::types::embeddings::CreateEmbeddingRequestArgs;
use async_openai::{Client, config::Config};
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::AppResult;
use crate::classify::traits::Embedder;

/// Embedding implementation that uses an OpenAI-compatible API.
#[derive(Clone)]
pub struct OAIEmbedder<'a, C: Config> {
    client: &'a Client<C>,
    model: String,
}

impl<'a, C: Config> OAIEmbedder<'a, C> {
    pub fn new(client: &'a Client<C>, model: String) -> Self {
        Self { client, model }
    }
}

impl<'a, C: Config> Embedder for OAIEmbedder<'a, C> {
    fn embed<'e>(&'e self, texts: &'e [String]) -> BoxFuture<'e, AppResult<Vec<Vec<f32>>>> {
        async move {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(texts.to_vec())
                .build()?;

            let response = self.client.embeddings().create(request).await?;
            debug!(
                "Embedded {} texts with {}",
                response.data.len(),
                response.model
            );

            // Providers are not required to return rows in request order.
            let mut data = response.data;
            data.sort_by_key(|d| d.index);
            Ok(data.into_iter().map(|d| d.embedding).collect())
        }
        .boxed()
    }
}
