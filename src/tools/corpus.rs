//! Corpus management tools

use super::{ToolContext, ToolResponse};
use crate::corpus::{resource_id, sanitize_display_name, Corpus};
use crate::error::{Error, Result};
use tracing::{debug, info, warn};

/// Name the caller asked for, or the session's current corpus when empty
pub(crate) fn requested_name(ctx: &ToolContext, corpus_name: &str) -> Result<String> {
    let name = corpus_name.trim();
    if !name.is_empty() {
        return Ok(name.to_string());
    }
    ctx.session.current_corpus().ok_or(Error::NoCurrentCorpus)
}

/// Find a corpus by resource name, trailing id, display name, or sanitized name
pub(crate) fn find_corpus<'a>(corpora: &'a [Corpus], name: &str) -> Option<&'a Corpus> {
    let sanitized = sanitize_display_name(name);
    corpora
        .iter()
        .find(|c| c.resource_name == name || resource_id(&c.resource_name) == name)
        .or_else(|| corpora.iter().find(|c| c.display_name == name))
        .or_else(|| corpora.iter().find(|c| c.display_name == sanitized))
}

/// Resource name of an existing corpus, consulting the session cache first
pub(crate) async fn lookup_corpus(ctx: &ToolContext, name: &str) -> Result<Option<String>> {
    if let Some(resource_name) = ctx.session.known_corpus(name) {
        debug!("Corpus '{}' known to session as {}", name, resource_name);
        return Ok(Some(resource_name));
    }

    let corpora = ctx.service()?.list_corpora().await?;
    Ok(find_corpus(&corpora, name).map(|corpus| {
        ctx.session.remember_corpus(
            &corpus.resource_name,
            [name, corpus.display_name.as_str()],
        );
        corpus.resource_name.clone()
    }))
}

/// Like [`lookup_corpus`] but a missing corpus is an error
pub(crate) async fn require_corpus(ctx: &ToolContext, name: &str) -> Result<String> {
    lookup_corpus(ctx, name)
        .await?
        .ok_or_else(|| Error::CorpusNotFound(name.to_string()))
}

/// Create a corpus unless one with the same name already exists
pub async fn create_corpus(ctx: &ToolContext, corpus_name: &str) -> ToolResponse {
    let name = corpus_name.trim();
    if name.is_empty() {
        return ToolResponse::error("Error creating corpus: a corpus name is required")
            .with("corpus_name", name)
            .with("corpus_created", false);
    }

    match try_create_corpus(ctx, name).await {
        Ok(Some(corpus)) => {
            info!("Created corpus {} ({})", corpus.display_name, corpus.resource_name);
            ToolResponse::success(format!("Successfully created corpus '{}'", name))
                .with("corpus_name", &corpus.resource_name)
                .with("display_name", &corpus.display_name)
                .with("corpus_created", true)
        }
        Ok(None) => ToolResponse::info(format!("Corpus '{}' already exists", name))
            .with("corpus_name", name)
            .with("corpus_created", false),
        Err(e) => ToolResponse::error(format!("Error creating corpus: {}", e))
            .with("corpus_name", name)
            .with("corpus_created", false),
    }
}

async fn try_create_corpus(ctx: &ToolContext, name: &str) -> Result<Option<Corpus>> {
    if lookup_corpus(ctx, name).await?.is_some() {
        return Ok(None);
    }

    let corpus = ctx
        .service()?
        .create_corpus(&sanitize_display_name(name))
        .await?;
    ctx.session
        .remember_corpus(&corpus.resource_name, [name, corpus.display_name.as_str()]);
    ctx.session.set_current_corpus(name);
    Ok(Some(corpus))
}

/// List every corpus the service knows about
pub async fn list_corpora(ctx: &ToolContext) -> ToolResponse {
    let listed = match ctx.service() {
        Ok(service) => service.list_corpora().await,
        Err(e) => Err(e),
    };

    match listed {
        Ok(corpora) => {
            for corpus in &corpora {
                ctx.session.remember_corpus(
                    &corpus.resource_name,
                    [corpus.display_name.as_str()],
                );
            }
            ToolResponse::success(format!("Found {} available corpora", corpora.len()))
                .with("corpora", corpora)
        }
        Err(e) => ToolResponse::error(format!("Error listing corpora: {}", e))
            .with("corpora", Vec::<Corpus>::new()),
    }
}

/// Describe a corpus and the documents in it
///
/// Failure to list the files is not fatal; the corpus is reported with an
/// empty file list.
pub async fn get_corpus_info(ctx: &ToolContext, corpus_name: &str) -> ToolResponse {
    let name = match requested_name(ctx, corpus_name) {
        Ok(name) => name,
        Err(e) => return ToolResponse::error(e.to_string()).with("corpus_name", corpus_name),
    };

    let resource_name = match require_corpus(ctx, &name).await {
        Ok(resource_name) => resource_name,
        Err(e @ Error::CorpusNotFound(_)) => {
            return ToolResponse::error(e.to_string()).with("corpus_name", &name)
        }
        Err(e) => {
            return ToolResponse::error(format!("Error getting corpus information: {}", e))
                .with("corpus_name", &name)
        }
    };

    let files = match ctx.service() {
        Ok(service) => service.list_files(&resource_name).await,
        Err(e) => Err(e),
    }
    .unwrap_or_else(|e| {
        warn!("Could not list files of {}: {}", resource_name, e);
        Vec::new()
    });

    ToolResponse::success(format!(
        "Successfully retrieved information for corpus '{}'",
        name
    ))
    .with("corpus_name", &name)
    .with("corpus_display_name", &name)
    .with("resource_name", &resource_name)
    .with("file_count", files.len())
    .with("files", files)
}

/// Delete a corpus and everything in it; `confirm` must be true
pub async fn delete_corpus(ctx: &ToolContext, corpus_name: &str, confirm: bool) -> ToolResponse {
    let name = corpus_name.trim();
    if !confirm {
        return ToolResponse::error(format!(
            "Deletion of corpus '{}' requires confirmation. Call again with confirm set to true.",
            name
        ))
        .with("corpus_name", name);
    }

    let result = async {
        let resource_name = require_corpus(ctx, name).await?;
        ctx.service()?.delete_corpus(&resource_name).await?;
        ctx.session.forget_corpus(&resource_name);
        Ok::<_, Error>(resource_name)
    }
    .await;

    match result {
        Ok(resource_name) => {
            info!("Deleted corpus {}", resource_name);
            ToolResponse::success(format!("Successfully deleted corpus '{}'", name))
                .with("corpus_name", name)
        }
        Err(e @ Error::CorpusNotFound(_)) => {
            ToolResponse::error(e.to_string()).with("corpus_name", name)
        }
        Err(e) => ToolResponse::error(format!("Error deleting corpus: {}", e))
            .with("corpus_name", name),
    }
}
