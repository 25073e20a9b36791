//! Command handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use uuid::Uuid;
use warraq_core::text::Language;
use warraq_ingest::{IngestConfig, IngestPipeline, PdfParser, PdftoppmRenderer};
use warraq_rag::{MultiHopOptions, RagService};
use warraq_store::DocumentRegistry;
use warraq_vector::{ChunkStore, QdrantChunkStore, QdrantConfig};

use crate::config::{DocumentsAction, ServiceArgs, completion_cascade, embedding_cascade};

fn chunk_store(args: &ServiceArgs) -> anyhow::Result<Arc<dyn ChunkStore>> {
    let store = QdrantChunkStore::connect(QdrantConfig {
        url: args.qdrant_url.clone(),
        api_key: None,
        collection: args.collection.clone(),
    })
    .context("failed to connect to the vector store")?;
    Ok(Arc::new(store))
}

fn registry(args: &ServiceArgs) -> anyhow::Result<DocumentRegistry> {
    DocumentRegistry::open(&args.registry).context("failed to open the document registry")
}

fn rag_service(args: &ServiceArgs, store: Arc<dyn ChunkStore>) -> anyhow::Result<RagService> {
    Ok(RagService::new(
        completion_cascade(args)?,
        embedding_cascade(args)?,
        store,
    ))
}

/// Registers and embeds one PDF.
pub async fn ingest(args: &ServiceArgs, file: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let display_name = match name {
        Some(name) => name.to_string(),
        None => file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string()),
    };

    let registry = registry(args)?;
    let store = chunk_store(args)?;

    let pipeline = IngestPipeline::new(
        completion_cascade(args)?,
        embedding_cascade(args)?,
        registry.clone(),
        store,
        Arc::new(PdfParser::new()),
        Arc::new(PdftoppmRenderer::new()),
        IngestConfig::default(),
    );

    let document = registry.register(&display_name)?;
    println!("registered {} as {}", display_name, document.id);

    let report = pipeline
        .embed_document(document.id, file, |progress| {
            println!(
                "  page {}/{} ({} chunks)",
                progress.page, progress.total_pages, progress.chunks_stored
            );
        })
        .await?;

    println!(
        "done: {} chunks from {} pages ({} skipped)",
        report.chunks_stored, report.pages_processed, report.pages_skipped
    );
    Ok(())
}

/// Asks a question over the selected corpus.
pub async fn ask(
    args: &ServiceArgs,
    question: &str,
    doc_language: Language,
    multi_hop: bool,
    use_reranking: bool,
    use_keyword_search: bool,
) -> anyhow::Result<()> {
    let registry = registry(args)?;
    let corpus = registry.selected_ids()?;
    if corpus.is_empty() {
        println!("no documents selected; ingest or select one first");
        return Ok(());
    }

    let service = rag_service(args, chunk_store(args)?)?;
    let analysis = service.analyze_query(question, doc_language).await?;

    if multi_hop {
        let options = MultiHopOptions {
            response_language: analysis.detected_language,
            ..MultiHopOptions::default()
        };
        let composite = service
            .perform_multi_hop_reasoning(&analysis, &corpus, &options)
            .await?;

        println!(
            "[{} hops, confidence {:.2}]",
            composite.hops_executed, composite.confidence
        );
        println!("{}", composite.context);
        return Ok(());
    }

    let result = service
        .retrieve_smart_context(&analysis, &corpus, use_reranking, use_keyword_search)
        .await?;

    if result.is_empty() {
        println!("no relevant information found");
        return Ok(());
    }

    println!(
        "[strategy {}, confidence {:.2}]",
        result.strategy, result.confidence
    );
    for group in service.group_results(&result) {
        println!("document {} ({})", group.document_id, group.tier);
        for page in &group.pages {
            for chunk in &page.chunks {
                println!("  p.{}: {}", page.page_number, chunk.text);
            }
        }
    }
    Ok(())
}

/// Runs a correction sweep over one document.
pub async fn sweep(args: &ServiceArgs, document_id: Uuid, aggressive: bool) -> anyhow::Result<()> {
    let service = rag_service(args, chunk_store(args)?)?;
    let report = service.sweep_document(document_id, aggressive).await?;

    println!(
        "scanned {}, candidates {}, corrected {}, failed {}",
        report.scanned, report.candidates, report.corrected, report.failed
    );
    Ok(())
}

/// Document registry management.
pub async fn documents(args: &ServiceArgs, action: &DocumentsAction) -> anyhow::Result<()> {
    let registry = registry(args)?;

    match action {
        DocumentsAction::List => {
            for doc in registry.list()? {
                println!(
                    "{}  {:>9}  {:>4}p  {:>5} chunks  {}  {}",
                    doc.id,
                    doc.embedding_status,
                    doc.total_pages,
                    doc.chunks_count,
                    if doc.is_selected { "selected" } else { "        " },
                    doc.display_name
                );
            }
        }
        DocumentsAction::Select { document_id } => {
            registry.set_selected(*document_id, true)?;
            println!("selected {document_id}");
        }
        DocumentsAction::Deselect { document_id } => {
            registry.set_selected(*document_id, false)?;
            println!("deselected {document_id}");
        }
        DocumentsAction::Delete { document_id } => {
            let store = chunk_store(args)?;
            store.delete_document(*document_id).await?;
            if registry.delete(*document_id)? {
                println!("deleted {document_id}");
            } else {
                println!("unknown document {document_id}");
            }
        }
    }
    Ok(())
}
