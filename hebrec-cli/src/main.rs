use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use hebrec_core::entities::{LogicalDocument, LogicalPage};
use hebrec_core::lm::ort_adapter::OrtMaskedLm;
use hebrec_core::lm::{MaskedLmQueue, MaskedLmService};
use hebrec_core::render::{paragraph_bodies, to_docx, to_html, to_plain_text, to_selection_text};
use hebrec_core::tokenizer::Vocab;
use hebrec_core::{multipage, pipeline, ReconstructConfig};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::fmt::Write;
use tokio_util::sync::CancellationToken;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Txt,
    Html,
    Docx,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Reference driver for the Hebrew document reconstruction pipeline",
    long_about = "Reads one word-level OCR TSV file per page (in page order), runs the \
reconstruction pipeline over every page, strips cross-page watermark paragraphs, and \
writes the result as plain text, HTML, or DOCX."
)]
struct Args {
    /// OCR TSV files, one per page, in page order.
    pages: Vec<PathBuf>,

    /// Path to write the rendered output to.
    #[arg(long, short('o'))]
    output: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Txt)]
    format: OutputFormat,

    /// Title embedded in DOCX/HTML output.
    #[arg(long, default_value = "Document")]
    title: String,

    /// Path to the WordPiece vocabulary file (one token per line). Required
    /// to enable masked-LM correction (C6 phases 1-3); omit to run phase 4
    /// rule-based cleanup only.
    #[arg(long, env = "HEBREC_VOCAB_PATH")]
    vocab_path: Option<PathBuf>,

    /// Path to the ONNX masked-LM model. Ignored unless `--vocab-path` is
    /// also given.
    #[arg(long, env = "HEBREC_MODEL_PATH")]
    model_path: Option<PathBuf>,

    /// Maximum number of pages reconstructed concurrently.
    #[arg(long, default_value_t = ReconstructConfig::default().max_concurrent_pages)]
    max_concurrent_pages: usize,

    /// Enable debug-level logging.
    #[arg(long, default_value_t = false, env = "HEBREC_DEBUG")]
    debug: bool,
}

fn setup_progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}")
            .unwrap()
            .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                write!(w, "{:.1}s", state.eta().as_secs_f64()).unwrap()
            })
            .progress_chars("#>-"),
    );
    pb
}

fn build_lm_service(vocab_path: &PathBuf, model_path: &PathBuf) -> anyhow::Result<MaskedLmService> {
    let file = fs::File::open(vocab_path)?;
    let vocab = Vocab::from_reader(std::io::BufReader::new(file))?;
    let model = OrtMaskedLm::load(model_path)?;
    let queue = MaskedLmQueue::new(Arc::new(model));
    Ok(MaskedLmService::new(vocab, queue))
}

fn margin_text_for(page: &multipage::PageContent) -> String {
    let margin_ids: HashSet<_> = page
        .boxes
        .iter()
        .filter(|b| b.is_margin)
        .map(|b| b.id)
        .collect();
    if margin_ids.is_empty() {
        return String::new();
    }
    let rendered = to_selection_text(&page.boxes, &margin_ids);
    rendered
        .strip_prefix("[margin]\n")
        .unwrap_or("")
        .to_string()
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    if args.pages.is_empty() {
        anyhow::bail!("at least one page TSV file must be given");
    }

    let lm = match (&args.vocab_path, &args.model_path) {
        (Some(vocab_path), Some(model_path)) => {
            Some(Arc::new(build_lm_service(vocab_path, model_path)?))
        }
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!("--vocab-path and --model-path must be given together")
        }
        (None, None) => {
            tracing::info!("no masked-LM model configured; running rule-based cleanup only");
            None
        }
    };

    let pages_tsv = args
        .pages
        .iter()
        .map(fs::read_to_string)
        .collect::<Result<Vec<_>, _>>()?;

    let cfg = ReconstructConfig {
        max_concurrent_pages: args.max_concurrent_pages,
        ..ReconstructConfig::default()
    };

    let pb = setup_progress_bar(pages_tsv.len());
    let cancel = CancellationToken::new();

    let results = pipeline::reconstruct_document(pages_tsv, lm, cfg, cancel).await;
    pb.finish_and_clear();

    let mut pages: Vec<multipage::PageContent> = Vec::with_capacity(results.len());
    for (index, page) in results.into_iter().enumerate() {
        match page {
            Some(page) => pages.push(page),
            None => anyhow::bail!("page {} failed to reconstruct", index + 1),
        }
    }

    multipage::remove_watermarks(&mut pages);

    match args.format {
        OutputFormat::Txt => {
            let rendered: Vec<String> = pages
                .iter()
                .map(|p| to_plain_text(&p.structure, &p.boxes))
                .collect();
            fs::write(&args.output, rendered.join("\n\n"))?;
        }
        OutputFormat::Html => {
            let rendered: Vec<String> = pages
                .iter()
                .map(|p| to_html(&p.structure, &p.boxes))
                .collect();
            fs::write(&args.output, rendered.join("\n"))?;
        }
        OutputFormat::Docx => {
            let logical_pages: Vec<LogicalPage> = pages
                .iter()
                .map(|p| LogicalPage {
                    main_text: to_plain_text(&p.structure, &p.boxes),
                    margin_text: margin_text_for(p),
                    paragraph_texts: paragraph_bodies(&p.structure, &p.boxes),
                    structure: p.structure.clone(),
                })
                .collect();
            let doc = LogicalDocument {
                title: args.title.clone(),
                pages: logical_pages,
            };
            let bytes = to_docx(&doc)?;
            fs::write(&args.output, bytes)?;
        }
        OutputFormat::Json => {
            let json = multipage::to_json(&pages)?;
            fs::write(&args.output, json)?;
        }
    }

    tracing::info!("wrote {}", args.output.display());
    Ok(())
}
