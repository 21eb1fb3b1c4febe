//! Page extraction server and CLI.
//!
//! A cross-platform binary exposing the extraction pipeline either as an
//! HTTP service or as a one-shot command.
//!
//! # Usage
//!
//! ## CLI Mode
//! ```bash
//! page-extract-server extract --file page.png --layout-model models/layout.onnx \
//!     --text-det-model models/det.onnx --text-rec-model models/rec.onnx --dict-path models/dict.txt
//! ```
//!
//! ## Server Mode
//! ```bash
//! page-extract-server serve --layout-model models/layout.onnx --port 8000
//! ```

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use page_extract::engine::SharedLayoutEngine;
use page_extract::engine::paddle::{PaddleEngineConfig, PaddleStructureEngine};
use page_extract::server::{ServerConfig, run_server};

#[derive(Parser)]
#[command(name = "page-extract-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Page layout extraction via CLI or HTTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Model configuration shared by both modes.
#[derive(Args)]
struct EngineArgs {
    /// Path to the layout detection model
    #[arg(long = "layout-model", env = "PAGE_LAYOUT_MODEL")]
    layout_model: PathBuf,

    /// Layout model preset name (e.g. PP-DocLayout_plus-L)
    #[arg(long = "layout-model-name", env = "PAGE_LAYOUT_MODEL_NAME")]
    layout_model_name: Option<String>,

    /// Path to the text detection model (enables OCR)
    #[arg(long = "text-det-model", env = "PAGE_TEXT_DET_MODEL")]
    text_det_model: Option<PathBuf>,

    /// Path to the text recognition model (enables OCR)
    #[arg(long = "text-rec-model", env = "PAGE_TEXT_REC_MODEL")]
    text_rec_model: Option<PathBuf>,

    /// Path to the recognition character dictionary (enables OCR)
    #[arg(long = "dict-path", env = "PAGE_DICT_PATH")]
    dict_path: Option<PathBuf>,

    /// Device to use (cpu)
    #[arg(long, default_value = "cpu", env = "PAGE_DEVICE")]
    device: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a single image via CLI
    Extract {
        /// Local image file to process
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Directory for artifacts (figure crops, annotated preview, PDF);
        /// nothing is written when omitted
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,

        /// Render the annotated preview (requires --output-dir)
        #[arg(long, default_value_t = true)]
        annotated: bool,

        /// Also reconstruct a PDF (requires --output-dir)
        #[arg(long, default_value_t = false)]
        pdf: bool,
    },
    /// Start the HTTP server
    Serve {
        #[command(flatten)]
        engine: EngineArgs,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0", env = "PAGE_HOST")]
        host: String,

        /// Port to listen on
        #[arg(long, short, default_value = "8000", env = "PAGE_PORT")]
        port: u16,

        /// Root directory for per-request outputs
        #[arg(long = "output-root", default_value = "outputs", env = "PAGE_OUTPUT_ROOT")]
        output_root: PathBuf,

        /// Location of the served openapi.yaml
        #[arg(long = "spec-path", default_value = "openapi.yaml", env = "PAGE_SPEC_PATH")]
        spec_path: PathBuf,
    },
}

fn build_engine(
    args: &EngineArgs,
) -> Result<SharedLayoutEngine, Box<dyn std::error::Error + Send + Sync>> {
    let config = PaddleEngineConfig {
        layout_model: args.layout_model.clone(),
        layout_model_name: args.layout_model_name.clone(),
        text_det_model: args.text_det_model.clone(),
        text_rec_model: args.text_rec_model.clone(),
        char_dict: args.dict_path.clone(),
        device: args.device.clone(),
    };

    info!("Initializing layout engine...");
    let engine = PaddleStructureEngine::new(&config)?;
    info!("Layout engine initialized successfully");

    Ok(Arc::new(engine))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    page_extract::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            file,
            engine,
            output_dir,
            annotated,
            pdf,
        } => {
            let engine = build_engine(&engine)?;
            cli::process_file(engine.as_ref(), &file, output_dir.as_deref(), annotated, pdf)?;
        }
        Commands::Serve {
            engine,
            host,
            port,
            output_root,
            spec_path,
        } => {
            let engine = build_engine(&engine)?;
            let config = ServerConfig {
                host,
                port,
                output_root,
                spec_path,
            };

            info!("Starting server on {}:{}", config.host, config.port);
            run_server(config, engine).await?;
        }
    }

    Ok(())
}
