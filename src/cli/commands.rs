use crate::core::{models::PipelineReport, services::AssetPipeline};
use crate::infrastructure::{OxcBundleEngine, TokioFileSystemService};
use crate::utils::{CliOverrides, ConfigLoader, Logger, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "htmlpack")]
#[command(about = "htmlpack - build the scripts, styles and images an HTML page references")]
pub struct Cli {
    /// HTML entry file [default: ./index.html]
    #[arg(short = 'i', long)]
    pub input_file: Option<PathBuf>,

    /// Output directory, relative to the project root [default: ./dist]
    #[arg(short = 'o', long)]
    pub output_directory: Option<PathBuf>,

    /// Directory `/…` references resolve from
    #[arg(short = 'p', long, default_value = ".")]
    pub project_root: PathBuf,

    /// Build each distinct reference once and reuse its output
    #[arg(long)]
    pub dedupe: bool,

    /// Also build `<a href>` references
    #[arg(long)]
    pub anchors: bool,

    /// Prefix for rewritten references, e.g. /static/
    #[arg(long)]
    pub public_path: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

pub struct CliHandler;

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self) -> Result<()> {
        let cli = Cli::parse();

        Logger::init(cli.verbose);

        self.handle_build_command(cli).await?;
        Ok(())
    }

    pub async fn handle_build_command(&self, cli: Cli) -> Result<PipelineReport> {
        let file_config = ConfigLoader::load_from_file(&cli.project_root)?;
        let config = ConfigLoader::merge_with_cli(
            file_config,
            cli.project_root,
            CliOverrides {
                input_file: cli.input_file,
                output_directory: cli.output_directory,
                include_anchors: cli.anchors,
                dedupe: cli.dedupe,
                public_path: cli.public_path,
            },
        );

        let pipeline = AssetPipeline::new(
            Arc::new(TokioFileSystemService),
            Arc::new(OxcBundleEngine::new()),
            config,
        );

        pipeline.run().await
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}
