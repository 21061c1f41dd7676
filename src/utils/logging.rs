use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

pub struct Logger;

impl Logger {
    pub fn init(verbose: bool) {
        let default_directive = if verbose { "htmlpack=debug" } else { "htmlpack=info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        // A test harness or embedding application may have installed one already
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }

    pub fn build_start(input: &Path, outdir: &Path, root: &Path) {
        info!("📦 htmlpack - asset build");
        info!("═══════════════════════════════════════");
        info!("📄 Entry: {}", input.display());
        info!("📁 Project root: {}", root.display());
        info!("📦 Output: {}", outdir.display());
    }

    pub fn asset_start(reference: &str) {
        debug!("🔨 Building asset: {}", reference);
    }

    pub fn asset_built(reference: &str, output: &str) {
        info!("  • {} → {}", reference, output);
    }

    pub fn asset_reused(reference: &str, output: &str) {
        info!("  • {} → {} (reused)", reference, output);
    }

    pub fn external_skipped(reference: &str) {
        debug!("🌐 Leaving external reference untouched: {}", reference);
    }

    pub fn import_meta(path: &str) {
        debug!("🔗 import-meta {}", path);
    }

    pub fn cache_hit(path: &Path) {
        debug!("♻️  Module cache hit: {}", path.display());
    }

    pub fn build_complete(assets: usize, watch_files: usize, build_time: Duration, output: &Path) {
        info!("");
        info!("📊 Build Statistics:");
        info!("  • Assets built: {}", assets);
        info!("  • Watched files: {}", watch_files);
        info!("  • Build time: {:.2?}", build_time);
        info!("  • Output document: {}", output.display());
        info!("");
        info!("✅ Build completed successfully!");
    }

    pub fn debug(msg: &str) {
        debug!("{}", msg);
    }

    pub fn warn(msg: &str) {
        warn!("⚠️  {}", msg);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
