use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Logging goes to a file only when requested; stdout belongs to the TUI.
fn init_tracing() {
    let Ok(path) = std::env::var("OVPN_TUI_LOG") else {
        return;
    };
    let Ok(file) = std::fs::File::create(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = ovpn_tui::run().await {
        eprintln!("ovpn-tui failed: {err:#}");
        std::process::exit(1);
    }
}
