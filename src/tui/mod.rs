//! Interactive terminal browser for the timeline.
mod app;
mod events;
mod layout;
mod rendering;
mod terminal;
mod timestamps;

use std::sync::Arc;

use anyhow::Result;
pub use app::App;
use tokio::runtime::Handle;
use tracing::error;

use self::terminal::TerminalSession;
use crate::timeline::TimelineStore;

/// Run the interactive TUI until the user quits.
///
/// Initialization runs in the background; the loading and failure screens are driven by
/// the store's phase.
pub fn run_browser(store: Arc<TimelineStore>, runtime: Handle) -> Result<()> {
    let init = Arc::clone(&store);
    runtime.spawn(async move {
        if let Err(e) = init.initialize().await {
            error!(error = %e, "timeline initialization failed");
        }
    });

    let mut session = TerminalSession::open()?;
    let res = App::new(Arc::clone(&store), runtime).run(session.terminal());
    store.dispose();
    session.close()?;

    res
}
