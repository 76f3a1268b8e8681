use std::io::{self, Write};
use std::panic;
use std::sync::Once;

use anyhow::Result;
use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, warn};

pub type BrowserTerminal = Terminal<CrosstermBackend<io::Stdout>>;

static PANIC_HOOK: Once = Once::new();

/// Raw-mode, alternate-screen session for the browser.
///
/// The screen is handed back exactly once: by [`TerminalSession::close`], on drop, or by
/// the panic hook.
pub struct TerminalSession {
    terminal: BrowserTerminal,
    open: bool,
}

impl TerminalSession {
    pub fn open() -> Result<Self> {
        PANIC_HOOK.call_once(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                let _ = release();
                previous(info);
            }));
        });

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("terminal session opened");
        Ok(Self { terminal, open: true })
    }

    pub fn terminal(&mut self) -> &mut BrowserTerminal {
        &mut self.terminal
    }

    /// Leave the session, reporting any failure to restore the screen.
    pub fn close(mut self) -> Result<()> {
        self.open = false;
        release()?;
        debug!("terminal session closed");
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if self.open
            && let Err(e) = release()
        {
            warn!(error = %e, "failed to restore terminal");
        }
    }
}

/// Put stdout back into cooked mode on the main screen.
fn release() -> io::Result<()> {
    let raw = disable_raw_mode();
    reset_screen(&mut io::stdout())?;
    raw
}

fn reset_screen<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, LeaveAlternateScreen, Show)
}
