use anyhow::{Context, Result};
use arboard::Clipboard;

use crate::export::to_markdown;
use crate::models::ConversationDetail;

/// Maximum clipboard payload (10MB)
const MAX_CLIPBOARD_SIZE: usize = 10 * 1024 * 1024;

/// Destination for copied text (lets tests avoid the system clipboard)
trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

struct SystemClipboard {
    clipboard: Clipboard,
}

impl SystemClipboard {
    fn new() -> Result<Self> {
        let clipboard = Clipboard::new().context("Failed to initialize clipboard")?;
        Ok(Self { clipboard })
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.clipboard.set_text(text).context("Failed to set clipboard contents")?;
        Ok(())
    }
}

fn validate_clipboard_text(text: &str) -> Result<()> {
    if text.is_empty() {
        anyhow::bail!("Cannot copy empty text to clipboard");
    }

    if text.len() > MAX_CLIPBOARD_SIZE {
        anyhow::bail!(
            "Text too large for clipboard ({} bytes, max {})",
            text.len(),
            MAX_CLIPBOARD_SIZE
        );
    }

    Ok(())
}

fn copy_with_sink(text: &str, sink: &mut dyn ClipboardSink) -> Result<()> {
    validate_clipboard_text(text)?;
    sink.set_text(text)
}

/// Copy text to the system clipboard.
///
/// # Errors
/// Returns error if the text is empty or larger than 10MB, or if the system clipboard
/// is unavailable (headless sessions, missing X11/Wayland clipboard).
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    // Validate before touching the clipboard so headless runs get the real reason
    validate_clipboard_text(text)?;

    let mut clipboard = SystemClipboard::new()?;
    copy_with_sink(text, &mut clipboard)
}

/// Copy a conversation's markdown export to the system clipboard.
pub fn copy_conversation(detail: &ConversationDetail) -> Result<()> {
    copy_to_clipboard(&to_markdown(detail))
}
