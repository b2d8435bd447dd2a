//! Clipboard bridge to the host OS.

use crate::api::{Error, Result};
use copypasta::{ClipboardContext, ClipboardProvider};

/// Copy text to the system clipboard.
pub fn copy(text: &str) -> Result<()> {
    let mut ctx = ClipboardContext::new()
        .map_err(|e| Error::Validation(format!("clipboard unavailable: {}", e)))?;
    ctx.set_contents(text.to_string())
        .map_err(|e| Error::Validation(format!("clipboard write failed: {}", e)))?;
    Ok(())
}
