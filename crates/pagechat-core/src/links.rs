use std::process::{Command, Stdio};

use crate::config::TOKEN_SETTINGS_URL;
use crate::error::Result;

/// Platform command that opens `url` in the default browser.
fn opener(url: &str) -> Command {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };
    command.arg(url);
    command
}

/// Open `url` in a new browser context. Fire-and-forget: the child is not awaited.
pub fn open_in_browser(url: &str) -> Result<()> {
    opener(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    tracing::debug!(url, "opened link in browser");
    Ok(())
}

/// Open the page where API tokens are managed.
pub fn open_token_settings() -> Result<()> {
    open_in_browser(TOKEN_SETTINGS_URL)
}
