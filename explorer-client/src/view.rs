use crate::app::{Command, Navigator, View};
use crate::models::{TransferProgress, UserProfile};
use crate::operations::Listing;
use chrono::Local;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::task::JoinHandle;

/// Line-oriented view on stdout.
#[derive(Default)]
pub struct TerminalView;

impl TerminalView {
    fn print(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

impl View for TerminalView {
    fn alert(&self, message: &str) {
        self.print(&format!("!! {}", message));
    }

    fn status(&self, message: &str) {
        self.print(message);
    }

    fn show_user(&self, profile: Option<&UserProfile>) {
        match profile {
            Some(profile) => self.print(&format!("Signed in as {}", profile.display_name())),
            None => self.print("Not signed in. Type `login` to sign in."),
        }
    }

    fn show_listing(&self, listing: &Listing) {
        if let Some(notice) = listing.notice() {
            self.print(notice);
            return;
        }
        for item in listing.items() {
            let modified = item
                .last_modified
                .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            self.print(&format!(
                "{:<48} {:>12}  Modified: {}",
                item.key,
                item.display_size(),
                modified
            ));
        }
    }

    fn show_progress(&self, progress: &TransferProgress) {
        self.print(&format!("Uploading {}... {}%", progress.key, progress.percent()));
    }
}

/// Opens URLs in the system browser, printing them as a fallback.
#[derive(Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &str) {
        println!("Open this URL in your browser:\n  {}", url);

        let opener = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "windows") {
            "explorer"
        } else {
            "xdg-open"
        };
        if let Err(e) = launch(opener, url) {
            tracing::debug!("Could not launch {}: {}", opener, e);
        }
    }
}

/// Start `program url` and reap it in the background once it exits.
fn launch(program: &str, url: &str) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = tokio::process::Command::new(program).arg(url).spawn()?;
    let program = program.to_string();

    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                if !status.success() {
                    tracing::debug!(%status, "{} exited unsuccessfully", program);
                }
                Some(status)
            }
            Err(e) => {
                tracing::debug!("Waiting on {} failed: {}", program, e);
                None
            }
        }
    }))
}

pub const HELP: &str = "\
Commands:
  login                  sign in through the hosted page
  callback <code>        finish sign-in with a code pasted from the browser
  logout                 sign out
  ls | refresh           list files
  upload <path>...       upload one or more files
  download <key>         save a file to the download directory
  rename <key> <new>     rename a file (copy, then delete)
  quit                   exit
Quote names that contain spaces.";

/// Parse one input line. `Ok(None)` for blank lines and `help`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let words = split_words(line)?;
    let Some((verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (verb.as_str(), args) {
        ("help", _) => return Ok(None),
        ("login", []) => Command::SignIn,
        ("logout", []) => Command::SignOut,
        ("ls" | "refresh", []) => Command::Refresh,
        ("quit" | "exit", []) => Command::Quit,
        ("callback", [code]) => Command::Callback { code: code.clone() },
        ("upload", paths) if !paths.is_empty() => {
            Command::Upload(paths.iter().map(PathBuf::from).collect())
        }
        ("download", [key]) => Command::Download(key.clone()),
        ("rename", [from, to]) => Command::Rename {
            from: from.clone(),
            to: to.clone(),
        },
        (verb, _) => return Err(format!("Unknown or malformed command `{}`", verb)),
    };
    Ok(Some(command))
}

fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err("Unterminated quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
