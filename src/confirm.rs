use clap::builder::styling::{AnsiColor, Color, Style};
use dialoguer::Confirm;
use tracing::debug;

use crate::AppResult;

/// Asks the user whether the generated message should be committed.
pub trait Confirmer {
    async fn confirm(&self, message: &str) -> AppResult<bool>;
}

const MESSAGE_STYLE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));

/// The question shown to the user, with the message highlighted when
/// `color` is set.
pub fn confirmation_prompt(message: &str, color: bool) -> String {
    let style = if color { MESSAGE_STYLE } else { Style::new() };
    format!("Use the following commit message?\n\n{style}{message}{style:#}\n")
}

/// Yes/no prompt on the controlling terminal. Esc or `q` counts as no.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm {
    color: bool,
}

impl TerminalConfirm {
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl Confirmer for TerminalConfirm {
    async fn confirm(&self, message: &str) -> AppResult<bool> {
        let prompt = confirmation_prompt(message, self.color);
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(true)
                .interact_opt()
        })
        .await??;
        debug!("Confirmation answer: {answer:?}");
        Ok(answer.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_shows_the_whole_message() {
        let message = "feat(cli): add flag\n\n- one\n- two";
        let prompt = confirmation_prompt(message, true);
        assert!(prompt.starts_with("Use the following commit message?\n\n"));
        assert!(prompt.contains(message));
        assert!(prompt.contains('\x1b'));
        assert!(prompt.ends_with('\n'));
    }

    #[test]
    fn plain_prompt_has_no_escape_codes() {
        let message = "fix: correct null check";
        assert_eq!(
            confirmation_prompt(message, false),
            "Use the following commit message?\n\nfix: correct null check\n"
        );
    }
}
