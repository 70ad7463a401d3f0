/// Yes/no question asked before destructive operations.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Answers every question the same way (`--yes`, tests).
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

/// Asks on the terminal. Anything but an explicit yes declines.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptConfirm;

impl Confirmer for PromptConfirm {
    fn confirm(&self, message: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}
