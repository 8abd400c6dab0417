//! Terminal prompts for conflict resolution.

use async_trait::async_trait;
use dialoguer::Select;
use tracing::warn;

use profilesync_core::prompt::Prompter;

/// Asks on the controlling terminal. Esc or `q` dismisses a prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

#[async_trait]
impl Prompter for DialoguerPrompter {
    async fn select(&self, title: &str, options: &[String]) -> Option<usize> {
        let title = title.to_string();
        let options = options.to_vec();

        // dialoguer blocks on terminal input.
        let result = tokio::task::spawn_blocking(move || {
            Select::new()
                .with_prompt(title)
                .items(&options)
                .default(0)
                .interact_opt()
        })
        .await;

        match result {
            Ok(Ok(choice)) => choice,
            Ok(Err(e)) => {
                warn!(error = %e, "prompt failed, treating as dismissed");
                None
            }
            Err(e) => {
                warn!(error = %e, "prompt task failed, treating as dismissed");
                None
            }
        }
    }
}
