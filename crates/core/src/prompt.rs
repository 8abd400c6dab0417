//! Interactive choice seam.
//!
//! The resolver never talks to a terminal or editor directly. It asks a
//! [`Prompter`] to pick one of a list of labelled options, and treats `None`
//! as an explicit "no selection" (the user dismissed the prompt).

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

/// Provides single-choice prompts to the resolver.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Present `options` under `title` and return the chosen index, or
    /// `None` when the user makes no selection.
    async fn select(&self, title: &str, options: &[String]) -> Option<usize>;
}

/// A [`Prompter`] that replays a fixed list of answers.
///
/// Once the script runs out every further prompt returns `None`. Titles of
/// every prompt shown are recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Option<usize>>>,
    shown: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Create a prompter answering with `answers` in order.
    pub fn new(answers: impl IntoIterator<Item = Option<usize>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Titles of the prompts shown so far, in order.
    pub fn shown(&self) -> Vec<String> {
        self.shown
            .lock()
            .map(|shown| shown.clone())
            .unwrap_or_default()
    }

    /// Number of prompts shown so far.
    pub fn prompt_count(&self) -> usize {
        self.shown.lock().map(|shown| shown.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn select(&self, title: &str, options: &[String]) -> Option<usize> {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(title.to_string());
        }
        let answer = self.answers.lock().ok()?.pop_front().flatten()?;
        (answer < options.len()).then_some(answer)
    }
}
