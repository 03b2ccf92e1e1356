use std::fmt::{Display, Formatter};

use tracing::debug;

use crate::AppResult;
use crate::ai::normalize::normalize;
use crate::ai::prompt::CommitPrompt;
use crate::ai::schema::SchemaContract;
use crate::ai::{ModelInvoker, RenderedPrompt};
use crate::config::Config;
use crate::confirm::Confirmer;
use crate::git::{CommitExecutor, DiffSource};

/// Where a single generation attempt currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    DiffFetched,
    NoOpExit,
    PromptBuilt,
    Invoked,
    Normalized,
    Formatted,
    AwaitingConfirmation,
    Committed,
    Cancelled,
    Failed,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::DiffFetched => "diff fetched",
            Stage::NoOpExit => "nothing to do",
            Stage::PromptBuilt => "prompt built",
            Stage::Invoked => "model invoked",
            Stage::Normalized => "reply normalized",
            Stage::Formatted => "message formatted",
            Stage::AwaitingConfirmation => "awaiting confirmation",
            Stage::Committed => "committed",
            Stage::Cancelled => "cancelled",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How a successful run ended. Failures are the `Err` side of [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NothingStaged,
    Committed(String),
    Cancelled(String),
    /// The message was generated but neither confirmed nor committed.
    DryRun(String),
}

/// Sequences one commit-message generation from staged diff to commit.
pub struct Pipeline<'a, D, I, C, E> {
    diff_source: &'a D,
    invoker: &'a I,
    confirmer: &'a C,
    executor: &'a E,
    config: &'a Config,
    prompt: CommitPrompt,
    contract: SchemaContract,
    dry_run: bool,
    stage: Stage,
}

impl<'a, D, I, C, E> Pipeline<'a, D, I, C, E>
where
    D: DiffSource,
    I: ModelInvoker,
    C: Confirmer,
    E: CommitExecutor,
{
    pub fn new(
        diff_source: &'a D,
        invoker: &'a I,
        confirmer: &'a C,
        executor: &'a E,
        config: &'a Config,
        prompt: CommitPrompt,
    ) -> Self {
        Self {
            diff_source,
            invoker,
            confirmer,
            executor,
            config,
            prompt,
            contract: SchemaContract::commit_message(),
            dry_run: false,
            stage: Stage::Idle,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The last stage reached; `Failed` after an error.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        debug!("{} -> {}", self.stage, next);
        self.stage = next;
    }

    /// Run every stage in order. Any error moves the attempt to
    /// [`Stage::Failed`]; nothing is committed after a failure.
    pub async fn run(&mut self) -> AppResult<Outcome> {
        let result = self.run_stages().await;
        if let Err(e) = &result {
            debug!("Error after stage '{}': {e}", self.stage);
            self.advance(Stage::Failed);
        }
        result
    }

    async fn run_stages(&mut self) -> AppResult<Outcome> {
        let diff = self.diff_source.staged_diff().await?.unwrap_or_default();
        self.advance(Stage::DiffFetched);
        if diff.trim().is_empty() {
            self.advance(Stage::NoOpExit);
            return Ok(Outcome::NothingStaged);
        }

        let prompt: RenderedPrompt = self.prompt.render(&diff, &self.config.output_language);
        self.advance(Stage::PromptBuilt);

        let reply = self
            .invoker
            .invoke(
                &prompt,
                &self.contract,
                &self.config.model,
                self.config.temperature,
            )
            .await?;
        self.advance(Stage::Invoked);

        let draft = normalize(&reply, &self.contract)?;
        self.advance(Stage::Normalized);

        let message = draft.to_string();
        self.advance(Stage::Formatted);

        if self.dry_run {
            return Ok(Outcome::DryRun(message));
        }

        self.advance(Stage::AwaitingConfirmation);
        if !self.confirmer.confirm(&message).await? {
            self.advance(Stage::Cancelled);
            return Ok(Outcome::Cancelled(message));
        }

        self.executor.commit(&message).await?;
        self.advance(Stage::Committed);
        Ok(Outcome::Committed(message))
    }
}
