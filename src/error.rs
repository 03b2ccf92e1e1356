use thiserror::Error;

/// Failures of the single request sent to the model provider.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("The AI provider returned an error. {0}")]
    Provider(#[from] async_openai::error::OpenAIError),
    #[error("The AI provider returned a response without any choices.")]
    NoChoices,
    #[error("Unable to build the HTTP client. {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Unified application error type to simplify bubbling errors through async flows.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error. {0}")]
    Configuration(String),
    #[error("Error communicating with the AI. {0}")]
    Invocation(#[from] InvocationError),
    #[error("AI did not return the expected function call or valid JSON content. Response: {raw}")]
    MalformedReply { raw: String },
    #[error("Committing failed. {detail}\n\nThe generated message was:\n\n{message}")]
    CommitExecution { message: String, detail: String },
    #[error("Errored while handling a file or process. {0}")]
    Command(#[from] std::io::Error),
    #[error("Error from git. {0}")]
    Git(#[from] git2::Error),
    #[error("Error serializing json. {0}")]
    SerdeJsonSer(#[from] serde_json::Error),
    #[error("Error reading from the terminal. {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("Runtime error. {0}")]
    TokioJoin(#[from] tokio::task::JoinError),
    #[error("Unable to decode the embedded prompt template. {0}")]
    Template(String),
}

/// Convenience alias for results that bubble `AppError`.
pub type AppResult<T> = Result<T, AppError>;
