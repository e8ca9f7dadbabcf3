mod client;
mod error;
mod providers;
mod rag;
mod retry;

pub use client::LlmClient;
pub use error::CompletionError;
#[allow(unused_imports)]
pub use providers::{CompletionProvider, GeminiProvider, DEFAULT_BASE_URL};
pub use rag::{is_retry_exhausted, RagAnswer, RagConfig, RagContext};
#[allow(unused_imports)]
pub use retry::{classify, with_retry, RetryDecision, RetryError, RetryPolicy};
