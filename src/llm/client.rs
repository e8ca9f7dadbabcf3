use std::sync::Arc;
use std::time::Duration;

use super::error::CompletionError;
use super::providers::{CompletionProvider, GeminiProvider};
use super::retry::{classify, with_retry, RetryError, RetryPolicy};
use crate::config::Settings;

/// Completion client that absorbs upstream rate limiting.
pub struct LlmClient {
    provider: Arc<dyn CompletionProvider>,
    retry_policy: RetryPolicy,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, retry_policy: RetryPolicy) -> Self {
        Self {
            provider,
            retry_policy,
        }
    }

    /// Build a Gemini-backed client from resolved settings.
    ///
    /// A missing API key is passed through as empty; the first request then
    /// fails with the upstream's authentication error.
    pub fn from_settings(settings: &Settings) -> Result<Self, CompletionError> {
        let api_key = settings.get_api_key().unwrap_or_else(|| {
            tracing::debug!("No API key resolved from configuration or environment");
            String::new()
        });

        let provider = GeminiProvider::new(
            api_key,
            settings.model.clone(),
            settings.base_url.clone(),
            settings.temperature,
            settings.request_timeout_secs.map(Duration::from_secs),
        )?;

        Ok(Self::new(Arc::new(provider), settings.retry.policy()))
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Get a completion for `prompt`, retrying only on rate limiting.
    ///
    /// Timeouts and other request failures are returned as-is after one
    /// attempt. Running out of attempts yields
    /// [`CompletionError::RetryExhausted`].
    pub async fn get_completion(&self, prompt: &str) -> Result<String, CompletionError> {
        let provider = self.provider.clone();

        let result = with_retry(&self.retry_policy, classify, || {
            let p = provider.clone();
            async move { attempt(p.as_ref(), prompt).await }
        })
        .await;

        result.map_err(|e| {
            tracing::debug!("Completion failed after {} attempt(s)", e.attempts());
            match e {
                RetryError::Exhausted { attempts, last } => CompletionError::RetryExhausted {
                    attempts,
                    last: Box::new(last),
                },
                fatal => fatal.into_inner(),
            }
        })
    }

    /// One upstream call: no pacing, no retry.
    pub async fn complete_once(&self, prompt: &str) -> Result<String, CompletionError> {
        attempt(self.provider.as_ref(), prompt).await
    }
}

/// Run a single request and report the failure category before handing it on.
async fn attempt(provider: &dyn CompletionProvider, prompt: &str) -> Result<String, CompletionError> {
    match provider.generate(prompt).await {
        Ok(text) => Ok(text),
        Err(e) => {
            match &e {
                CompletionError::RateLimited { status, .. } => {
                    tracing::warn!("Rate limit exceeded at {} (HTTP {})", provider.name(), status);
                }
                CompletionError::Timeout => {
                    tracing::error!("Request to {} timed out", provider.name());
                }
                other => {
                    tracing::error!("Request to {} failed: {}", provider.name(), other);
                }
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays a fixed script of upstream outcomes and counts calls.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, CompletionError>>>,
        fallback: Option<String>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: None,
                calls: AtomicU32::new(0),
            }
        }

        fn always(text: &str) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: Some(text.to_string()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                return next;
            }
            match &self.fallback {
                Some(text) => Ok(format!("{}: {}", text, prompt)),
                None => panic!("script exhausted"),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "stub-model"
        }
    }

    fn rate_limited() -> Result<String, CompletionError> {
        Err(CompletionError::RateLimited {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        })
    }

    fn client_for(provider: &Arc<ScriptedProvider>) -> LlmClient {
        LlmClient::new(provider.clone(), RetryPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            "Rate limits cap how often you may call an API.".to_string(),
        )]));
        let client = client_for(&provider);

        let text = client.get_completion("What are request rate limits?").await;

        assert_eq!(
            text.unwrap(),
            "Rate limits cap how often you may call an API."
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_fifth_attempt() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            Ok("finally".to_string()),
        ]));
        let client = client_for(&provider);
        let start = Instant::now();

        let text = client.get_completion("prompt").await.unwrap();

        assert_eq!(text, "finally");
        assert_eq!(provider.calls(), 5);
        let policy = client.retry_policy();
        let expected = policy.pacing_delay * 5 + policy.wait_interval * 4;
        assert!(start.elapsed() >= expected);
        assert!(start.elapsed() < expected + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_every_attempt_is_exhaustion() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
        ]));
        let client = client_for(&provider);

        let err = client.get_completion("prompt").await.unwrap_err();

        match err {
            CompletionError::RetryExhausted { attempts, last } => {
                assert_eq!(attempts, 5);
                assert!(last.is_rate_limited());
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
        assert_eq!(provider.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_immediately() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(CompletionError::Timeout),
            Ok("never reached".to_string()),
        ]));
        let client = client_for(&provider);

        let err = client.get_completion("prompt").await.unwrap_err();

        assert!(matches!(err, CompletionError::Timeout));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_failure_is_not_wrapped() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(
            CompletionError::Request("connection refused".to_string()),
        )]));
        let client = client_for(&provider);

        let err = client.get_completion("prompt").await.unwrap_err();

        assert!(!err.is_retry_exhausted());
        assert!(matches!(err, CompletionError::Request(ref m) if m == "connection refused"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_fatal_surfaces_fatal() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            rate_limited(),
            Err(CompletionError::Status {
                status: 500,
                message: "internal".to_string(),
            }),
        ]));
        let client = client_for(&provider);

        let err = client.get_completion("prompt").await.unwrap_err();

        assert!(matches!(err, CompletionError::Status { status: 500, .. }));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_do_not_share_attempt_counters() {
        // Four rate limits, then the stub answers forever.
        let provider = Arc::new(ScriptedProvider {
            script: Mutex::new(
                vec![rate_limited(), rate_limited(), rate_limited(), rate_limited()].into(),
            ),
            fallback: Some("echo".to_string()),
            calls: AtomicU32::new(0),
        });
        let client = client_for(&provider);

        let first = client.get_completion("same").await.unwrap();
        assert_eq!(provider.calls(), 5);

        // A second call starts from a fresh budget and succeeds at once.
        let second = client.get_completion("same").await.unwrap();
        assert_eq!(provider.calls(), 6);
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_once_skips_retry_and_pacing() {
        let provider = Arc::new(ScriptedProvider::new(vec![rate_limited()]));
        let client = client_for(&provider);
        let start = Instant::now();

        let err = client.complete_once("Hello AI!").await.unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(provider.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_complete_once_returns_text() {
        let provider = Arc::new(ScriptedProvider::always("hi"));
        let client = client_for(&provider);

        let text = tokio_test::assert_ok!(client.complete_once("there").await);
        assert_eq!(text, "hi: there");
        assert_eq!(client.model(), "stub-model");
    }
}
