// src/provider/dispatch.rs — Rate-limit-aware request dispatch
//
// One call = one bounded attempt loop, written as an explicit state
// machine so the attempt budget is easy to reason about:
//
//   Attempt ──ok──────────────────────────▶ done
//      │429          rotation ok: retry immediately, counter resets
//      ├────────▶ Rotate ──────────────────▶ Attempt
//      │             │ pool exhausted
//      │             ▼
//      │          BackOff (wait, re-check for newly added keys)
//      │5xx/timeout   │ budget spent: QuotaExhausted / Network
//      └────────▶ BackOff
//
// Auth failures rotate at most once to a fresh key; a second consecutive
// auth failure aborts. Content-policy blocks are never retried.
// Everything resolvable here (rotation, backoff) is absorbed; only
// terminal errors surface to the pipeline.

use std::sync::Arc;
use std::time::Duration;

use super::classify::{ErrorClassifier, ErrorKind};
use super::pool::SharedPool;
use super::{GenerateBackend, GenerateRequest, GenerateResponse, RequestKind};
use crate::infra::config::DispatchConfig;
use crate::infra::errors::PanelForgeError;
use crate::notify::Notifier;

enum Step {
    Attempt,
    Rotate { message: String },
    BackOff { message: String, rate_limited: bool },
}

pub struct Dispatcher {
    backend: Arc<dyn GenerateBackend>,
    pool: SharedPool,
    classifier: ErrorClassifier,
    config: DispatchConfig,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn GenerateBackend>,
        pool: SharedPool,
        classifier: ErrorClassifier,
        config: DispatchConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backend,
            pool,
            classifier,
            config,
            notifier,
        }
    }

    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }

    /// Delay before backoff attempt `attempt` (0-indexed). Strictly
    /// increasing until the cap.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.config.backoff_base_ms as f64
            * self.config.backoff_factor.powi(attempt as i32);
        Duration::from_millis(base_ms.min(self.config.backoff_max_ms as f64) as u64)
    }

    fn rotate_committed(&self) -> Result<bool, PanelForgeError> {
        if self.pool.rotate()? {
            self.notifier
                .credential_rotated(self.pool.cursor(), self.pool.len());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Issue one logical call. Terminates within a bounded number of
    /// attempts: rotations are bounded by pool size, backoff waits by
    /// `max_backoff_attempts` (the counter resets only when rotation to a
    /// fresh credential succeeds).
    pub async fn call(
        &self,
        kind: RequestKind,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, PanelForgeError> {
        let mut backoff_attempts: u32 = 0;
        let mut consecutive_auth: u32 = 0;
        let mut step = Step::Attempt;

        loop {
            match step {
                Step::Attempt => {
                    let Some(credential) = self.pool.current() else {
                        return Err(PanelForgeError::NoCredential);
                    };

                    match self.backend.generate(&credential, kind, request).await {
                        Ok(response) => return Ok(response),
                        Err(raw) => {
                            let error_kind = self.classifier.classify(&raw);
                            tracing::warn!(
                                kind = ?kind,
                                classified = ?error_kind,
                                cursor = self.pool.cursor(),
                                "Request failed: {}",
                                raw
                            );

                            match error_kind {
                                ErrorKind::ContentRejected => {
                                    return Err(PanelForgeError::ContentRejected {
                                        reason: raw.message,
                                    });
                                }
                                ErrorKind::RateLimited => {
                                    consecutive_auth = 0;
                                    step = Step::Rotate {
                                        message: raw.message,
                                    };
                                }
                                ErrorKind::Auth => {
                                    consecutive_auth += 1;
                                    if consecutive_auth >= 2 || !self.rotate_committed()? {
                                        return Err(PanelForgeError::Auth {
                                            message: raw.message,
                                        });
                                    }
                                    // one fresh key gets a chance
                                    step = Step::Attempt;
                                }
                                ErrorKind::Transient => {
                                    consecutive_auth = 0;
                                    step = Step::BackOff {
                                        message: raw.message,
                                        rate_limited: false,
                                    };
                                }
                                ErrorKind::Fatal => {
                                    return Err(PanelForgeError::Service {
                                        message: raw.message,
                                    });
                                }
                            }
                        }
                    }
                }

                Step::Rotate { message } => {
                    if self.rotate_committed()? {
                        // Fresh credential, fresh budget.
                        backoff_attempts = 0;
                        step = Step::Attempt;
                    } else {
                        self.notifier.quota_exhausted(
                            "all credentials rate limited; add more keys to continue",
                        );
                        step = Step::BackOff {
                            message,
                            rate_limited: true,
                        };
                    }
                }

                Step::BackOff {
                    message,
                    rate_limited,
                } => {
                    if backoff_attempts >= self.config.max_backoff_attempts {
                        return Err(if rate_limited {
                            PanelForgeError::QuotaExhausted {
                                attempts: backoff_attempts,
                            }
                        } else {
                            PanelForgeError::Network { message }
                        });
                    }

                    let delay = self.backoff_delay(backoff_attempts);
                    tracing::info!(
                        attempt = backoff_attempts + 1,
                        max = self.config.max_backoff_attempts,
                        delay_ms = delay.as_millis() as u64,
                        rate_limited,
                        "Backing off"
                    );
                    tokio::time::sleep(delay).await;
                    backoff_attempts += 1;

                    // A key may have been appended while we slept; if so,
                    // rotation succeeds and the budget resets.
                    if rate_limited && self.rotate_committed()? {
                        backoff_attempts = 0;
                    }
                    step = Step::Attempt;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::ClassifierConfig;

    fn dispatcher_with(config: DispatchConfig) -> Dispatcher {
        let store = Arc::new(crate::infra::store::MemoryStore::new());
        let pool = SharedPool::load(store).unwrap();
        Dispatcher::new(
            Arc::new(NeverBackend),
            pool,
            ErrorClassifier::new(ClassifierConfig::default()),
            config,
            Arc::new(crate::notify::NoopNotifier),
        )
    }

    struct NeverBackend;

    #[async_trait::async_trait]
    impl GenerateBackend for NeverBackend {
        async fn generate(
            &self,
            _credential: &str,
            _kind: RequestKind,
            _request: &GenerateRequest,
        ) -> Result<GenerateResponse, super::super::BackendError> {
            unreachable!("no credential, so no call should be made")
        }
    }

    #[test]
    fn backoff_delays_strictly_increase_until_cap() {
        let d = dispatcher_with(DispatchConfig::default());
        let delays: Vec<_> = (0..4).map(|i| d.backoff_delay(i)).collect();
        assert_eq!(delays[0], Duration::from_millis(2_000));
        assert_eq!(delays[1], Duration::from_millis(4_000));
        assert_eq!(delays[2], Duration::from_millis(8_000));
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn backoff_delay_caps_at_max() {
        let d = dispatcher_with(DispatchConfig::default());
        assert_eq!(d.backoff_delay(20), Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn empty_pool_fails_immediately() {
        let d = dispatcher_with(DispatchConfig::default());
        let err = d
            .call(RequestKind::Plan, &GenerateRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PanelForgeError::NoCredential));
    }
}
