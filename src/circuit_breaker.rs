/*!
 * # Circuit Breaker
 *
 * Guards outbound integrations (courier aggregator, geocoder). After a run of
 * consecutive failures the circuit opens and calls fail fast until the
 * timeout elapses; a half-open circuit closes again after enough successes.
 */

use crate::errors::ServiceError;
use metrics::counter;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, allowing limited requests to test recovery
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Duration to wait before transitioning from Open to HalfOpen
    pub timeout: Duration,
    /// Successful calls needed in HalfOpen to close the circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct CircuitBreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    state: Mutex<CircuitBreakerState>,
}

impl CircuitBreaker {
    pub fn new(
        name: &'static str,
        failure_threshold: u32,
        timeout: Duration,
        success_threshold: u32,
    ) -> Self {
        Self::with_config(
            name,
            CircuitBreakerConfig {
                failure_threshold,
                timeout,
                success_threshold,
            },
        )
    }

    pub fn with_config(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            state: Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
            }),
        }
    }

    /// Runs `f` under circuit protection. Only upstream failures count
    /// against the circuit; rejected input does not.
    pub async fn call<F, Fut, R>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, ServiceError>>,
    {
        if !self.can_execute() {
            counter!("aquacare_circuit_breaker.rejected", 1, "service" => self.name);
            return Err(ServiceError::CircuitBreakerOpen);
        }

        match f().await {
            Ok(result) => {
                self.on_success();
                Ok(result)
            }
            Err(err) => {
                if counts_as_failure(&err) {
                    self.on_failure();
                } else {
                    self.on_success();
                }
                Err(err)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CircuitBreakerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn can_execute(&self) -> bool {
        let mut state = self.lock();

        match state.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => match state.last_failure_time {
                Some(last_failure) if last_failure.elapsed() >= self.config.timeout => {
                    state.state = CircuitState::HalfOpen;
                    state.success_count = 0;
                    true
                }
                _ => false,
            },
        }
    }

    fn on_success(&self) {
        let mut state = self.lock();

        match state.state {
            CircuitState::Closed => {
                state.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.config.success_threshold {
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                    state.last_failure_time = None;
                }
            }
            CircuitState::Open => {
                state.state = CircuitState::Closed;
                state.failure_count = 0;
                state.success_count = 0;
                state.last_failure_time = None;
            }
        }
    }

    fn on_failure(&self) {
        let mut state = self.lock();

        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());

        match state.state {
            CircuitState::Closed => {
                if state.failure_count >= self.config.failure_threshold {
                    warn!(
                        service = self.name,
                        failures = state.failure_count,
                        "circuit opened"
                    );
                    counter!("aquacare_circuit_breaker.opened", 1, "service" => self.name);
                    state.state = CircuitState::Open;
                }
            }
            CircuitState::HalfOpen => {
                warn!(service = self.name, "half-open probe failed, circuit re-opened");
                state.state = CircuitState::Open;
                state.success_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }
}

fn counts_as_failure(err: &ServiceError) -> bool {
    matches!(
        err,
        ServiceError::ExternalServiceError(_)
            | ServiceError::ServiceUnavailable(_)
            | ServiceError::InternalError(_)
            | ServiceError::SerializationError(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream_down() -> Result<i32, ServiceError> {
        Err(ServiceError::ExternalServiceError("502 from upstream".into()))
    }

    #[tokio::test]
    async fn stays_closed_on_success() {
        let cb = CircuitBreaker::new("test", 3, Duration::from_millis(100), 2);
        let result = cb.call(|| async { Ok::<_, ServiceError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures_and_fails_fast() {
        let cb = CircuitBreaker::new("test", 2, Duration::from_secs(60), 1);

        let _ = cb.call(|| async { upstream_down() }).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        let _ = cb.call(|| async { upstream_down() }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        let result = cb.call(|| async { Ok::<_, ServiceError>(1) }).await;
        assert!(matches!(result, Err(ServiceError::CircuitBreakerOpen)));
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold() {
        let cb = CircuitBreaker::new("test", 1, Duration::from_millis(10), 2);
        let _ = cb.call(|| async { upstream_down() }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;
        cb.call(|| async { Ok::<_, ServiceError>(()) }).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.call(|| async { Ok::<_, ServiceError>(()) }).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn bad_input_does_not_trip_the_circuit() {
        let cb = CircuitBreaker::new("test", 1, Duration::from_secs(60), 1);
        let result = cb
            .call(|| async { Err::<(), _>(ServiceError::ValidationError("pincode".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
