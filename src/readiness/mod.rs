// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Readiness polling
//!
//! Waits for each declared service endpoint to answer. Every endpoint is
//! polled independently and concurrently; [`await_all`] is the barrier the
//! orchestrator waits on before running stages. Timeouts are soft: they are
//! reported, never raised.

mod probe;

pub use probe::{EndpointProbe, HttpProbe, Probe, TcpProbe};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::errors::CiflowError;
use crate::pipeline::ServiceEndpoint;

/// A service that answered within its attempt budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    pub endpoint: String,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Final verdict for one endpoint, kept in the run context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub name: String,
    pub url: String,
    pub ready: bool,
    pub attempts: u32,
}

/// Poll `endpoint` until it answers or `max_attempts` probes have failed
pub async fn await_ready(
    endpoint: &ServiceEndpoint,
    probe: &dyn Probe,
) -> Result<Readiness, CiflowError> {
    let start = Instant::now();
    let max_attempts = endpoint.max_attempts;

    for attempt in 1..=max_attempts {
        let outcome = tokio::time::timeout(endpoint.probe_timeout(), probe.probe(endpoint)).await;

        match outcome {
            Ok(Ok(())) => {
                tracing::info!(endpoint = %endpoint.name, attempt, "endpoint ready");
                return Ok(Readiness {
                    endpoint: endpoint.name.clone(),
                    attempts: attempt,
                    elapsed: start.elapsed(),
                });
            }
            Ok(Err(reason)) => {
                tracing::debug!(endpoint = %endpoint.name, attempt, %reason, "probe failed");
            }
            Err(_) => {
                tracing::debug!(endpoint = %endpoint.name, attempt, "probe timed out");
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(endpoint.poll_interval()).await;
        }
    }

    Err(CiflowError::ReadinessTimeout {
        endpoint: endpoint.name.clone(),
        attempts_made: max_attempts,
    })
}

/// Poll all endpoints concurrently and wait for the slowest one
pub async fn await_all(endpoints: &[ServiceEndpoint], probe: &dyn Probe) -> Vec<EndpointStatus> {
    let polls = endpoints.iter().map(|endpoint| async move {
        match await_ready(endpoint, probe).await {
            Ok(ready) => EndpointStatus {
                name: endpoint.name.clone(),
                url: endpoint.url.clone(),
                ready: true,
                attempts: ready.attempts,
            },
            Err(e) => {
                tracing::warn!(error = %e, "continuing without readiness confirmation");
                let attempts = match e {
                    CiflowError::ReadinessTimeout { attempts_made, .. } => attempts_made,
                    _ => endpoint.max_attempts,
                };
                EndpointStatus {
                    name: endpoint.name.clone(),
                    url: endpoint.url.clone(),
                    ready: false,
                    attempts,
                }
            }
        }
    });

    join_all(polls).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Probe that fails until a per-endpoint attempt threshold is reached
    struct ScriptedProbe {
        succeed_on: HashMap<String, u32>,
        calls: Mutex<HashMap<String, u32>>,
        total: AtomicU32,
    }

    impl ScriptedProbe {
        fn new(succeed_on: &[(&str, u32)]) -> Self {
            Self {
                succeed_on: succeed_on.iter().map(|(n, a)| (n.to_string(), *a)).collect(),
                calls: Mutex::new(HashMap::new()),
                total: AtomicU32::new(0),
            }
        }

        fn calls_for(&self, name: &str) -> u32 {
            self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self, endpoint: &ServiceEndpoint) -> Result<(), String> {
            self.total.fetch_add(1, Ordering::SeqCst);
            let attempt = {
                let mut calls = self.calls.lock().unwrap();
                let count = calls.entry(endpoint.name.clone()).or_insert(0);
                *count += 1;
                *count
            };

            match self.succeed_on.get(&endpoint.name) {
                Some(&n) if attempt >= n => Ok(()),
                _ => Err("connection refused".into()),
            }
        }
    }

    struct HangingProbe;

    #[async_trait]
    impl Probe for HangingProbe {
        async fn probe(&self, _endpoint: &ServiceEndpoint) -> Result<(), String> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn endpoint(name: &str, max_attempts: u32) -> ServiceEndpoint {
        ServiceEndpoint {
            poll_interval_secs: 0,
            max_attempts,
            ..ServiceEndpoint::new(name, format!("http://{name}.invalid"))
        }
    }

    #[tokio::test]
    async fn test_ready_on_first_attempt() {
        let probe = ScriptedProbe::new(&[("frontend", 1)]);
        let ready = await_ready(&endpoint("frontend", 5), &probe).await.unwrap();

        assert_eq!(ready.attempts, 1);
        assert_eq!(probe.calls_for("frontend"), 1);
    }

    #[tokio::test]
    async fn test_ready_after_retries() {
        let probe = ScriptedProbe::new(&[("backend", 3)]);
        let ready = await_ready(&endpoint("backend", 5), &probe).await.unwrap();

        assert_eq!(ready.attempts, 3);
        assert_eq!(probe.calls_for("backend"), 3);
    }

    #[tokio::test]
    async fn test_never_ready_times_out_after_exactly_max_attempts() {
        let probe = ScriptedProbe::new(&[]);
        let err = await_ready(&endpoint("database", 4), &probe).await.unwrap_err();

        match err {
            CiflowError::ReadinessTimeout {
                endpoint,
                attempts_made,
            } => {
                assert_eq!(endpoint, "database");
                assert_eq!(attempts_made, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(probe.calls_for("database"), 4);
    }

    #[tokio::test]
    async fn test_hanging_probe_is_bounded() {
        let endpoint = ServiceEndpoint {
            probe_timeout_secs: 1,
            ..endpoint("cache", 2)
        };

        let started = Instant::now();
        let err = await_ready(&endpoint, &HangingProbe).await.unwrap_err();

        assert!(matches!(err, CiflowError::ReadinessTimeout { attempts_made: 2, .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_await_all_reports_each_endpoint() {
        let probe = ScriptedProbe::new(&[("frontend", 2), ("backend", 1)]);
        let endpoints = vec![
            endpoint("frontend", 3),
            endpoint("backend", 3),
            endpoint("database", 3),
        ];

        let statuses = await_all(&endpoints, &probe).await;

        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0].name, "frontend");
        assert!(statuses[0].ready);
        assert_eq!(statuses[0].attempts, 2);
        assert!(statuses[1].ready);
        assert!(!statuses[2].ready);
        assert_eq!(statuses[2].attempts, 3);
        assert_eq!(probe.total.load(Ordering::SeqCst), 2 + 1 + 3);
    }

    #[tokio::test]
    async fn test_await_all_polls_concurrently() {
        let endpoints = vec![
            ServiceEndpoint {
                probe_timeout_secs: 1,
                ..endpoint("a", 1)
            },
            ServiceEndpoint {
                probe_timeout_secs: 1,
                ..endpoint("b", 1)
            },
            ServiceEndpoint {
                probe_timeout_secs: 1,
                ..endpoint("c", 1)
            },
        ];

        let started = Instant::now();
        let statuses = await_all(&endpoints, &HangingProbe).await;

        assert!(statuses.iter().all(|s| !s.ready));
        // Sequential polling would take at least three probe timeouts
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
