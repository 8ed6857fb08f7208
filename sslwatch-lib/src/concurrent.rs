//! Bounded worker pool for background checks.
//!
//! The orchestrator spawns one task per requested check on a tokio runtime.
//! Certificate checks share a semaphore so at most `concurrency` of them run
//! at once; WHOIS lookups are requested one at a time from the UI and skip
//! the semaphore. Every spawned task sends exactly one message back, even if
//! it is cancelled or its check panics, so callers can count completions.
//!
//! Results travel on two channels: certificate results on one, WHOIS
//! replies (tagged with the `RequestId` that asked for them) on the other.
//! Both are drained without blocking from the UI thread.

use crate::error::SslWatchError;
use crate::types::CheckResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Something that can check a domain's certificate and WHOIS record.
///
/// Implementations must turn every failure into a result message rather
/// than returning early; the pool relies on one message per call.
#[async_trait]
pub trait DomainInspector: Send + Sync {
    async fn check_certificate(&self, domain: &str) -> CheckResult;
    async fn lookup_whois(&self, domain: &str) -> CheckResult;
}

/// Identifier of one WHOIS request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Ids from `CheckOrchestrator::request_whois` are unique per pool;
    /// this is for fakes and tests that need a fixed id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// A WHOIS result tagged with the request that produced it.
#[derive(Debug, Clone)]
pub struct WhoisReply {
    pub request: RequestId,
    pub result: CheckResult,
}

/// Spawns background checks and hands their results back over channels.
pub struct CheckOrchestrator {
    inspector: Arc<dyn DomainInspector>,
    runtime: Handle,
    concurrency: usize,
    limiter: Arc<Semaphore>,
    shutdown: CancellationToken,
    /// Cancellation handles of WHOIS lookups whose reply has not arrived yet
    pending_whois: HashMap<RequestId, CancellationToken>,
    next_request: u64,
    certificate_tx: mpsc::UnboundedSender<CheckResult>,
    certificate_rx: mpsc::UnboundedReceiver<CheckResult>,
    whois_tx: mpsc::UnboundedSender<WhoisReply>,
    whois_rx: mpsc::UnboundedReceiver<WhoisReply>,
}

impl CheckOrchestrator {
    /// Create a pool that runs at most `concurrency` certificate checks at once.
    ///
    /// Tasks are spawned on `runtime`; the caller does not need to be inside it.
    pub fn new(inspector: Arc<dyn DomainInspector>, concurrency: usize, runtime: Handle) -> Self {
        let concurrency = concurrency.clamp(1, 100);
        let (certificate_tx, certificate_rx) = mpsc::unbounded_channel();
        let (whois_tx, whois_rx) = mpsc::unbounded_channel();

        Self {
            inspector,
            runtime,
            concurrency,
            limiter: Arc::new(Semaphore::new(concurrency)),
            shutdown: CancellationToken::new(),
            pending_whois: HashMap::new(),
            next_request: 0,
            certificate_tx,
            certificate_rx,
            whois_tx,
            whois_rx,
        }
    }

    /// Maximum number of certificate checks running at once.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Spawn one certificate check per domain and return how many were spawned.
    ///
    /// Each spawned check delivers exactly one result to the certificate
    /// channel. No handle is kept; checks end on their own or on shutdown.
    pub fn spawn_certificate_checks<I>(&self, domains: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut spawned = 0;
        for domain in domains {
            let inspector = Arc::clone(&self.inspector);
            let limiter = Arc::clone(&self.limiter);
            let cancel = self.shutdown.clone();
            let tx = self.certificate_tx.clone();

            self.runtime.spawn(async move {
                let target = domain.clone();
                let work = async move { inspector.check_certificate(&target).await };
                let result = run_guarded(&domain, cancel, Some(limiter), work).await;
                if tx.send(result).is_err() {
                    debug!(domain = %domain, "certificate receiver dropped");
                }
            });
            spawned += 1;
        }

        debug!(spawned, "spawned certificate checks");
        spawned
    }

    /// Start a WHOIS lookup and return the id its reply will carry.
    pub fn request_whois(&mut self, domain: &str) -> RequestId {
        self.next_request += 1;
        let request = RequestId(self.next_request);

        let cancel = self.shutdown.child_token();
        self.pending_whois.insert(request, cancel.clone());

        let inspector = Arc::clone(&self.inspector);
        let tx = self.whois_tx.clone();
        let domain = domain.to_string();

        self.runtime.spawn(async move {
            let target = domain.clone();
            let work = async move { inspector.lookup_whois(&target).await };
            let result = run_guarded(&domain, cancel, None, work).await;
            if tx.send(WhoisReply { request, result }).is_err() {
                debug!(domain = %domain, "whois receiver dropped");
            }
        });

        debug!(?request, "requested whois lookup");
        request
    }

    /// Abandon a WHOIS lookup. Its (cancelled) reply still arrives.
    pub fn cancel_whois(&mut self, request: RequestId) {
        if let Some(cancel) = self.pending_whois.remove(&request) {
            cancel.cancel();
            debug!(?request, "cancelled whois lookup");
        }
    }

    /// Take the next certificate result without blocking.
    pub fn try_recv_certificate(&mut self) -> Option<CheckResult> {
        self.certificate_rx.try_recv().ok()
    }

    /// Take the next WHOIS reply without blocking.
    pub fn try_recv_whois(&mut self) -> Option<WhoisReply> {
        let reply = self.whois_rx.try_recv().ok()?;
        self.pending_whois.remove(&reply.request);
        Some(reply)
    }

    /// Cancel every outstanding check.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for CheckOrchestrator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Run one check so that it always produces exactly one result.
///
/// Cancellation is observed while waiting for a permit and while the check
/// runs. The check itself runs in its own task so a panic surfaces as a
/// join error instead of tearing down the worker.
async fn run_guarded<F>(
    domain: &str,
    cancel: CancellationToken,
    limiter: Option<Arc<Semaphore>>,
    work: F,
) -> CheckResult
where
    F: Future<Output = CheckResult> + Send + 'static,
{
    let _permit = match limiter {
        Some(limiter) => tokio::select! {
            _ = cancel.cancelled() => return SslWatchError::cancelled(domain).into(),
            permit = limiter.acquire_owned() => match permit {
                Ok(permit) => Some(permit),
                Err(_) => return SslWatchError::cancelled(domain).into(),
            },
        },
        None => None,
    };

    let task = tokio::spawn(work);
    let abort = task.abort_handle();

    tokio::select! {
        _ = cancel.cancelled() => {
            abort.abort();
            SslWatchError::cancelled(domain).into()
        }
        joined = task => match joined {
            Ok(result) => result,
            Err(err) => {
                error!(domain, error = %err, "check task failed");
                CheckResult::error(
                    Some(domain),
                    SslWatchError::internal(err.to_string()).to_string(),
                )
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CertStatus, CertificateReport, WhoisStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Inspector that answers instantly, panics for "panic.example" and
    /// hangs for "hang.example".
    struct StubInspector {
        running: AtomicUsize,
        max_running: AtomicUsize,
        delay: Duration,
    }

    impl StubInspector {
        fn new(delay: Duration) -> Self {
            Self {
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
                delay,
            }
        }
    }

    fn report(domain: &str) -> CheckResult {
        CheckResult::Certificate(CertificateReport {
            domain: domain.to_string(),
            subject_cn: domain.to_string(),
            issuer_cn: "Test CA".to_string(),
            issued_on: "2024-01-01".to_string(),
            expires_on: "2030-01-01".to_string(),
            days_left: 365,
            status: CertStatus::Ok,
        })
    }

    #[async_trait]
    impl DomainInspector for StubInspector {
        async fn check_certificate(&self, domain: &str) -> CheckResult {
            match domain {
                "panic.example" => panic!("inspector exploded"),
                "hang.example" => std::future::pending().await,
                _ => {
                    let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                    self.max_running.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(self.delay).await;
                    self.running.fetch_sub(1, Ordering::SeqCst);
                    report(domain)
                }
            }
        }

        async fn lookup_whois(&self, domain: &str) -> CheckResult {
            if domain == "hang.example" {
                std::future::pending::<()>().await;
            }
            CheckResult::Whois {
                domain: domain.to_string(),
                status: WhoisStatus::Success,
                data: format!("Domain Name: {}", domain),
            }
        }
    }

    async fn collect_certificates(orch: &mut CheckOrchestrator, expected: usize) -> Vec<CheckResult> {
        let mut results = Vec::new();
        for _ in 0..400 {
            while let Some(result) = orch.try_recv_certificate() {
                results.push(result);
            }
            if results.len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        results
    }

    async fn next_whois(orch: &mut CheckOrchestrator) -> Option<WhoisReply> {
        for _ in 0..400 {
            if let Some(reply) = orch.try_recv_whois() {
                return Some(reply);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    fn orchestrator(inspector: Arc<StubInspector>, concurrency: usize) -> CheckOrchestrator {
        CheckOrchestrator::new(inspector, concurrency, Handle::current())
    }

    #[tokio::test]
    async fn test_one_result_per_domain() {
        let mut orch = orchestrator(Arc::new(StubInspector::new(Duration::ZERO)), 4);
        let domains: Vec<String> = (0..6).map(|i| format!("site{}.example", i)).collect();

        assert_eq!(orch.spawn_certificate_checks(domains), 6);

        let results = collect_certificates(&mut orch, 6).await;
        assert_eq!(results.len(), 6);
        assert!(results
            .iter()
            .all(|r| matches!(r, CheckResult::Certificate(_))));
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_respected() {
        let inspector = Arc::new(StubInspector::new(Duration::from_millis(20)));
        let mut orch = orchestrator(Arc::clone(&inspector), 2);
        assert_eq!(orch.concurrency(), 2);
        let domains: Vec<String> = (0..8).map(|i| format!("site{}.example", i)).collect();

        orch.spawn_certificate_checks(domains);
        let results = collect_certificates(&mut orch, 8).await;

        assert_eq!(results.len(), 8);
        assert!(inspector.max_running.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_concurrency_is_clamped() {
        let inspector = Arc::new(StubInspector::new(Duration::ZERO));
        assert_eq!(orchestrator(Arc::clone(&inspector), 0).concurrency(), 1);
        assert_eq!(orchestrator(inspector, 500).concurrency(), 100);
    }

    #[tokio::test]
    async fn test_panicking_check_still_reports() {
        let mut orch = orchestrator(Arc::new(StubInspector::new(Duration::ZERO)), 4);
        orch.spawn_certificate_checks(vec![
            "panic.example".to_string(),
            "fine.example".to_string(),
        ]);

        let results = collect_certificates(&mut orch, 2).await;
        assert_eq!(results.len(), 2);

        let failure = results
            .iter()
            .find(|r| r.domain() == Some("panic.example"))
            .expect("panicked check must still report");
        match failure {
            CheckResult::Error { message, .. } => {
                assert!(message.starts_with("An unexpected error occurred"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(results
            .iter()
            .any(|r| matches!(r, CheckResult::Certificate(c) if c.domain == "fine.example")));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_outstanding_checks() {
        let mut orch = orchestrator(Arc::new(StubInspector::new(Duration::ZERO)), 1);
        orch.spawn_certificate_checks(vec![
            "hang.example".to_string(),
            "queued-a.example".to_string(),
            "queued-b.example".to_string(),
        ]);

        // Let the first check take the only permit
        tokio::time::sleep(Duration::from_millis(20)).await;
        orch.shutdown();
        assert!(orch.is_shut_down());

        let results = collect_certificates(&mut orch, 3).await;
        assert_eq!(results.len(), 3);
        let cancelled = results
            .iter()
            .filter(|r| matches!(r, CheckResult::Error { message, .. } if message.starts_with("Check cancelled")))
            .count();
        assert!(cancelled >= 1);
        assert!(results
            .iter()
            .any(|r| r.domain() == Some("hang.example") && r.kind() == crate::ResultKind::Error));
    }

    #[tokio::test]
    async fn test_whois_reply_carries_request_id() {
        let mut orch = orchestrator(Arc::new(StubInspector::new(Duration::ZERO)), 4);
        let first = orch.request_whois("a.example");
        let second = orch.request_whois("b.example");
        assert_ne!(first, second);

        let mut seen = Vec::new();
        while seen.len() < 2 {
            let reply = next_whois(&mut orch).await.expect("whois reply");
            seen.push((reply.request, reply.result.domain().map(str::to_string)));
        }
        seen.sort();
        assert_eq!(
            seen,
            vec![
                (first, Some("a.example".to_string())),
                (second, Some("b.example".to_string())),
            ]
        );
        // Whois replies never land on the certificate channel
        assert!(orch.try_recv_certificate().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_whois_still_replies() {
        let mut orch = orchestrator(Arc::new(StubInspector::new(Duration::ZERO)), 4);
        let request = orch.request_whois("hang.example");
        orch.cancel_whois(request);

        let reply = next_whois(&mut orch).await.expect("cancelled reply");
        assert_eq!(reply.request, request);
        assert!(matches!(reply.result, CheckResult::Error { .. }));
    }
}
