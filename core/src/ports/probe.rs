//! Convergence probe port (interface).

/// A zero-argument condition the poller evaluates until it holds.
///
/// Each evaluation must be independent and safe to repeat. Probes swallow
/// their own transient failures and report them as `false`.
pub trait ConvergenceProbe: Send + Sync {
    /// Whether the awaited condition currently holds.
    fn check(&self) -> impl std::future::Future<Output = bool> + Send;

    /// Short description used in logs and timeout errors.
    fn describe(&self) -> String {
        "condition".to_string()
    }
}
