//! The version resolver: query, classify, retry, diagnose.

use std::sync::Arc;
use tracing::{debug, info, warn};

use nodepack_core::{Error, ResolutionFailure, Result, VersionConstraint};

use crate::{
    ResolutionOutcome, ResolvedVersion, RetryPolicy, VersionResolverBackend, classify,
};

/// Resolves tool constraints through a backend with bounded retry.
#[derive(Clone)]
pub struct VersionResolver {
    backend: Arc<dyn VersionResolverBackend>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for VersionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionResolver")
            .field("backend", &self.backend.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl VersionResolver {
    /// Create a resolver over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn VersionResolverBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Resolve `constraint` for `tool`, retrying transient failures.
    ///
    /// An unspecified constraint is sent as the empty range, which the
    /// resolver treats as "latest stable". Definitive answers return after a
    /// single query. Transient failures are retried up to the policy's
    /// attempt ceiling, sleeping `attempt + 1` units in between; the last
    /// outcome is returned when attempts run out.
    pub async fn resolve(&self, tool: &str, constraint: &VersionConstraint) -> ResolutionOutcome {
        let range = constraint.range();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = self.query_once(tool, range).await;
            debug!(
                %tool,
                %range,
                attempt,
                outcome = outcome.label(),
                "Resolver query finished"
            );

            if !outcome.is_retryable() || !self.policy.allows_another(attempt) {
                return outcome;
            }

            let delay = self.policy.delay_after(attempt);
            warn!(
                %tool,
                %range,
                "Resolver query failed (attempt {}/{}). Retrying in {:?}",
                attempt,
                self.policy.max_attempts,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Resolve or produce the user-facing failure.
    ///
    /// When attempts run out on transient failures the resolver is queried
    /// once more purely to recover a diagnostic for the message.
    pub async fn resolve_or_fail(
        &self,
        tool: &str,
        constraint: &VersionConstraint,
    ) -> Result<ResolvedVersion> {
        let outcome = match self.resolve(tool, constraint).await {
            ResolutionOutcome::Resolved(resolved) => {
                info!(%tool, version = %resolved.version, "Resolved version");
                return Ok(resolved);
            }
            ResolutionOutcome::TransientFailure(_) => {
                self.query_once(tool, constraint.range()).await
            }
            definitive => definitive,
        };
        Err(failure_message(tool, constraint, &outcome))
    }

    async fn query_once(&self, tool: &str, range: &str) -> ResolutionOutcome {
        match self.backend.query(tool, range).await {
            Ok(output) => classify(&output),
            Err(e) => {
                debug!(backend = self.backend.name(), error = %e, "Resolver could not be queried");
                ResolutionOutcome::TransientFailure(e.to_string())
            }
        }
    }
}

/// Human name of a tool for messages.
#[must_use]
pub fn display_name(tool: &str) -> &str {
    match tool {
        "node" => "Node",
        "yarn" => "Yarn",
        "iojs" => "Iojs",
        other => other,
    }
}

/// Map a failed outcome to the error shown to the user.
///
/// A diagnostic query that unexpectedly resolves still counts as an
/// unknown error, since the run already gave up on this tool.
#[must_use]
pub fn failure_message(
    tool: &str,
    constraint: &VersionConstraint,
    outcome: &ResolutionOutcome,
) -> Error {
    let shown = constraint.range();
    match outcome {
        ResolutionOutcome::NoMatch => Error::resolution(
            tool,
            shown,
            ResolutionFailure::NoMatch,
            format!(
                "Could not find {} version corresponding to version requirement: {shown}",
                display_name(tool)
            ),
        ),
        ResolutionOutcome::Invalid(reason) => Error::resolution(
            tool,
            shown,
            ResolutionFailure::Invalid,
            format!("Invalid semantic version \"{shown}\" for {tool}: {reason}"),
        ),
        ResolutionOutcome::TransientFailure(_) | ResolutionOutcome::Resolved(_) => {
            Error::resolution(
                tool,
                shown,
                ResolutionFailure::Unknown,
                format!("Unknown error installing \"{shown}\" of {tool}"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use std::time::Duration;

    fn resolver(backend: &ScriptedBackend) -> VersionResolver {
        VersionResolver::new(Arc::new(backend.clone()), RetryPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolved_first_try() {
        let backend = ScriptedBackend::new().answer("14.2.0 https://example/node.tar.gz");
        let outcome = resolver(&backend).resolve("node", &"14.x".into()).await;

        assert!(matches!(outcome, ResolutionOutcome::Resolved(ref v) if v.version == "14.2.0"));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unspecified_sends_empty_range() {
        let backend = ScriptedBackend::new().answer("14.2.0 https://example/node.tar.gz");
        resolver(&backend)
            .resolve("node", &VersionConstraint::parse("null"))
            .await;

        let calls = backend.calls();
        assert_eq!(calls[0].tool, "node");
        assert_eq!(calls[0].range, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_result_is_not_retried() {
        let backend = ScriptedBackend::new().fail("No result");
        let outcome = resolver(&backend).resolve("node", &"99.x".into()).await;

        assert_eq!(outcome, ResolutionOutcome::NoMatch);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_is_not_retried() {
        let backend = ScriptedBackend::new().fail("Could not parse wat");
        let outcome = resolver(&backend).resolve("node", &"wat".into()).await;

        assert!(matches!(outcome, ResolutionOutcome::Invalid(_)));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_linear_backoff_until_resolved() {
        let backend = ScriptedBackend::new()
            .fail("500")
            .io_error("connection reset")
            .fail("500")
            .answer("garbage")
            .answer("14.2.0 https://example/node.tar.gz");

        let outcome = resolver(&backend).resolve("node", &"14.x".into()).await;
        assert!(matches!(outcome, ResolutionOutcome::Resolved(ref v) if v.version == "14.2.0"));

        let calls = backend.calls();
        assert_eq!(calls.len(), 5);
        let gaps: Vec<_> = calls.windows(2).map(|w| w[1].at - w[0].at).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(4),
                Duration::from_secs(5),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_five_attempts() {
        let backend = ScriptedBackend::new().fail("timeout");
        let outcome = resolver(&backend).resolve("node", &"14.x".into()).await;

        assert!(outcome.is_retryable());
        assert_eq!(backend.call_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_or_fail_no_match_message() {
        let backend = ScriptedBackend::new().fail("No result");
        let err = resolver(&backend)
            .resolve_or_fail("yarn", &"9.x".into())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Could not find Yarn version corresponding to version requirement: 9.x"
        );
        assert!(matches!(
            err,
            Error::Resolution { kind: ResolutionFailure::NoMatch, .. }
        ));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_or_fail_invalid_names_input() {
        let backend = ScriptedBackend::new().fail("Could not parse ~~banana");
        let err = resolver(&backend)
            .resolve_or_fail("node", &"~~banana".into())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("~~banana"));
        assert!(err.to_string().contains("Invalid semantic version"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_or_fail_unknown_requeries_once() {
        let backend = ScriptedBackend::new().fail("502 Bad Gateway");
        let err = resolver(&backend)
            .resolve_or_fail("node", &"14.x".into())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Unknown error installing \"14.x\" of node");
        assert_eq!(backend.call_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostic_query_can_reveal_no_match() {
        let backend = ScriptedBackend::new()
            .fail("500")
            .fail("500")
            .fail("500")
            .fail("500")
            .fail("500")
            .fail("No result");
        let err = resolver(&backend)
            .resolve_or_fail("node", &"15.x".into())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Resolution { kind: ResolutionFailure::NoMatch, .. }
        ));
    }
}
