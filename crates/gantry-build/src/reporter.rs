//! Build progress reporting

use std::time::Duration;

use gantry_core::Target;

/// Events emitted while building
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// A build is starting
    Started { variant: String, target: Target },
    /// The toolchain produced a line of output
    Output {
        variant: String,
        target: Target,
        line: String,
        is_stderr: bool,
    },
    /// A build completed successfully
    Completed {
        variant: String,
        target: Target,
        duration: Duration,
    },
    /// A build failed
    Failed {
        variant: String,
        target: Target,
        duration: Duration,
        error: String,
    },
    /// Every build of a variant has finished
    VariantFinished {
        variant: String,
        succeeded: usize,
        failed: usize,
    },
}

/// Trait for reporting build progress
pub trait BuildReporter: Send + Sync {
    /// Handle a build event
    fn report(&self, event: &BuildEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl BuildReporter for TracingReporter {
    fn report(&self, event: &BuildEvent) {
        match event {
            BuildEvent::Started { variant, target } => {
                tracing::info!(variant = %variant, abi = %target, "build started");
            }
            BuildEvent::Output {
                variant,
                target,
                line,
                is_stderr,
            } => {
                if *is_stderr {
                    tracing::debug!(variant = %variant, abi = %target, stream = "stderr", "{}", line);
                } else {
                    tracing::trace!(variant = %variant, abi = %target, stream = "stdout", "{}", line);
                }
            }
            BuildEvent::Completed {
                variant,
                target,
                duration,
            } => {
                tracing::info!(
                    variant = %variant,
                    abi = %target,
                    duration_secs = duration.as_secs_f64(),
                    "build completed"
                );
            }
            BuildEvent::Failed {
                variant,
                target,
                duration,
                error,
            } => {
                tracing::error!(
                    variant = %variant,
                    abi = %target,
                    duration_secs = duration.as_secs_f64(),
                    error = %error,
                    "build failed"
                );
            }
            BuildEvent::VariantFinished {
                variant,
                succeeded,
                failed,
            } => {
                tracing::info!(variant = %variant, succeeded, failed, "variant builds finished");
            }
        }
    }
}

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: std::sync::Mutex<Vec<BuildEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<BuildEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl BuildReporter for CollectingReporter {
    fn report(&self, event: &BuildEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::default();

        reporter.report(&BuildEvent::Started {
            variant: "release".to_string(),
            target: Target::X86,
        });
        reporter.report(&BuildEvent::Completed {
            variant: "release".to_string(),
            target: Target::X86,
            duration: Duration::from_secs(5),
        });

        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], BuildEvent::Completed { .. }));
    }

    #[test]
    fn test_tracing_reporter() {
        let reporter = TracingReporter;

        reporter.report(&BuildEvent::Failed {
            variant: "release".to_string(),
            target: Target::Arm64V8a,
            duration: Duration::from_secs(1),
            error: "exit code 1".to_string(),
        });
        reporter.report(&BuildEvent::VariantFinished {
            variant: "release".to_string(),
            succeeded: 3,
            failed: 1,
        });
    }
}
