//! Test event collection
//!
//! The test runner reports per-test results through an events file: line
//! oriented `key:value` records, one block per finished test. A block starts
//! at a `test:` line and carries the outcome of that test:
//!
//! ```text
//! test:CalculatorTest#addsTwoNumbers
//! status:passed
//! time_ms:12
//!
//! test:CalculatorTest#dividesByZero
//! status:failed
//! message:expected ArithmeticException to be thrown
//! stack:at CalculatorTest.dividesByZero(CalculatorTest.java:22)
//! stack:at org.gradebox.testkit.EventRunner.invoke(EventRunner.java:71)
//! ```
//!
//! Records are flushed per finished test, so a run killed at the wall clock
//! bound still yields every test that completed before cancellation.
//!
//! The collector never fails: malformed lines and incomplete records become
//! warnings in the execution log, and everything parseable is kept in file
//! order.

use crate::report::{TestOutcome, TestResult};

/// Stack excerpts longer than this are truncated
const MAX_STACK_CHARS: usize = 2_000;

/// Marker appended to truncated stack excerpts
const STACK_TRUNCATED: &str = "\n...[stack truncated]";

/// Results and warnings collected from an events file
#[derive(Debug, Default)]
pub(crate) struct CollectedEvents {
    /// Results in file order
    pub results: Vec<TestResult>,

    /// Human-readable notes about input the collector could not use
    pub warnings: Vec<String>,
}

/// Partial record being assembled
#[derive(Debug, Default)]
struct PendingRecord {
    name: String,
    status: Option<String>,
    message: String,
    stack_lines: Vec<String>,
    duration_ms: u64,
}

impl PendingRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    fn finish(self, collected: &mut CollectedEvents) {
        let stack = truncate_stack(&self.stack_lines);

        let outcome = match self.status.as_deref() {
            Some("passed") => TestOutcome::Passed,
            Some("failed") => TestOutcome::Failed {
                message: self.message,
                stack,
            },
            Some("errored") => TestOutcome::Errored {
                message: self.message,
                stack,
            },
            Some(other) => {
                collected.warnings.push(format!(
                    "discarded record for '{}' with unknown status '{}'",
                    self.name, other
                ));
                return;
            }
            None => {
                collected
                    .warnings
                    .push(format!("discarded record for '{}' without status", self.name));
                return;
            }
        };

        collected.results.push(TestResult {
            name: self.name,
            outcome,
            duration_ms: self.duration_ms,
        });
    }
}

/// Collect every test record from the events file content.
pub(crate) fn collect_events(content: &str) -> CollectedEvents {
    let mut collected = CollectedEvents::default();
    let mut pending: Option<PendingRecord> = None;

    for line in content.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            collected
                .warnings
                .push(format!("ignored malformed event line {line:?}"));
            continue;
        };

        match key.trim() {
            "test" => {
                if let Some(record) = pending.take() {
                    record.finish(&mut collected);
                }
                pending = Some(PendingRecord::new(value.trim()));
            }
            "status" => match pending.as_mut() {
                Some(record) => record.status = Some(value.trim().to_owned()),
                None => collected
                    .warnings
                    .push(format!("ignored event line outside a record: {line:?}")),
            },
            "message" => {
                if let Some(record) = pending.as_mut() {
                    record.message = value.trim().to_owned();
                }
            }
            "stack" => {
                if let Some(record) = pending.as_mut() {
                    record.stack_lines.push(value.trim().to_owned());
                }
            }
            "time_ms" => {
                if let Some(record) = pending.as_mut() {
                    record.duration_ms = value.trim().parse().unwrap_or(0);
                }
            }
            // Unknown keys are allowed for forward compatibility
            _ => {}
        }
    }

    if let Some(record) = pending.take() {
        record.finish(&mut collected);
    }

    collected
}

fn truncate_stack(lines: &[String]) -> String {
    let joined = lines.join("\n");
    if joined.chars().count() <= MAX_STACK_CHARS {
        return joined;
    }

    let mut truncated: String = joined.chars().take(MAX_STACK_CHARS).collect();
    truncated.push_str(STACK_TRUNCATED);
    truncated
}
