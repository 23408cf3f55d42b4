//! Shared test utilities: table-driven runner, fixtures and log capture.

pub mod fixtures;
pub mod logging;

use std::panic::AssertUnwindSafe;

/// Table-driven test case.
#[derive(Debug, Clone)]
pub struct TestCase<I, E> {
    pub name: &'static str,
    pub input: I,
    pub expected: E,
}

impl<I, E> TestCase<I, E> {
    pub const fn new(name: &'static str, input: I, expected: E) -> Self {
        Self {
            name,
            input,
            expected,
        }
    }
}

/// Run every case, stopping at the first mismatch or panic.
pub fn run_table_tests<I, E, F>(cases: Vec<TestCase<I, E>>, test_fn: F) -> Result<(), String>
where
    I: std::fmt::Debug + Clone,
    E: std::fmt::Debug + PartialEq,
    F: Fn(I) -> E,
{
    for case in cases {
        let start = std::time::Instant::now();
        let input = case.input.clone();
        let actual = std::panic::catch_unwind(AssertUnwindSafe(|| test_fn(input)))
            .map_err(|_| format!("case '{}' panicked (input {:?})", case.name, case.input))?;

        if actual != case.expected {
            return Err(format!(
                "case '{}' failed: input {:?}, expected {:?}, got {:?}",
                case.name, case.input, case.expected, actual
            ));
        }
        tracing::debug!(case = case.name, elapsed = ?start.elapsed(), "table case passed");
    }
    Ok(())
}
