//! Internal testing utilities for the tessera crates.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe, catch_unwind};

/// Utility for writing table-driven tests.
///
/// Each case is run with panics caught, so that one failing case does not
/// hide the others. Once every case has run, the test panics with a report
/// listing the debug representation of each failing case.
///
/// ## Example
///
/// ```
/// use tessera_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     size: i64,
///     factor: i64,
///     expected: i64,
/// }
///
/// let cases = [
///     Case { size: 32, factor: 16, expected: 2 },
///     Case { size: 33, factor: 16, expected: 3 },
/// ];
///
/// cases.test_each(|&Case { size, factor, expected }| {
///     assert_eq!(size.div_ceil(factor), expected);
/// });
/// ```
///
/// ## Unwind safety
///
/// Cases and the values captured by the test closure must be
/// [unwind safe](std::panic::UnwindSafe). Fields which are not, such as
/// values with interior mutability, should either be constructed inside the
/// closure or wrapped in [`AssertUnwindSafe`](std::panic::AssertUnwindSafe).
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Call `test` with a reference to each case.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Call `test` with each case by value.
    ///
    /// The case is formatted before the call, so that it can still be
    /// reported if the test panics.
    fn test_each_value(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe;
}

/// Debug representations of the cases which panicked.
#[derive(Default)]
struct Failures {
    cases: Vec<String>,
}

impl Failures {
    fn record(&mut self, passed: bool, case: impl FnOnce() -> String) {
        if !passed {
            self.cases.push(case());
        }
    }

    fn finish(self) {
        assert!(
            self.cases.is_empty(),
            "{} test cases failed: [{}]",
            self.cases.len(),
            self.cases.join(", ")
        );
    }
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe,
    {
        let mut failures = Failures::default();
        for case in self {
            let passed = catch_unwind(|| test(&case)).is_ok();
            failures.record(passed, || format!("{:?}", case));
        }
        failures.finish();
    }

    fn test_each_value(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe,
    {
        let mut failures = Failures::default();
        for case in self {
            let desc = format!("{:?}", case);
            let test = &test;
            let passed = catch_unwind(move || test(case)).is_ok();
            failures.record(passed, || desc);
        }
        failures.finish();
    }
}
