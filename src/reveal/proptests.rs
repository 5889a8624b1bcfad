//! Property-based tests for the reveal task

use super::*;
use proptest::prelude::*;

proptest! {
    /// reveal(S) ends on S exactly, one character at a time, nothing dropped or repeated
    #[test]
    fn prop_reveal_round_trips(text in "\\PC{0,40}") {
        let mut scheduler = RevealScheduler::default();
        let mut task = scheduler.start(text.clone());
        let total = text.chars().count();

        let mut previous = String::new();
        let mut ticks = 0usize;
        let completed = loop {
            let step = task.advance();
            ticks += 1;
            let visible = task.visible().to_string();
            prop_assert!(visible.starts_with(&previous));
            prop_assert!(visible.chars().count() <= previous.chars().count() + 1);
            previous = visible;
            match step {
                RevealStep::Frame => prop_assert!(ticks < total),
                RevealStep::Complete(full) => break full,
                other => return Err(TestCaseError::fail(format!("unexpected {other:?}"))),
            }
        };

        prop_assert_eq!(&completed, &text);
        prop_assert_eq!(previous, text);
        prop_assert_eq!(ticks, total.max(1));
        prop_assert_eq!(task.advance(), RevealStep::Finished);
    }

    /// Once cancelled, no tick ever reports completion
    #[test]
    fn prop_cancel_before_completion_never_completes(
        text in "[a-z]{1,30}",
        cut in 0usize..30,
        extra in 1usize..40,
    ) {
        let mut scheduler = RevealScheduler::default();
        let mut task = scheduler.start(text.clone());
        let cut = cut % text.len();
        for _ in 0..cut {
            prop_assert_eq!(task.advance(), RevealStep::Frame);
        }
        task.cancel();
        for _ in 0..extra {
            prop_assert_eq!(task.advance(), RevealStep::Cancelled);
        }
        prop_assert_eq!(task.visible().chars().count(), cut);
    }
}
