//! Declarative macros for effect construction
//!
//! Writing out `Effect::Delay` with its boxed action at every call site
//! drowns the interesting part, the duration and the action. `delay!`
//! keeps schedule sites down to those two lines.

/// Build an `Effect::Delay` that dispatches `action` after `duration`.
///
/// # Example
///
/// ```rust,ignore
/// use vending_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(5),
///     action: VendingAction::DisplayTimerElapsed
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
