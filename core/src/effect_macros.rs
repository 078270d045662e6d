//! Effect construction shorthand

/// Build an [`Effect::Future`](crate::effect::Effect::Future) from an async
/// block body evaluating to `Option<Action>`.
///
/// ```rust,ignore
/// async_effect! {
///     match repository.apply(&change).await {
///         Ok(()) => Some(LedgerAction::BookingPlaced { correlation_id, change }),
///         Err(error) => Some(LedgerAction::PersistenceFailed { correlation_id, change, error: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}
