use crate::error::{CtError, Result};
use std::future::Future;
use tokio::task::JoinError;

/// Both outcomes of two actors run side by side.
#[derive(Debug)]
pub struct RaceOutcome<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> RaceOutcome<A, B> {
    pub fn into_tuple(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<T, U, E, F> RaceOutcome<Result<T, E>, Result<U, F>> {
    pub fn both_ok(&self) -> bool {
        self.first.is_ok() && self.second.is_ok()
    }

    pub fn any_ok(&self) -> bool {
        self.first.is_ok() || self.second.is_ok()
    }

    pub fn exactly_one_ok(&self) -> bool {
        self.first.is_ok() != self.second.is_ok()
    }
}

/// Run two independent actors concurrently and wait for both.
///
/// Each future is spawned on its own task so neither can starve the other;
/// callers give each actor its own client. Nothing about completion order
/// is reported. A panicking actor re-raises its panic here; an actor
/// cancelled by runtime shutdown yields [`CtError::Cancelled`].
pub async fn race<A, B>(a: A, b: B) -> Result<RaceOutcome<A::Output, B::Output>>
where
    A: Future + Send + 'static,
    A::Output: Send + 'static,
    B: Future + Send + 'static,
    B::Output: Send + 'static,
{
    let first = tokio::spawn(a);
    let second = tokio::spawn(b);
    let (first, second) = tokio::join!(first, second);
    Ok(RaceOutcome {
        first: joined(first)?,
        second: joined(second)?,
    })
}

fn joined<T>(result: Result<T, JoinError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            tracing::error!(error = %e, "Race actor cancelled");
            Err(CtError::Cancelled(e.to_string()))
        }
    }
}
