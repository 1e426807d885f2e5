//! First-success combinator over an ordered list of fallible candidates

/// Error type of a chain candidate
pub trait ChainError {
    /// A fatal error stops the chain instead of moving to the next candidate
    fn is_fatal(&self) -> bool {
        false
    }
}

/// Outcome of [`first_success`]
#[derive(Debug)]
pub enum ChainOutcome<T, E> {
    /// A candidate succeeded; later candidates were not tried
    Success(T),
    /// Every candidate failed, errors in candidate order
    Exhausted(Vec<E>),
    /// A candidate failed fatally
    Aborted(E),
}

/// Try each candidate in order and return the first success
pub fn first_success<I, C, T, E, F>(candidates: I, mut attempt: F) -> ChainOutcome<T, E>
where
    I: IntoIterator<Item = C>,
    F: FnMut(C) -> Result<T, E>,
    E: ChainError,
{
    let mut failures = Vec::new();
    for candidate in candidates {
        match attempt(candidate) {
            Ok(value) => return ChainOutcome::Success(value),
            Err(err) if err.is_fatal() => return ChainOutcome::Aborted(err),
            Err(err) => failures.push(err),
        }
    }
    ChainOutcome::Exhausted(failures)
}
