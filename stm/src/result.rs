/// Outcome of a single step of a transaction attempt.
///
/// Unlike the reference implementation's algebraic-effect `retry`, this
/// never actually diverges: it returns `Err(StmError::Retry)` and relies on
/// callers propagating it with `?`. Code inside an `atomic` block should
/// never match on this directly; compose with [`crate::Transaction::or_else`]
/// instead.
#[derive(Eq, PartialEq, Clone, Copy, Debug, thiserror::Error)]
pub enum StmError {
    /// `retry()` was called explicitly.
    ///
    /// The enclosing `atomic` blocks until at least one observed TVar
    /// changes, then re-executes. `Transaction::or_else` intercepts this
    /// before it escapes to the enclosing `atomic`.
    #[error("transaction retry requested")]
    Retry,
}

/// Result of one step of an STM computation.
pub type StmResult<T> = Result<T, StmError>;
