use std::future::Future;

/// The computation a `TimedCache` decorates.
///
/// A source takes no arguments and either produces a value or fails. It is
/// treated as a black box: it may be slow, it may fail, and it is re-invoked
/// every time the cache decides the held value needs replacing.
///
/// Any `Fn() -> impl Future<Output = Result<T, E>>` closure is a source.
///
/// # Examples
///
/// ```rust
/// use stalebox_core::Source;
/// use std::future::Ready;
///
/// struct Fixed(u64);
///
/// impl Source for Fixed {
///     type Value = u64;
///     type Error = std::io::Error;
///     type Future = Ready<Result<u64, std::io::Error>>;
///
///     fn load(&self) -> Self::Future {
///         std::future::ready(Ok(self.0))
///     }
/// }
///
/// let closure = || async { Ok::<_, std::io::Error>(42u64) };
/// # fn assert_source<S: Source>(_: &S) {}
/// # assert_source(&Fixed(1));
/// # assert_source(&closure);
/// ```
pub trait Source: Send + Sync + 'static {
    /// Value produced on success.
    type Value;

    /// Error produced on failure.
    type Error;

    /// The future that resolves to the computation result.
    type Future: Future<Output = Result<Self::Value, Self::Error>> + Send;

    /// Starts one computation.
    fn load(&self) -> Self::Future;
}

impl<F, Fut, T, E> Source for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send,
{
    type Value = T;
    type Error = E;
    type Future = Fut;

    fn load(&self) -> Self::Future {
        self()
    }
}
