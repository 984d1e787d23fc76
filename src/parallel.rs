//! Order-preserving maps that fan out over rayon when the `parallel`
//! feature is enabled and run sequentially otherwise. Results are identical
//! either way.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Map every item, keeping input order.
#[cfg(feature = "parallel")]
pub(crate) fn map_ordered<T, U, F>(items: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    items.par_iter().map(f).collect()
}

/// Map every item, keeping input order.
#[cfg(not(feature = "parallel"))]
pub(crate) fn map_ordered<T, U, F>(items: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    items.iter().map(f).collect()
}

/// Map `0..n`, keeping index order.
#[cfg(feature = "parallel")]
pub(crate) fn map_range<U, F>(n: usize, f: F) -> Vec<U>
where
    U: Send,
    F: Fn(usize) -> U + Sync + Send,
{
    (0..n).into_par_iter().map(f).collect()
}

/// Map `0..n`, keeping index order.
#[cfg(not(feature = "parallel"))]
pub(crate) fn map_range<U, F>(n: usize, f: F) -> Vec<U>
where
    U: Send,
    F: Fn(usize) -> U + Sync + Send,
{
    (0..n).map(f).collect()
}
