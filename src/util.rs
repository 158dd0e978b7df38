use alloc::vec::Vec;

/// Runs a closure on drop unless cancelled, for unwinding partially
/// completed multi-step kernel requests.
pub(crate) struct Cleanup<F>
where
    F: FnOnce(),
{
    f: Option<F>,
}

impl<F> Cleanup<F>
where
    F: FnOnce(),
{
    pub(crate) fn new(f: F) -> Self {
        Self { f: Some(f) }
    }

    pub(crate) fn cancel(&mut self) {
        self.f = None;
    }
}

impl<F> Drop for Cleanup<F>
where
    F: FnOnce(),
{
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f()
        };
    }
}

/// Allocate a vector of `len` copies of `value`, reporting allocation
/// failure instead of aborting.
pub(crate) fn vec_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, crate::result::Error> {
    let mut ret = Vec::new();
    ret.try_reserve_exact(len)?;
    ret.resize(len, value);
    Ok(ret)
}
