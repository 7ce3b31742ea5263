// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A move-only owning handle whose payload transfers between handles, leaving
//! the source empty. See [`Mobile`].

/// An owning handle to a heap value with transfer-on-move semantics.
///
/// A `Mobile` either holds a boxed value or is empty. [`transfer()`] moves the
/// payload into a fresh handle and leaves the source empty, so at most one
/// handle ever owns a given payload - the exclusive-read, exclusive-write
/// discipline that keeps large values safe to pass through channels without
/// copying them.
///
/// Sending a `Mobile<T>` through a channel moves the handle itself, which is
/// already a transfer in Rust; `transfer()` exists for the cases where the
/// source variable must remain live (and observably empty) afterwards.
///
/// ```rust
/// use weft::Mobile;
///
/// let mut a = Mobile::new(vec![1, 2, 3]);
/// let b = a.transfer();
/// assert!(a.is_empty());
/// assert_eq!(b.as_ref(), Some(&vec![1, 2, 3]));
/// ```
///
/// [`transfer()`]: Mobile::transfer
#[derive(Debug)]
pub struct Mobile<T> {
    inner: Option<Box<T>>,
}

impl<T> Mobile<T> {
    /// Wraps `value` in a fresh handle.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Some(Box::new(value)),
        }
    }

    /// An empty handle.
    #[must_use]
    pub fn empty() -> Self { Self { inner: None } }

    /// Moves the payload into a new handle, leaving this one empty.
    ///
    /// Transferring an empty handle yields another empty handle.
    #[must_use]
    pub fn transfer(&mut self) -> Self {
        Self {
            inner: self.inner.take(),
        }
    }

    /// Drops the payload (if any), leaving the handle empty.
    pub fn blank(&mut self) { self.inner = None; }

    /// Takes the payload out of the handle.
    #[must_use]
    pub fn take(&mut self) -> Option<T> { self.inner.take().map(|boxed| *boxed) }

    /// Whether the handle currently holds no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.inner.is_none() }

    /// Borrows the payload.
    #[must_use]
    pub fn as_ref(&self) -> Option<&T> { self.inner.as_deref() }

    /// Mutably borrows the payload.
    #[must_use]
    pub fn as_mut(&mut self) -> Option<&mut T> { self.inner.as_deref_mut() }
}

impl<T: Clone> Mobile<T> {
    /// A deep copy in a separate handle; this handle is unaffected.
    ///
    /// An empty handle clones to an empty handle.
    #[must_use]
    pub fn clone_value(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Mobile<T> {
    fn default() -> Self { Self::empty() }
}

impl<T> From<T> for Mobile<T> {
    fn from(value: T) -> Self { Self::new(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transfer_empties_the_source() {
        let mut a = Mobile::new(String::from("payload"));
        let b = a.transfer();
        assert!(a.is_empty());
        assert_eq!(b.as_ref().map(String::as_str), Some("payload"));
    }

    #[test]
    fn transfer_of_empty_stays_empty() {
        let mut a: Mobile<u8> = Mobile::empty();
        let b = a.transfer();
        assert!(a.is_empty());
        assert!(b.is_empty());
    }

    #[test]
    fn take_consumes_the_payload_once() {
        let mut a = Mobile::new(7);
        assert_eq!(a.take(), Some(7));
        assert_eq!(a.take(), None);
    }

    #[test]
    fn clone_value_leaves_source_intact() {
        let a = Mobile::new(vec![1, 2]);
        let b = a.clone_value();
        assert_eq!(a.as_ref(), Some(&vec![1, 2]));
        assert_eq!(b.as_ref(), Some(&vec![1, 2]));
    }

    #[test]
    fn blank_drops_the_payload() {
        let mut a = Mobile::new(1);
        a.blank();
        assert!(a.is_empty());
    }
}
