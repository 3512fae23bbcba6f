/* ********************************************************************** **
**  This file is part of fcs2.                                            **
**                                                                        **
**  fcs2 is free software: you can redistribute it and/or modify it under **
**  the terms of the GNU General Public License as published by the Free  **
**  Software Foundation, either version 3 of the License, or (at your     **
**  option) any later version.                                            **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of fcs2 is licensed under the GPL, many  **
** parts of it are licensed under more permissive terms.                  **
** ********************************************************************** */

/// Tracks a value together with the last value that was communicated to the
/// external library, so that redundant communication can be skipped.
///
/// Possible states for the members:
///
/// ```text
///  dirty:       clean:       when
///  Some(s)       None       dirty, and has never been clean.
///  Some(s)      Some(s)     dirty, but has been clean in the past.
///   None        Some(s)     currently clean.
/// ```
pub(crate) struct MaybeDirty<T> {
    /// new data that has not been marked clean.
    dirty: Option<T>,
    /// the last data marked clean.
    clean: Option<T>,
}

impl<T> MaybeDirty<T> {
    pub(crate) fn new_dirty(x: T) -> MaybeDirty<T> {
        MaybeDirty {
            dirty: Some(x),
            clean: None,
        }
    }

    pub(crate) fn get(&self) -> &T
    { self.dirty.as_ref().or(self.clean.as_ref()).unwrap() }

    /// Get a mutable reference. This automatically marks the value as dirty.
    pub(crate) fn get_mut(&mut self) -> &mut T
    where T: Clone,
    {
        if self.dirty.is_none() {
            self.dirty = self.clean.clone();
        }
        self.dirty.as_mut().unwrap()
    }

    pub(crate) fn mark_clean(&mut self) {
        assert!(self.dirty.is_some() || self.clean.is_some());

        if self.dirty.is_some() {
            self.clean = self.dirty.take();
        }

        assert!(self.dirty.is_none());
        assert!(self.clean.is_some());
    }

    /// Test whether `f(x)` differs between the current value and the last
    /// clean value. If nothing was ever clean, every projection is dirty.
    pub(crate) fn is_projection_dirty<K: ?Sized + PartialEq>(
        &self,
        mut f: impl FnMut(&T) -> &K,
    ) -> bool {
        match (&self.clean, &self.dirty) {
            (Some(clean), Some(dirty)) => f(clean) != f(dirty),
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (None, None) => unreachable!(),
        }
    }
}
