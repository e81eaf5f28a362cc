use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use crate::eval::ErrorKind;
use crate::value::Value;

/// Integer indexed table backing arrays (mutable) and tuples (immutable).
///
/// Entries are kept dense from zero by every operation except `set`, which may leave holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    entries: BTreeMap<usize, Value>,
    mutable: bool,
}

impl Collection {
    pub fn new(values: Vec<Value>, mutable: bool) -> Collection {
        Collection {
            entries: values.into_iter().enumerate().collect(),
            mutable,
        }
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.entries.get(&index)
    }

    /// Indexed assignment.  Fails on tuples.
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), ErrorKind> {
        if !self.mutable {
            return Err(ErrorKind::ImmutableCollection);
        }
        self.entries.insert(index, value);
        Ok(())
    }

    pub fn push(&mut self, value: Value) {
        let index = self.len();
        self.entries.insert(index, value);
    }

    /// Insert `value` at index 0, shifting every entry up by one.
    pub fn unshift(&mut self, value: Value) -> Result<(), ErrorKind> {
        Self::check_shift(&self.entries, 1)?;
        let rest = std::mem::take(&mut self.entries);
        self.entries = std::iter::once((0, value))
            .chain(rest.into_iter().map(|(i, v)| (i + 1, v)))
            .collect();
        Ok(())
    }

    /// Append the entries of `other`, offset by the current size.
    pub fn concat(&mut self, other: &Collection) -> Result<(), ErrorKind> {
        let offset = self.len();
        Self::check_shift(&other.entries, offset)?;
        for (i, v) in &other.entries {
            self.entries.insert(i + offset, v.clone());
        }
        Ok(())
    }

    /// Fails if moving `entries` up by `offset` would overflow the highest index.
    fn check_shift(entries: &BTreeMap<usize, Value>, offset: usize) -> Result<(), ErrorKind> {
        match entries.keys().next_back() {
            Some(last) if last.checked_add(offset).is_none() => Err(ErrorKind::IndexOverflow),
            _ => Ok(()),
        }
    }

    pub fn remove_from_start(&mut self, count: usize) -> Result<(), ErrorKind> {
        self.check_count(count)?;
        let rest = std::mem::take(&mut self.entries);
        self.entries = rest.into_values().skip(count).enumerate().collect();
        Ok(())
    }

    pub fn remove_from_end(&mut self, count: usize) -> Result<(), ErrorKind> {
        self.check_count(count)?;
        let keep = self.len() - count;
        let rest = std::mem::take(&mut self.entries);
        self.entries = rest.into_values().take(keep).enumerate().collect();
        Ok(())
    }

    fn check_count(&self, count: usize) -> Result<(), ErrorKind> {
        if count > self.len() {
            Err(ErrorKind::RemoveCount {
                requested: count,
                size: self.len(),
            })
        } else {
            Ok(())
        }
    }
}

thread_local! {
    /// Collections whose rendering is in progress on this thread, innermost last.
    static RENDERING: RefCell<Vec<*const Collection>> = RefCell::new(Vec::new());
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = if self.mutable { ('[', ']') } else { ('(', ')') };
        let this = self as *const Collection;
        if RENDERING.with(|r| r.borrow().contains(&this)) {
            return write!(f, "{}...{}", open, close);
        }
        RENDERING.with(|r| r.borrow_mut().push(this));
        let result = self.fmt_entries(f, open, close);
        RENDERING.with(|r| r.borrow_mut().pop());
        result
    }
}

impl Collection {
    fn fmt_entries(&self, f: &mut fmt::Formatter<'_>, open: char, close: char) -> fmt::Result {
        write!(f, "{}", open)?;
        for (n, (i, v)) in self.entries.iter().enumerate() {
            if n > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}: {},", i, v)?;
        }
        write!(f, "{}", close)
    }
}
