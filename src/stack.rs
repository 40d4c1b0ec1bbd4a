//! The evaluation stack.

use crate::script_error::ScriptError;

/// A stack of byte-string elements, indexed from the top.
///
/// All structural failures surface as [`ScriptError::InvalidStackOperation`]
/// so opcode implementations can use `?` directly.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Stack<T>(Vec<T>);

impl<T> Stack<T> {
    pub fn new() -> Self {
        Stack(Vec::new())
    }

    fn from_top(&self, i: usize) -> Result<usize, ScriptError> {
        if i < self.0.len() {
            Ok(self.0.len() - 1 - i)
        } else {
            Err(ScriptError::InvalidStackOperation)
        }
    }

    pub fn push(&mut self, value: T) {
        self.0.push(value)
    }

    pub fn pop(&mut self) -> Result<T, ScriptError> {
        self.0.pop().ok_or(ScriptError::InvalidStackOperation)
    }

    /// The element `i` positions below the top (0 is the top itself).
    pub fn top(&self, i: usize) -> Result<&T, ScriptError> {
        self.from_top(i).map(|idx| &self.0[idx])
    }

    pub fn last(&self) -> Result<&T, ScriptError> {
        self.0.last().ok_or(ScriptError::InvalidStackOperation)
    }

    pub fn last_mut(&mut self) -> Result<&mut T, ScriptError> {
        self.0.last_mut().ok_or(ScriptError::InvalidStackOperation)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exchange the elements `a` and `b` positions below the top.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), ScriptError> {
        let a = self.from_top(a)?;
        let b = self.from_top(b)?;
        self.0.swap(a, b);
        Ok(())
    }

    /// Remove the element `i` positions below the top and return it.
    pub fn remove(&mut self, i: usize) -> Result<T, ScriptError> {
        self.from_top(i).map(|idx| self.0.remove(idx))
    }

    /// Re-push a copy of the element `i` positions below the top (OP_PICK).
    pub fn pick(&mut self, i: usize) -> Result<(), ScriptError>
    where
        T: Clone,
    {
        let value = self.top(i)?.clone();
        self.push(value);
        Ok(())
    }

    /// Move the element `i` positions below the top to the top (OP_ROLL).
    pub fn roll(&mut self, i: usize) -> Result<(), ScriptError> {
        let value = self.remove(i)?;
        self.push(value);
        Ok(())
    }

    /// Insert `value` so that it ends up `i` positions below the top.
    pub fn insert(&mut self, i: usize, value: T) -> Result<(), ScriptError> {
        // Inserting one past the deepest element is legal (OP_TUCK at depth 2).
        if i <= self.0.len() {
            self.0.insert(self.0.len() - i, value);
            Ok(())
        } else {
            Err(ScriptError::InvalidStackOperation)
        }
    }

    /// Copy the top `n` elements in order (OP_DUP through OP_3DUP).
    pub fn dup_n(&mut self, n: usize) -> Result<(), ScriptError>
    where
        T: Clone,
    {
        // Probe the deepest source first so a short stack fails cleanly.
        self.from_top(n - 1)?;
        for _ in 0..n {
            self.pick(n - 1)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.0.iter()
    }
}

impl<T> From<Vec<T>> for Stack<T> {
    fn from(value: Vec<T>) -> Self {
        Stack(value)
    }
}

impl<T> From<Stack<T>> for Vec<T> {
    fn from(value: Stack<T>) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(items: &[u8]) -> Stack<u8> {
        Stack(items.to_vec())
    }

    #[test]
    fn top_counts_from_the_top() {
        let s = stack(&[1, 2, 3]);
        assert_eq!(s.top(0), Ok(&3));
        assert_eq!(s.top(2), Ok(&1));
        assert_eq!(s.top(3), Err(ScriptError::InvalidStackOperation));
    }

    #[test]
    fn pop_on_empty_fails() {
        let mut s: Stack<u8> = Stack::new();
        assert_eq!(s.pop(), Err(ScriptError::InvalidStackOperation));
    }

    #[test]
    fn roll_moves_to_top() {
        let mut s = stack(&[1, 2, 3]);
        s.roll(2).expect("rolls");
        assert_eq!(s, stack(&[2, 3, 1]));
    }

    #[test]
    fn pick_copies_to_top() {
        let mut s = stack(&[1, 2, 3]);
        s.pick(1).expect("picks");
        assert_eq!(s, stack(&[1, 2, 3, 2]));
    }

    #[test]
    fn dup_n_preserves_order() {
        let mut s = stack(&[1, 2, 3]);
        s.dup_n(2).expect("dups");
        assert_eq!(s, stack(&[1, 2, 3, 2, 3]));
        let mut short = stack(&[9]);
        assert_eq!(short.dup_n(3), Err(ScriptError::InvalidStackOperation));
        // A failed dup leaves the stack untouched.
        assert_eq!(short, stack(&[9]));
    }

    #[test]
    fn insert_below_top() {
        let mut s = stack(&[1, 2]);
        s.insert(2, 9).expect("inserts");
        assert_eq!(s, stack(&[9, 1, 2]));
    }
}
