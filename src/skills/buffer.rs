use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::skills::ability::InputSymbol;

pub const DEFAULT_BUFFER_CAPACITY: usize = 10;

/// Sliding window of recent judged inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSequenceBuffer {
    symbols: VecDeque<InputSymbol>,
    capacity: usize,
}

impl InputSequenceBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            symbols: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, dropping the oldest symbol when full
    pub fn push(&mut self, symbol: InputSymbol) {
        if self.symbols.len() >= self.capacity {
            self.symbols.pop_front();
        }
        self.symbols.push_back(symbol);
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Does the most recent input end with `pattern`?
    pub fn ends_with(&self, pattern: &[InputSymbol]) -> bool {
        if pattern.is_empty() || pattern.len() > self.symbols.len() {
            return false;
        }
        let start = self.symbols.len() - pattern.len();
        self.symbols.range(start..).eq(pattern.iter())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &InputSymbol> {
        self.symbols.iter()
    }
}

impl Default for InputSequenceBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InputSymbol::*;

    #[test]
    fn test_sliding_window() {
        let mut buffer = InputSequenceBuffer::new(3);
        buffer.push(A);
        buffer.push(B);
        buffer.push(X);
        buffer.push(Y);

        assert_eq!(buffer.len(), 3);
        let contents: Vec<_> = buffer.symbols().copied().collect();
        assert_eq!(contents, vec![B, X, Y]); // A evicted
    }

    #[test]
    fn test_ends_with() {
        let mut buffer = InputSequenceBuffer::default();
        buffer.push(X);
        buffer.push(A);
        buffer.push(B);

        assert!(buffer.ends_with(&[A, B]));
        assert!(buffer.ends_with(&[X, A, B]));
        assert!(!buffer.ends_with(&[X, A]));
        assert!(!buffer.ends_with(&[Y, X, A, B]));
        assert!(!buffer.ends_with(&[]));
    }

    #[test]
    fn test_default_capacity() {
        let buffer = InputSequenceBuffer::default();
        assert_eq!(buffer.capacity(), 10);
        assert!(buffer.is_empty());
    }
}
