// SPDX-License-Identifier: GPL-2.0-only

//
// Compiler utilities
//

/// Fixed length first-in first-out buffer
pub struct FIFO<T, const N: usize> {
    array: [Option<T>; N],
    pos: usize,
    len: usize,
}

impl<T, const N: usize> FIFO<T, N> {
    pub fn new() -> Self {
        FIFO {
            array: std::array::from_fn(|_| None),
            pos: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        if i < self.len {
            self.array[(self.pos + i) % N].as_ref()
        } else {
            None
        }
    }

    pub fn push(&mut self, val: T) {
        // Make sure there is room
        assert!(self.len < N);
        self.array[(self.pos + self.len) % N] = Some(val);
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len > 0 {
            let val = self.array[self.pos].take();
            self.pos = (self.pos + 1) % N;
            self.len -= 1;
            val
        } else {
            None
        }
    }
}

/// Peekable iterator adapter with fixed length peek window
pub struct PeekIter<T, const N: usize> where T: Iterator {
    iter: T,
    fifo: FIFO<T::Item, N>
}

impl<T, const N: usize> PeekIter<T, N> where T: Iterator {
    pub fn new(iter: T) -> Self {
        PeekIter {
            iter: iter,
            fifo: FIFO::new(),
        }
    }

    /// Look i items ahead without consuming anything
    pub fn peek(&mut self, i: usize) -> Option<&T::Item> {
        while self.fifo.len() <= i {
            self.fifo.push(self.iter.next()?)
        }
        self.fifo.get(i)
    }
}

impl<T, const N: usize> Iterator for PeekIter<T, N> where T: Iterator {
    type Item = T::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fifo.len() > 0 {
            self.fifo.pop()
        } else {
            self.iter.next()
        }
    }
}
