use crate::blockchain::core::block::Header;
use crate::error::{ChainError, Result};

/// Append-only list of accepted headers, indexed by height.
#[derive(Debug, Clone, Default)]
pub struct HeaderList {
    headers: Vec<Header>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, header: Header) {
        self.headers.push(header);
    }

    pub fn get(&self, index: usize) -> Result<&Header> {
        self.headers.get(index).ok_or(ChainError::IndexOutOfRange {
            index,
            len: self.headers.len(),
        })
    }

    /// `len - 1`, or `None` before the first header is added.
    pub fn height(&self) -> Option<u64> {
        (self.headers.len() as u64).checked_sub(1)
    }

    pub fn last(&self) -> Option<&Header> {
        self.headers.last()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(height: u64) -> Header {
        Header::new(height, [0u8; 32])
    }

    #[test]
    fn test_empty_list() {
        let list = HeaderList::new();
        assert!(list.is_empty());
        assert_eq!(list.height(), None);
        assert_eq!(
            list.get(0).unwrap_err(),
            ChainError::IndexOutOfRange { index: 0, len: 0 }
        );
    }

    #[test]
    fn test_add_and_get() {
        let mut list = HeaderList::new();
        for i in 0..3 {
            list.add(header(i));
        }
        assert_eq!(list.len(), 3);
        assert_eq!(list.height(), Some(2));
        assert_eq!(list.get(1).unwrap().height, 1);
        assert_eq!(list.last().unwrap().height, 2);
        assert!(list.get(3).is_err());
    }
}
