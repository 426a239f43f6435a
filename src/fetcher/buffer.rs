use crate::app::{ReelwatchError, Result};

/// Initial allocation when the server does not announce a length.
pub const DEFAULT_BUFFER_SIZE: usize = 100 * 1024;

/// In-memory response body that grows by doubling.
///
/// Allocation failures surface as [`ReelwatchError::Capacity`] instead of
/// aborting the process, so only the transfer in progress is lost.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    data: Vec<u8>,
}

impl ResponseBuffer {
    /// Size the buffer from a `Content-Length` hint, or use
    /// [`DEFAULT_BUFFER_SIZE`] when there is none.
    pub fn with_size_hint(content_length: Option<u64>) -> Result<Self> {
        let initial = match content_length {
            Some(len) if len > 0 => usize::try_from(len).map_err(|_| {
                ReelwatchError::Capacity(format!("content length {} exceeds address space", len))
            })?,
            _ => DEFAULT_BUFFER_SIZE,
        };

        let mut data = Vec::new();
        data.try_reserve_exact(initial).map_err(|e| {
            ReelwatchError::Capacity(format!("cannot allocate {} bytes: {}", initial, e))
        })?;

        Ok(Self { data })
    }

    pub fn extend(&mut self, chunk: &[u8]) -> Result<()> {
        let needed = self
            .data
            .len()
            .checked_add(chunk.len())
            .ok_or_else(|| ReelwatchError::Capacity("response too large".into()))?;

        if needed > self.data.capacity() {
            let mut target = self.data.capacity().max(1);
            while target < needed {
                target = target
                    .checked_mul(2)
                    .ok_or_else(|| ReelwatchError::Capacity("response too large".into()))?;
            }
            tracing::trace!("Growing response buffer to {} bytes", target);
            self.data
                .try_reserve_exact(target - self.data.len())
                .map_err(|e| {
                    ReelwatchError::Capacity(format!("cannot allocate {} bytes: {}", target, e))
                })?;
        }

        self.data.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_size_without_hint() {
        let buffer = ResponseBuffer::with_size_hint(None).unwrap();
        assert!(buffer.capacity() >= DEFAULT_BUFFER_SIZE);
        assert!(buffer.is_empty());

        let zero = ResponseBuffer::with_size_hint(Some(0)).unwrap();
        assert!(zero.capacity() >= DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_size_hint_is_used() {
        let buffer = ResponseBuffer::with_size_hint(Some(10)).unwrap();
        assert!(buffer.capacity() >= 10);
        assert!(buffer.capacity() < DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_grows_by_doubling() {
        let mut buffer = ResponseBuffer::with_size_hint(Some(4)).unwrap();
        buffer.extend(b"abc").unwrap();
        buffer.extend(b"0123456789").unwrap();
        assert_eq!(buffer.len(), 13);
        assert!(buffer.capacity() >= 16);
        assert_eq!(buffer.into_inner(), b"abc0123456789".to_vec());
    }

    #[test]
    fn test_many_small_chunks() {
        let mut buffer = ResponseBuffer::with_size_hint(Some(1)).unwrap();
        for _ in 0..1000 {
            buffer.extend(b"xy").unwrap();
        }
        assert_eq!(buffer.len(), 2000);
    }

    #[test]
    fn test_impossible_hint_is_a_capacity_error() {
        let err = ResponseBuffer::with_size_hint(Some(u64::MAX)).unwrap_err();
        assert!(matches!(err, ReelwatchError::Capacity(_)));
    }
}
