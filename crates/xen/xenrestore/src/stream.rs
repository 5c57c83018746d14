//! Exact-length reads from the checkpoint stream.
//!
//! The source collaborator may be a file, socket, or pipe; we only require
//! `AsyncRead`. A short read or EOF mid-buffer is fatal; an interrupted read
//! is retried transparently.

use crate::error::{Error, Result};
use crate::sys::PAGE_SIZE;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

pub struct StreamReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        StreamReader { inner }
    }

    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]).await {
                Ok(0) => {
                    return Err(Error::Stream {
                        wanted: buf.len(),
                        got: filled,
                    })
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub async fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).await?;
        Ok(u32::from_le_bytes(buf))
    }

    pub async fn read_i32_le(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).await?;
        Ok(i32::from_le_bytes(buf))
    }

    pub async fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf).await?;
        Ok(u64::from_le_bytes(buf))
    }

    pub async fn read_page(&mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; PAGE_SIZE as usize];
        self.read_exact(&mut buf).await?;
        Ok(buf)
    }

    pub async fn discard(&mut self, n: usize) -> Result<()> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn reads_exact_fields() {
        let data: Vec<u8> = vec![0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff];
        let mut r = StreamReader::new(Cursor::new(data));
        assert_eq!(r.read_u32_le().await.unwrap(), 1);
        assert_eq!(r.read_i32_le().await.unwrap(), -1);
    }

    #[tokio::test]
    async fn short_read_is_fatal() {
        let mut r = StreamReader::new(Cursor::new(vec![0u8; 2]));
        assert!(r.read_u32_le().await.is_err());
    }
}
