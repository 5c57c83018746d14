//! Parses the optional extended-info prefix and the guest's own P2M
//! frame-list (the frames the guest kernel stores its p2m mirror in,
//! translated later by TailPatcher — distinct from the engine's internal
//! pfn→mfn table, which comes from `get_pfn_list`).

use crate::error::{Error, Result};
use crate::frame::Pfn;
use crate::stream::StreamReader;
use crate::sys::{
    p2m_fl_entries, EXTENDED_INFO_CHUNK_SIG_VCPU, EXTENDED_INFO_SENTINEL,
    VMASST_TYPE_PAE_EXTENDED_CR3,
};
use tokio::io::AsyncRead;
use xencall::sys::x8664VcpuGuestContext;

#[derive(Default)]
pub struct ExtendedInfo {
    pub pae_extended_cr3: bool,
    pub vcpu_context: Option<x8664VcpuGuestContext>,
}

pub struct HeaderDecoder;

impl HeaderDecoder {
    /// Returns the decoded extended-info (if any) and the guest's p2m
    /// frame-list, as raw pfns, `p2m_fl_entries(max_pfn)` words long.
    pub async fn decode<R: AsyncRead + Unpin>(
        stream: &mut StreamReader<R>,
        max_pfn: u64,
    ) -> Result<(ExtendedInfo, Vec<Pfn>)> {
        let mut w0 = stream.read_u64_le().await?;
        let mut ext = ExtendedInfo::default();

        if w0 == EXTENDED_INFO_SENTINEL {
            ext = Self::decode_extended_info(stream).await?;
            w0 = stream.read_u64_le().await?;
        }

        let entries = p2m_fl_entries(max_pfn);
        let mut words = Vec::with_capacity(entries as usize);
        words.push(w0);
        for _ in 1..entries {
            words.push(stream.read_u64_le().await?);
        }
        Ok((ext, words.into_iter().map(Pfn::new).collect()))
    }

    async fn decode_extended_info<R: AsyncRead + Unpin>(
        stream: &mut StreamReader<R>,
    ) -> Result<ExtendedInfo> {
        let mut ext = ExtendedInfo::default();
        let mut total = stream.read_u32_le().await? as i64;

        while total > 0 {
            let mut sig = [0u8; 4];
            stream.read_exact(&mut sig).await?;
            let mut chunk_bytes = stream.read_u32_le().await?;
            total -= 8;

            if sig == EXTENDED_INFO_CHUNK_SIG_VCPU {
                let ctx_size = std::mem::size_of::<x8664VcpuGuestContext>() as u32;
                if chunk_bytes < ctx_size {
                    return Err(Error::ChunkTooSmall(chunk_bytes));
                }
                let mut buf = vec![0u8; ctx_size as usize];
                stream.read_exact(&mut buf).await?;
                let ctx: x8664VcpuGuestContext =
                    unsafe { std::ptr::read_unaligned(buf.as_ptr() as *const _) };
                ext.pae_extended_cr3 =
                    ctx.vm_assist & (1u64 << VMASST_TYPE_PAE_EXTENDED_CR3) != 0;
                ext.vcpu_context = Some(ctx);
                total -= ctx_size as i64;
                chunk_bytes -= ctx_size;
            }

            if chunk_bytes > 0 {
                stream.discard(chunk_bytes as usize).await?;
                total -= chunk_bytes as i64;
            }
        }
        Ok(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn no_extended_info_leaves_first_word_intact() {
        let data: Vec<u8> = vec![7u8, 0, 0, 0, 0, 0, 0, 0];
        let mut r = StreamReader::new(Cursor::new(data));
        let (ext, words) = HeaderDecoder::decode(&mut r, 512).await.unwrap();
        assert!(!ext.pae_extended_cr3);
        assert_eq!(words[0].get(), 7);
    }

    #[tokio::test]
    async fn unrecognized_chunk_is_discarded() {
        let mut data = Vec::new();
        data.extend_from_slice(&EXTENDED_INFO_SENTINEL.to_le_bytes());
        data.extend_from_slice(&12u32.to_le_bytes()); // total
        data.extend_from_slice(b"xxxx");
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&99u64.to_le_bytes()); // real first p2m fl word
        let mut r = StreamReader::new(Cursor::new(data));
        let (ext, words) = HeaderDecoder::decode(&mut r, 512).await.unwrap();
        assert!(!ext.pae_extended_cr3);
        assert_eq!(words[0].get(), 99);
    }
}
