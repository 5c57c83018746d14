//! Main restore loop: reads `BatchRecord`s, maps the target frames, streams
//! page payloads into place, drives PTE rewriting, and enqueues m2p
//! updates.

use crate::context::RestoreContext;
use crate::error::{Error, Result};
use crate::frame::{Mfn, Pfn};
use crate::p2m::{PfnType, TableKind};
use crate::pte::PteRewriter;
use crate::region::MappedRegion;
use crate::sys::{MAX_BATCH_SIZE, PAGE_SIZE};
use log::{debug, trace, warn};
use tokio::io::AsyncRead;

use crate::stream::StreamReader;

pub struct BatchOutcome {
    pub verify_mismatches: u64,
}

pub struct BatchReceiver;

impl BatchReceiver {
    /// Runs the main loop to completion (count `0`). Returns once the
    /// terminating record has been consumed.
    pub async fn run<R: AsyncRead + Unpin>(
        ctx: &mut RestoreContext<'_>,
        stream: &mut StreamReader<R>,
    ) -> Result<BatchOutcome> {
        let mut verify = false;
        let mut verify_mismatches = 0u64;

        loop {
            let j = stream.read_i32_le().await?;
            if j == -1 {
                verify = true;
                debug!("entering page verify mode");
                continue;
            }
            if j == 0 {
                break;
            }
            if j < 0 || j as usize > MAX_BATCH_SIZE {
                return Err(Error::BatchTooLarge(j as i64));
            }

            verify_mismatches += Self::run_batch(ctx, stream, j as usize, verify).await?;
        }

        ctx.mmu.flush().await?;
        Ok(BatchOutcome { verify_mismatches })
    }

    async fn run_batch<R: AsyncRead + Unpin>(
        ctx: &mut RestoreContext<'_>,
        stream: &mut StreamReader<R>,
        count: usize,
        verify: bool,
    ) -> Result<u64> {
        let mut region_pfn_type = Vec::with_capacity(count);
        for _ in 0..count {
            region_pfn_type.push(stream.read_u64_le().await?);
        }

        let mut region_mfn = Vec::with_capacity(count);
        for &raw in &region_pfn_type {
            let ty = PfnType::decode(tag_of(raw));
            if ty.kind() == TableKind::XTab {
                region_mfn.push(Mfn::new(0));
            } else {
                let pfn = Pfn::new(untyped_pfn(raw));
                if !ctx.p2m.in_range(pfn) {
                    return Err(Error::Validation("pfn out of range in batch record"));
                }
                region_mfn.push(ctx.p2m.mfn(pfn));
            }
        }

        let mut region = MappedRegion::map_batch(ctx.call, ctx.domid, &region_mfn).await?;
        let mut mismatches = 0u64;

        for (i, &raw) in region_pfn_type.iter().enumerate() {
            let ty = PfnType::decode(tag_of(raw));
            if ty.kind() == TableKind::XTab {
                continue;
            }

            let pfn = Pfn::new(untyped_pfn(raw));
            if !ctx.p2m.in_range(pfn) {
                return Err(Error::Validation("pfn out of range in batch record"));
            }
            ctx.p2m.set_type(pfn, ty);
            let mfn = ctx.p2m.mfn(pfn);

            let defer_l1 =
                ctx.pt_levels() == 3 && !ctx.pae_extended_cr3 && ty.kind() == TableKind::L1;

            if verify {
                let mut scratch = vec![0u8; PAGE_SIZE as usize];
                stream.read_exact(&mut scratch).await?;
                if ty.kind().is_page_table() && !defer_l1 {
                    if PteRewriter::uncanonicalize(&mut scratch, ctx.pt_levels(), &ctx.p2m)
                        .is_err()
                    {
                        ctx.nraces += 1;
                        warn!("pte rewrite race on {:?} (nraces={})", pfn, ctx.nraces);
                        continue;
                    }
                } else if !ty.kind().is_page_table() && ty.kind() != TableKind::NoTab {
                    return Err(Error::Validation("malformed pagetype tag"));
                }
                if region.page_mut(i) != scratch.as_slice() {
                    mismatches += 1;
                    trace!("verify mismatch at {:?}", pfn);
                }
            } else {
                let dest = region.page_mut(i);
                stream.read_exact(dest).await?;
                if ty.kind().is_page_table() && !defer_l1 {
                    if PteRewriter::uncanonicalize(dest, ctx.pt_levels(), &ctx.p2m).is_err() {
                        ctx.nraces += 1;
                        warn!("pte rewrite race on {:?} (nraces={})", pfn, ctx.nraces);
                        continue;
                    }
                } else if !ty.kind().is_page_table() && ty.kind() != TableKind::NoTab {
                    return Err(Error::Validation("malformed pagetype tag"));
                }
            }

            ctx.mmu.add(mfn, pfn);
        }

        region.unmap()?;
        Ok(mismatches)
    }
}

fn untyped_pfn(raw: u64) -> u64 {
    raw & !(crate::sys::XEN_DOMCTL_PFINFO_LTAB_MASK as u64)
}

fn tag_of(raw: u64) -> u32 {
    (raw & crate::sys::XEN_DOMCTL_PFINFO_LTAB_MASK as u64) as u32
}
