//! PAE lowmem fixup: on a 3-level (PAE) guest without `pae_extended_cr3`,
//! every L3 root must live below 4G. Roots the batch loop placed above that
//! line get relocated here, in two passes: Pass A moves the roots
//! themselves, Pass B re-rewrites every L1 table the batch loop deferred
//! (since their PTEs may point at an L3 root whose mfn just changed).

use crate::context::RestoreContext;
use crate::error::{Error, Result};
use crate::frame::{Mfn, Pfn};
use crate::p2m::TableKind;
use crate::pte::PteRewriter;
use crate::region::MappedRegion;
use crate::sys::MAX_BATCH_SIZE;
use log::debug;

pub struct PaeLowmemFixer;

impl PaeLowmemFixer {
    /// Runs both passes. A no-op unless the guest is 3-level and
    /// `pae_extended_cr3` was not negotiated.
    pub async fn run(ctx: &mut RestoreContext<'_>) -> Result<()> {
        if ctx.pt_levels() != 3 || ctx.pae_extended_cr3 {
            return Ok(());
        }

        Self::pass_a_relocate_roots(ctx).await?;
        Self::pass_b_rewrite_l1_tables(ctx).await?;
        ctx.mmu.flush().await
    }

    /// Moves every L3-root page above the 4G line down below it, preserving
    /// its four PAE PTE slots and updating the p2m and m2p in place.
    async fn pass_a_relocate_roots(ctx: &mut RestoreContext<'_>) -> Result<()> {
        let max_pfn = ctx.p2m.max_pfn();
        for i in 0..max_pfn {
            let pfn = Pfn::new(i);
            if ctx.p2m.kind(pfn) != TableKind::L3 {
                continue;
            }
            let old_mfn = ctx.p2m.mfn(pfn);
            if old_mfn.below_4g() {
                continue;
            }

            debug!("relocating L3 root {:?} (mfn {:?}) below 4G", pfn, old_mfn);
            let mut region = MappedRegion::map_batch(ctx.call, ctx.domid, &[old_mfn]).await?;
            let mut slots = [0u8; 32];
            slots.copy_from_slice(&region.page_mut(0)[0..32]);
            region.unmap()?;

            let new_mfn = Mfn::new(ctx.call.make_page_below_4g(ctx.domid, old_mfn.get()).await?);

            let mut region = MappedRegion::map_batch(ctx.call, ctx.domid, &[new_mfn]).await?;
            let page = region.page_mut(0);
            page[..4096].fill(0);
            page[0..32].copy_from_slice(&slots);
            region.unmap()?;

            ctx.p2m.set_mfn(pfn, new_mfn);
            ctx.mmu.add(new_mfn, pfn);
        }
        Ok(())
    }

    /// Re-maps and re-uncanonicalizes every L1 table the batch loop skipped,
    /// now that any L3 root it points into has its final mfn.
    async fn pass_b_rewrite_l1_tables(ctx: &mut RestoreContext<'_>) -> Result<()> {
        let max_pfn = ctx.p2m.max_pfn();
        let l1_pfns: Vec<Pfn> = (0..max_pfn)
            .map(Pfn::new)
            .filter(|&pfn| ctx.p2m.kind(pfn) == TableKind::L1)
            .collect();

        for batch in l1_pfns.chunks(MAX_BATCH_SIZE) {
            let mfns: Vec<Mfn> = batch.iter().map(|&pfn| ctx.p2m.mfn(pfn)).collect();
            let mut region = MappedRegion::map_batch(ctx.call, ctx.domid, &mfns).await?;
            for (idx, _) in batch.iter().enumerate() {
                let page = region.page_mut(idx);
                if PteRewriter::uncanonicalize(page, ctx.pt_levels(), &ctx.p2m).is_err() {
                    return Err(Error::Validation(
                        "pfn out of range rewriting deferred L1 table",
                    ));
                }
            }
            region.unmap()?;
        }
        Ok(())
    }
}
