//! The final patch-up pass: trims the reservation down to what the guest
//! actually used, translates every pfn still embedded in vCPU/start_info/
//! shared_info/GDT/P2M-frame-list state into its final mfn, sanitizes the
//! trap table and segment selectors, and installs the vCPU context.

use crate::context::RestoreContext;
use crate::error::{Error, Result};
use crate::frame::{Mfn, Pfn};
use crate::p2m::TableKind;
use crate::region::MappedRegion;
use crate::sys::{
    StartInfo, PAGE_SHIFT, PAGE_SIZE,
};
use crate::stream::StreamReader;
use log::{debug, warn};
use tokio::io::AsyncRead;
use xencall::sys::{x8664VcpuGuestContext, VcpuGuestContextAny};

const FLAT_KERNEL_CS: u16 = crate::sys::FLAT_KERNEL_CS as u16;
const FLAT_KERNEL_DS: u16 = crate::sys::FLAT_KERNEL_DS as u16;
const MAX_LDT_ENTS: u64 = 8192;
const MAX_GDT_ENTS: u64 = 8192;
const GDT_ENTS_PER_FRAME: u64 = 512;

pub struct TailOutcome {
    pub store_mfn: Mfn,
    pub console_mfn: Mfn,
}

pub struct TailPatcher;

impl TailPatcher {
    #[allow(clippy::too_many_arguments)]
    pub async fn run<R: AsyncRead + Unpin>(
        ctx: &mut RestoreContext<'_>,
        stream: &mut StreamReader<R>,
        p2m_frame_list: &[Pfn],
        shared_info_frame: u64,
        store_evtchn: u32,
        console_evtchn: u32,
    ) -> Result<TailOutcome> {
        Self::trim_discard_set(ctx, stream).await?;

        let ctx_size = std::mem::size_of::<x8664VcpuGuestContext>();
        let mut ctxt_bytes = vec![0u8; ctx_size];
        stream.read_exact(&mut ctxt_bytes).await?;
        let mut ctxt: x8664VcpuGuestContext =
            unsafe { std::ptr::read_unaligned(ctxt_bytes.as_ptr() as *const _) };
        let mut shared_info_blob = stream.read_page().await?;

        let start_info_pfn = Self::translate_suspend_record(ctx, &mut ctxt)?;
        let outcome =
            Self::rewrite_start_info(ctx, start_info_pfn, shared_info_frame, store_evtchn, console_evtchn)
                .await?;
        Self::translate_gdt_frames(ctx, &mut ctxt)?;
        Self::translate_cr3(ctx, &mut ctxt)?;
        Self::patch_shared_info(ctx, shared_info_frame, &mut shared_info_blob).await?;
        Self::translate_p2m_frame_list(ctx, p2m_frame_list).await?;
        Self::sanitize_context(ctx, &mut ctxt)?;

        ctx.call
            .set_vcpu_context(ctx.domid, 0, VcpuGuestContextAny { value: ctxt })
            .await?;

        Ok(outcome)
    }

    async fn trim_discard_set<R: AsyncRead + Unpin>(
        ctx: &mut RestoreContext<'_>,
        stream: &mut StreamReader<R>,
    ) -> Result<()> {
        let count = stream.read_u32_le().await? as usize;
        let mut mfns = Vec::with_capacity(count);
        for _ in 0..count {
            let raw = stream.read_u64_le().await?;
            let pfn = Pfn::new(raw);
            if !ctx.p2m.in_range(pfn) {
                warn!("discard set: {:?} out of range, tolerated", pfn);
                continue;
            }
            mfns.push(ctx.p2m.mfn(pfn).get());
            ctx.p2m.invalidate(pfn);
        }

        if mfns.is_empty() {
            return Ok(());
        }
        let freed = ctx.call.decrease_reservation(ctx.domid, &mfns, 0).await?;
        if freed as usize != mfns.len() {
            return Err(Error::PartialDecreaseReservation {
                wanted: mfns.len(),
                freed,
            });
        }
        Ok(())
    }

    fn translate_suspend_record(
        ctx: &RestoreContext<'_>,
        ctxt: &mut x8664VcpuGuestContext,
    ) -> Result<Pfn> {
        let pfn = Pfn::new(ctxt.user_regs.rdx);
        if !ctx.p2m.in_range(pfn) || ctx.p2m.kind(pfn) != TableKind::NoTab {
            return Err(Error::Validation("suspend-record pfn invalid or typed"));
        }
        ctxt.user_regs.rdx = ctx.p2m.mfn(pfn).get();
        Ok(pfn)
    }

    async fn rewrite_start_info(
        ctx: &RestoreContext<'_>,
        start_info_pfn: Pfn,
        shared_info_frame: u64,
        store_evtchn: u32,
        console_evtchn: u32,
    ) -> Result<TailOutcome> {
        let mfn = ctx.p2m.mfn(start_info_pfn);
        let mut region = MappedRegion::map_batch(ctx.call, ctx.domid, &[mfn]).await?;
        let page = region.page_mut(0);
        let info: &mut StartInfo = unsafe { &mut *(page.as_mut_ptr() as *mut StartInfo) };

        info.nr_pages = ctx.p2m.max_pfn();
        info.shared_info = shared_info_frame << PAGE_SHIFT;
        info.flags = 0;

        let store_pfn = Pfn::new(info.store_mfn);
        if !ctx.p2m.in_range(store_pfn) {
            return Err(Error::Validation("start_info store_mfn out of range"));
        }
        let store_mfn = ctx.p2m.mfn(store_pfn);
        info.store_mfn = store_mfn.get();
        info.store_evtchn = store_evtchn;

        let console_pfn = Pfn::new(info.console.mfn);
        if !ctx.p2m.in_range(console_pfn) {
            return Err(Error::Validation("start_info console mfn out of range"));
        }
        let console_mfn = ctx.p2m.mfn(console_pfn);
        info.console.mfn = console_mfn.get();
        info.console.evtchn = console_evtchn;

        region.unmap()?;
        Ok(TailOutcome {
            store_mfn,
            console_mfn,
        })
    }

    fn translate_gdt_frames(
        ctx: &RestoreContext<'_>,
        ctxt: &mut x8664VcpuGuestContext,
    ) -> Result<()> {
        if ctxt.gdt_ents > MAX_GDT_ENTS {
            return Err(Error::Validation("gdt_ents exceeds 8192"));
        }
        let frames = ctxt.gdt_ents.div_ceil(GDT_ENTS_PER_FRAME) as usize;
        for slot in ctxt.gdt_frames.iter_mut().take(frames) {
            let pfn = Pfn::new(*slot);
            if !ctx.p2m.in_range(pfn) || ctx.p2m.kind(pfn) != TableKind::NoTab {
                return Err(Error::Validation("gdt frame pfn invalid or typed"));
            }
            *slot = ctx.p2m.mfn(pfn).get();
        }
        Ok(())
    }

    fn translate_cr3(ctx: &RestoreContext<'_>, ctxt: &mut x8664VcpuGuestContext) -> Result<()> {
        let pfn = Pfn::new(ctxt.ctrlreg[3] >> PAGE_SHIFT);
        if !ctx.p2m.in_range(pfn) {
            return Err(Error::Validation("cr3 pfn out of range"));
        }
        let ty = ctx.p2m.pfn_type[pfn.index()];
        if !ty.is_top_level(ctx.pt_levels()) {
            return Err(Error::Validation("cr3 pfn type does not match pt_levels"));
        }
        ctxt.ctrlreg[3] = ctx.p2m.mfn(pfn).get() << PAGE_SHIFT;
        Ok(())
    }

    async fn patch_shared_info(
        ctx: &RestoreContext<'_>,
        shared_info_frame: u64,
        blob: &mut [u8],
    ) -> Result<()> {
        // vcpu_info[32] occupies the first 32 * 64 bytes; evtchn_pending[64]
        // (64 * 8 bytes) follows immediately.
        const VCPU_INFO_STRIDE: usize = 64;
        const EVTCHN_PENDING_SEL_OFFSET: usize = 8;
        for i in 0..32 {
            let off = i * VCPU_INFO_STRIDE + EVTCHN_PENDING_SEL_OFFSET;
            blob[off..off + 8].copy_from_slice(&0u64.to_le_bytes());
        }
        let evtchn_pending_base = 32 * VCPU_INFO_STRIDE;
        for word in blob[evtchn_pending_base..evtchn_pending_base + 64 * 8].chunks_exact_mut(8) {
            word.copy_from_slice(&0u64.to_le_bytes());
        }

        let mfn = Mfn::new(shared_info_frame);
        let mut region = MappedRegion::map_batch(ctx.call, ctx.domid, &[mfn]).await?;
        region.page_mut(0)[..blob.len()].copy_from_slice(blob);
        region.unmap()?;
        Ok(())
    }

    async fn translate_p2m_frame_list(
        ctx: &RestoreContext<'_>,
        p2m_frame_list: &[Pfn],
    ) -> Result<()> {
        let mut mfns = Vec::with_capacity(p2m_frame_list.len());
        for &pfn in p2m_frame_list {
            if !ctx.p2m.in_range(pfn) || ctx.p2m.kind(pfn) != TableKind::NoTab {
                return Err(Error::Validation("p2m frame-list pfn invalid or typed"));
            }
            mfns.push(ctx.p2m.mfn(pfn));
        }

        let mut region = MappedRegion::map_batch(ctx.call, ctx.domid, &mfns).await?;
        let p2m_bytes: Vec<u8> = ctx
            .p2m
            .p2m
            .iter()
            .flat_map(|m| m.get().to_le_bytes())
            .collect();
        for (i, chunk) in p2m_bytes.chunks(PAGE_SIZE as usize).enumerate() {
            region.page_mut(i)[..chunk.len()].copy_from_slice(chunk);
        }
        region.unmap()?;
        debug!("translated {} p2m frame-list page(s)", mfns.len());
        Ok(())
    }

    fn sanitize_context(
        ctx: &RestoreContext<'_>,
        ctxt: &mut x8664VcpuGuestContext,
    ) -> Result<()> {
        for (i, trap) in ctxt.trap_ctx.iter_mut().enumerate() {
            trap.vector = i as u8;
            if trap.cs & 3 == 0 {
                trap.cs = FLAT_KERNEL_CS;
            }
        }
        if ctxt.kernel_ss & 3 == 0 {
            ctxt.kernel_ss = FLAT_KERNEL_DS as u64;
        }

        if ctxt.ldt_base % PAGE_SIZE != 0 {
            return Err(Error::Validation("ldt_base not page-aligned"));
        }
        if ctxt.ldt_ents > MAX_LDT_ENTS {
            return Err(Error::Validation("ldt_ents exceeds 8192"));
        }
        if ctxt.ldt_base >= ctx.platform.hvirt_start {
            return Err(Error::Validation("ldt_base at or above hvirt_start"));
        }
        if ctxt.ldt_base + ctxt.ldt_ents * 8 > ctx.platform.hvirt_start {
            return Err(Error::Validation("ldt extent crosses hvirt_start"));
        }
        Ok(())
    }
}
