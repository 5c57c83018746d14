//! Final pinning pass: every pfn the saver marked with the `LPINTAB` bit
//! gets its matching `MMUEXT_PIN_Lk_TABLE` hypercall, batched.

use crate::context::RestoreContext;
use crate::error::{Error, Result};
use crate::frame::Pfn;
use crate::p2m::TableKind;
use crate::sys::MAX_PIN_BATCH;
use log::debug;
use xencall::sys::{
    MmuExtOp, MMUEXT_PIN_L1_TABLE, MMUEXT_PIN_L2_TABLE, MMUEXT_PIN_L3_TABLE, MMUEXT_PIN_L4_TABLE,
};

pub struct Pinner;

impl Pinner {
    pub async fn run(ctx: &mut RestoreContext<'_>) -> Result<()> {
        let max_pfn = ctx.p2m.max_pfn();
        let mut ops: Vec<MmuExtOp> = Vec::with_capacity(MAX_PIN_BATCH);

        for i in 0..max_pfn {
            let pfn = Pfn::new(i);
            let ty = ctx.p2m.pfn_type[pfn.index()];
            if !ty.pinned() {
                continue;
            }

            let cmd = match ty.kind() {
                TableKind::L1 => MMUEXT_PIN_L1_TABLE,
                TableKind::L2 => MMUEXT_PIN_L2_TABLE,
                TableKind::L3 => MMUEXT_PIN_L3_TABLE,
                TableKind::L4 => MMUEXT_PIN_L4_TABLE,
                TableKind::NoTab | TableKind::XTab | TableKind::Invalid => {
                    return Err(Error::Validation("pin flag set on a non-pagetable pfn"));
                }
            };

            ops.push(MmuExtOp {
                cmd,
                arg1: ctx.p2m.mfn(pfn).get() as _,
                arg2: 0,
            });

            if ops.len() == MAX_PIN_BATCH {
                Self::flush(ctx, &mut ops).await?;
            }
        }

        Self::flush(ctx, &mut ops).await
    }

    async fn flush(ctx: &mut RestoreContext<'_>, ops: &mut Vec<MmuExtOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        debug!("pinning {} page table(s)", ops.len());
        ctx.call.mmuext_ops(ctx.domid, ops).await?;
        ops.clear();
        Ok(())
    }
}
