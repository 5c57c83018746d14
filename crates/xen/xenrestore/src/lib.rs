//! Guest-memory restore engine for a paravirtualized x86 domain: consumes a
//! checkpoint stream produced by a saver, drives the target domain from a
//! freshly created (empty) shell to a runnable vCPU context.
//!
//! The entry point is [`restore`]. Everything else is a piece it
//! orchestrates: [`header`] decodes the stream's optional extended-info
//! prefix and p2m frame-list, [`batch`] drives the bulk page-copy loop,
//! [`pae`] fixes up PAE lowmem constraints, [`pin`] pins page tables, and
//! [`tail`] patches the vCPU context, start_info and shared_info pages
//! before handing control to the guest.

pub mod batch;
pub mod callback;
pub mod context;
pub mod error;
pub mod frame;
pub mod mmu;
pub mod p2m;
pub mod pae;
pub mod pin;
pub mod platform;
pub mod pte;
pub mod region;
pub mod stream;
pub mod sys;
pub mod tail;

use batch::BatchReceiver;
use context::RestoreContext;
use error::Result;
use frame::Mfn;
use header::HeaderDecoder;
use log::{info, warn};
use p2m::P2MTable;
use pae::PaeLowmemFixer;
use pin::Pinner;
use platform::PlatformProbe;
use stream::StreamReader;
use tail::TailPatcher;
use tokio::io::AsyncRead;
use xencall::XenCall;

mod header;

/// Everything the saver side of the stream needs from us up front. Mirrors
/// §6's "Restore entry" inputs.
pub struct RestoreRequest {
    pub domid: u32,
    pub nr_pfns: u64,
    pub pt_levels: u32,
    pub store_evtchn: u32,
    pub console_evtchn: u32,
}

pub struct RestoreOutcome {
    pub store_mfn: Mfn,
    pub console_mfn: Mfn,
}

/// Drains `stream` into the already-created, paused domain `request.domid`,
/// returning the store/console mfns the guest's start_info page now points
/// at. On any error the domain is destroyed before the error propagates, per
/// the engine's single abort path.
pub async fn restore<R: AsyncRead + Unpin>(
    call: &XenCall,
    request: RestoreRequest,
    reader: R,
) -> Result<RestoreOutcome> {
    match run(call, &request, reader).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            warn!(
                "restore of domain {} failed, destroying: {}",
                request.domid, err
            );
            if let Err(destroy_err) = call.destroy_domain(request.domid).await {
                warn!("failed to destroy domain {}: {}", request.domid, destroy_err);
            }
            Err(err)
        }
    }
}

async fn run<R: AsyncRead + Unpin>(
    call: &XenCall,
    request: &RestoreRequest,
    reader: R,
) -> Result<RestoreOutcome> {
    let mut stream = StreamReader::new(reader);

    let platform = PlatformProbe::new(call).probe(request.pt_levels).await?;
    let domain_info = call.get_domain_info(request.domid).await?;

    let memkb = request.nr_pfns * sys::PAGE_SIZE / 1024;
    call.set_max_mem(request.domid, memkb).await?;
    call.increase_reservation(request.domid, request.nr_pfns, 0, 0)
        .await?;

    let pfn_list = call.get_pfn_list(request.domid, request.nr_pfns).await?;
    if pfn_list.len() as u64 != request.nr_pfns {
        return Err(error::Error::PfnListShort {
            got: pfn_list.len(),
            expected: request.nr_pfns as usize,
        });
    }
    let p2m = P2MTable::new(pfn_list);

    let (ext, p2m_frame_list) = HeaderDecoder::decode(&mut stream, request.nr_pfns).await?;

    let mut ctx = RestoreContext::new(
        call,
        request.domid,
        platform,
        ext.pae_extended_cr3,
        p2m,
    );

    let outcome = BatchReceiver::run(&mut ctx, &mut stream).await?;
    if outcome.verify_mismatches > 0 {
        warn!(
            "page verify found {} mismatching page(s)",
            outcome.verify_mismatches
        );
    }

    PaeLowmemFixer::run(&mut ctx).await?;
    Pinner::run(&mut ctx).await?;

    let tail = TailPatcher::run(
        &mut ctx,
        &mut stream,
        &p2m_frame_list,
        domain_info.shared_info_frame,
        request.store_evtchn,
        request.console_evtchn,
    )
    .await?;

    info!(
        "restore of domain {} complete, {} pte race(s) recovered",
        request.domid, ctx.nraces
    );

    Ok(RestoreOutcome {
        store_mfn: tail.store_mfn,
        console_mfn: tail.console_mfn,
    })
}
