use std::env;
use std::fs::File;

use tokio::fs::File as TokioFile;
use xencall::XenCall;
use xenrestore::error::Result;
use xenrestore::{restore, RestoreRequest};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = args.next().expect("usage: xenrestore-stream <checkpoint-file> <domid> <nr_pfns> <pt_levels>");
    let domid: u32 = args.next().expect("domid").parse().expect("domid is a number");
    let nr_pfns: u64 = args.next().expect("nr_pfns").parse().expect("nr_pfns is a number");
    let pt_levels: u32 = args.next().expect("pt_levels").parse().expect("pt_levels is a number");

    let file = File::open(&path).expect("failed to open checkpoint file");
    let reader = TokioFile::from_std(file);

    let call = XenCall::open(0)?;
    let request = RestoreRequest {
        domid,
        nr_pfns,
        pt_levels,
        store_evtchn: 0,
        console_evtchn: 0,
    };

    let outcome = restore(&call, request, reader).await?;
    println!(
        "restored domain {}: store_mfn={:?} console_mfn={:?}",
        domid, outcome.store_mfn, outcome.console_mfn
    );
    Ok(())
}
