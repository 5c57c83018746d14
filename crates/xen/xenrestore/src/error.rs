use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("short read or EOF mid-record: wanted {wanted} bytes, got {got}")]
    Stream { wanted: usize, got: usize },
    #[error("io issue encountered: {0}")]
    Io(#[from] io::Error),
    #[error("xencall issue encountered: {0}")]
    XenCall(#[from] xencall::error::Error),
    #[error("resource error: {0}")]
    Resource(&'static str),
    #[error("hypervisor rejected operation: {0}")]
    Hypervisor(&'static str),
    #[error("validation failed: {0}")]
    Validation(&'static str),
    #[error("batch count {0} exceeds MAX_BATCH_SIZE")]
    BatchTooLarge(i64),
    #[error("extended-info chunk_bytes {0} smaller than vcpu context")]
    ChunkTooSmall(u32),
    #[error("get_pfn_list returned {got} frames, expected {expected}")]
    PfnListShort { got: usize, expected: usize },
    #[error("partial decrease_reservation: wanted {wanted}, freed {freed}")]
    PartialDecreaseReservation { wanted: usize, freed: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
