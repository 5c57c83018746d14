use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("kernel error")]
    Kernel(#[from] nix::errno::Errno),
    #[error("io issue encountered")]
    Io(#[from] io::Error),
    #[error("populate physmap failed")]
    PopulatePhysmapFailed,
    #[error("mmap batch failed: {0}")]
    MmapBatchFailed(nix::errno::Errno),
    #[error("xen domctl interface version unsupported")]
    XenVersionUnsupported,
    #[error("semaphore closed")]
    Semaphore(#[from] tokio::sync::AcquireError),
}

pub type Result<T> = std::result::Result<T, Error>;
