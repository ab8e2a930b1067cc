use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Can't read sequence directory: {0}")]
    DirectoryReadError(String),

    #[error("No sequence files found in directory: {0}")]
    NoSequenceFiles(String),

    #[error("Can't build worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
