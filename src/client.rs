use crate::catalog::{self, Catalog};
use crate::config::PARTIAL_SUFFIX;
use crate::error::{ProtocolError, TransferError};
use crate::protocol::{self, Request, ResponseHeader};
use crate::storage;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed(u64),
    NotFound,
    IoError(String),
}

/// Bytes received so far against the catalog's advisory estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub received: u64,
    pub declared: u64,
}

impl Progress {
    /// Percentage of the declared estimate. Can go past 100 when the real file
    /// is larger than advertised; `None` when there is no estimate.
    pub fn percent(&self) -> Option<f64> {
        if self.declared == 0 {
            None
        } else {
            Some(self.received as f64 / self.declared as f64 * 100.0)
        }
    }
}

pub struct Client {
    socket: TcpStream,
    catalog: Catalog,
}

impl Client {
    /// Connect and read the catalog the server sends unprompted.
    pub async fn connect(addr: &str) -> Result<Self, TransferError> {
        debug!("Connecting to {}", addr);
        let mut socket = TcpStream::connect(addr)
            .await
            .map_err(TransferError::Connection)?;
        socket.set_nodelay(true).map_err(TransferError::Connection)?;

        let catalog = read_catalog(&mut socket).await?;
        info!("Connected to {}, {} files available", addr, catalog.len());
        Ok(Self { socket, catalog })
    }

    /// The catalog as received on connect.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Ask the server for a fresh copy of the catalog.
    pub async fn fetch_catalog(&mut self) -> Result<Catalog, TransferError> {
        protocol::send_message(&mut self.socket, &Request::List).await?;
        self.catalog = read_catalog(&mut self.socket).await?;
        Ok(self.catalog.clone())
    }

    /// Download `name` into `out_dir`.
    ///
    /// The body goes to `<name>.part` first and is renamed once complete.
    /// Every path that does not end in `Completed` removes the partial file.
    /// After `Err` the session is no longer usable.
    pub async fn download<F>(
        &mut self,
        name: &str,
        out_dir: &Path,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<DownloadOutcome, TransferError>
    where
        F: FnMut(&Progress),
    {
        // A name that cannot be a plain file here cannot be in the catalog either.
        let Some(target) = storage::resolve_in_root(out_dir, name) else {
            return Ok(DownloadOutcome::NotFound);
        };
        fs::create_dir_all(out_dir)
            .await
            .map_err(TransferError::Local)?;

        let declared = self
            .catalog
            .get(name)
            .map_or(0, |size| catalog::parse_declared_size(size));

        info!("Requesting {}", name);
        let request = Request::Fetch {
            name: name.to_string(),
        };
        let header = tokio::select! {
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            header = async {
                protocol::send_message(&mut self.socket, &request).await?;
                protocol::recv_message::<_, ResponseHeader>(&mut self.socket).await
            } => header?.ok_or(ProtocolError::Closed)?,
        };

        let size = match header {
            ResponseHeader::Ok { size } => size,
            ResponseHeader::NotFound => {
                info!("Server: file not found - {}", name);
                return Ok(DownloadOutcome::NotFound);
            }
            ResponseHeader::IoError { detail } => {
                warn!("Server failed to read {}: {}", name, detail);
                return Ok(DownloadOutcome::IoError(detail));
            }
        };

        let partial = partial_path(&target);
        let result = self
            .receive_body(&partial, size, declared, cancel, &mut on_progress)
            .await;

        match result {
            Ok(None) => match fs::rename(&partial, &target).await {
                Ok(()) => {
                    info!("Finished downloading {} ({} bytes)", name, size);
                    Ok(DownloadOutcome::Completed(size))
                }
                Err(e) => {
                    discard(&partial).await;
                    Ok(DownloadOutcome::IoError(e.to_string()))
                }
            },
            Ok(Some(local)) => {
                warn!("Could not write {}: {}", name, local);
                discard(&partial).await;
                Ok(DownloadOutcome::IoError(local.to_string()))
            }
            Err(e) => {
                discard(&partial).await;
                Err(e)
            }
        }
    }

    /// Pull the body into `partial`. `Ok(Some(_))` is a local write failure
    /// with the stream still aligned on the next message.
    async fn receive_body<F>(
        &mut self,
        partial: &Path,
        size: u64,
        declared: u64,
        cancel: &CancellationToken,
        on_progress: &mut F,
    ) -> Result<Option<std::io::Error>, TransferError>
    where
        F: FnMut(&Progress),
    {
        let mut sink = match File::create(partial).await {
            Ok(file) => SinkFile::Open(file),
            Err(e) => SinkFile::Failed(Some(e)),
        };

        on_progress(&Progress {
            received: 0,
            declared,
        });

        let receipt = tokio::select! {
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            receipt = async {
                match &mut sink {
                    SinkFile::Open(file) => {
                        protocol::recv_file_body(&mut self.socket, size, file, |received| {
                            on_progress(&Progress { received, declared })
                        })
                        .await
                    }
                    SinkFile::Failed(_) => {
                        protocol::recv_file_body(&mut self.socket, size, &mut tokio::io::sink(), |_| {})
                            .await
                    }
                }
            } => receipt?,
        };

        Ok(match sink {
            SinkFile::Failed(e) => e,
            SinkFile::Open(_) => receipt.sink_error,
        })
    }
}

/// Output file, or the error that prevented creating it. The body still has
/// to be drained off the socket either way.
enum SinkFile {
    Open(File),
    Failed(Option<std::io::Error>),
}

async fn read_catalog(socket: &mut TcpStream) -> Result<Catalog, TransferError> {
    let frame = protocol::read_frame(socket)
        .await?
        .ok_or(ProtocolError::Closed)?;
    let catalog = catalog::decode_catalog(&frame).map_err(ProtocolError::from)?;
    Ok(catalog)
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    target.with_file_name(name)
}

async fn discard(partial: &Path) {
    if let Err(e) = fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove partial file {:?}: {}", partial, e);
        }
    }
}
