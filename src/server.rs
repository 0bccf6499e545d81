use crate::catalog::{self, Catalog};
use crate::error::ProtocolError;
use crate::protocol::{self, Request, ResponseHeader};
use crate::storage;
use anyhow::Result;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

pub struct Server {
    listener: TcpListener,
    catalog: Arc<Catalog>,
    root: Arc<PathBuf>,
}

impl Server {
    pub async fn bind(addr: &str, root: PathBuf) -> Result<Self> {
        if !root.exists() {
            warn!("Storage root {:?} does not exist, creating it", root);
            fs::create_dir_all(&root).await?;
        }

        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            catalog: Arc::new(catalog::get_catalog()),
            root: Arc::new(root),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` fires. Each connection gets its own
    /// task; a failing session is logged and dropped without touching the others.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Server listening on {} serving {:?}",
            self.local_addr()?,
            self.root
        );

        loop {
            let (socket, peer) = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        continue;
                    }
                },
            };

            let catalog = Arc::clone(&self.catalog);
            let root = Arc::clone(&self.root);
            let span = info_span!("session", %peer);
            tokio::spawn(
                async move {
                    info!("Connected");
                    match handle_session(socket, &catalog, &root).await {
                        Ok(()) => info!("Connection closed"),
                        Err(e) => error!("Session torn down: {}", e),
                    }
                }
                .instrument(span),
            );
        }
    }
}

pub async fn run_server(root: PathBuf, addr: &str, shutdown: CancellationToken) -> Result<()> {
    Server::bind(addr, root).await?.run(shutdown).await
}

/// Serve one connection: catalog first, then strictly sequential requests
/// until the peer closes the stream or breaks framing.
pub async fn handle_session(
    mut socket: TcpStream,
    catalog: &Catalog,
    root: &Path,
) -> Result<(), ProtocolError> {
    socket.set_nodelay(true)?;

    send_catalog(&mut socket, catalog).await?;

    while let Some(request) = protocol::recv_message::<_, Request>(&mut socket).await? {
        match request {
            Request::List => {
                debug!("List requested");
                send_catalog(&mut socket, catalog).await?;
            }
            Request::Fetch { name } => {
                send_file(&mut socket, catalog, root, &name).await?;
            }
        }
    }
    Ok(())
}

async fn send_catalog(socket: &mut TcpStream, catalog: &Catalog) -> Result<(), ProtocolError> {
    let bytes = catalog::encode_catalog(catalog)?;
    protocol::write_frame(socket, &bytes).await?;
    socket.flush().await?;
    Ok(())
}

async fn send_file(
    socket: &mut TcpStream,
    catalog: &Catalog,
    root: &Path,
    name: &str,
) -> Result<(), ProtocolError> {
    let name = name.trim();
    let path = if catalog.contains_key(name) {
        storage::resolve_in_root(root, name)
    } else {
        None
    };
    let Some(path) = path else {
        info!("Not in catalog: {:?}", name);
        return protocol::send_message(socket, &ResponseHeader::NotFound).await;
    };

    let (file, size) = match open_with_size(&path).await {
        Ok(opened) => opened,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("Listed but missing on disk: {:?}", path);
            return protocol::send_message(socket, &ResponseHeader::NotFound).await;
        }
        Err(e) => {
            error!("Failed to open {:?}: {}", path, e);
            let header = ResponseHeader::IoError {
                detail: e.to_string(),
            };
            return protocol::send_message(socket, &header).await;
        }
    };

    protocol::send_message(socket, &ResponseHeader::Ok { size }).await?;
    let sent = protocol::send_file_body(socket, file, size).await?;
    info!("Sent {} ({} bytes)", name, sent);
    Ok(())
}

async fn open_with_size(path: &Path) -> std::io::Result<(File, u64)> {
    let file = File::open(path).await?;
    let meta = file.metadata().await?;
    if !meta.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not a regular file",
        ));
    }
    Ok((file, meta.len()))
}
