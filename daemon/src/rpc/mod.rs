pub mod rpc;

use crate::core::blockchain::Blockchain;
use actix_web::{
    dev::ServerHandle,
    get,
    web::{self, Data},
    App, HttpResponse, HttpServer, Responder,
};
use log::{info, warn};
use std::{net::SocketAddr, sync::Arc};
use tokio::{sync::Mutex, task::JoinHandle};
use vela_common::{
    config,
    rpc::{
        server::{json_rpc, RPCServerHandler},
        RPCHandler,
    },
};

pub type SharedDaemonRpcServer = Arc<DaemonRpcServer>;

/// JSON-RPC endpoint of one node, served at `POST /json_rpc`
pub struct DaemonRpcServer {
    handle: Mutex<Option<ServerHandle>>,
    task: parking_lot::Mutex<Option<JoinHandle<std::io::Result<()>>>>,
    rpc_handler: RPCHandler<Arc<Blockchain>>,
    bind_address: SocketAddr,
}

impl DaemonRpcServer {
    pub async fn new(
        blockchain: Arc<Blockchain>,
        bind_address: &str,
        threads: usize,
    ) -> Result<SharedDaemonRpcServer, anyhow::Error> {
        let mut rpc_handler = RPCHandler::new(blockchain);
        rpc::register_methods(&mut rpc_handler);

        // Bind first so the real port is known before the server is shared
        let listener = std::net::TcpListener::bind(bind_address)
            .map_err(|err| anyhow::anyhow!("Failed to bind RPC server on {}: {}", bind_address, err))?;
        let local_address = listener.local_addr()?;

        let server = Arc::new(Self {
            handle: Mutex::new(None),
            task: parking_lot::Mutex::new(None),
            rpc_handler,
            bind_address: local_address,
        });

        if log::log_enabled!(log::Level::Info) {
            info!("Starting RPC server on {}", local_address);
        }

        {
            let clone = Arc::clone(&server);
            let http_server = HttpServer::new(move || {
                let server = Arc::clone(&clone);
                App::new()
                    .app_data(Data::from(server))
                    .route(
                        "/json_rpc",
                        web::post().to(json_rpc::<Arc<Blockchain>, DaemonRpcServer>),
                    )
                    .service(index)
            })
            .disable_signals()
            .workers(threads.max(1))
            .listen(listener)?
            .run();

            // save the server handle to be able to stop it later
            *server.handle.lock().await = Some(http_server.handle());
            *server.task.lock() = Some(tokio::spawn(http_server));
        }

        Ok(server)
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/json_rpc", self.bind_address)
    }

    pub async fn stop(&self) {
        let handle = self.handle.lock().await.take();
        match handle {
            Some(handle) => {
                info!("Stopping RPC Server on {}...", self.bind_address);
                handle.stop(false).await;
                let task = self.task.lock().take();
                if let Some(task) = task {
                    let _ = task.await;
                }
                info!("RPC Server is now stopped!");
            }
            None => warn!("RPC Server is not running!"),
        }
    }

    // Drop path: the stop command is sent when `stop` is called, the future is not needed
    pub(crate) fn abort(&self) {
        if let Ok(mut handle) = self.handle.try_lock() {
            if let Some(handle) = handle.take() {
                drop(handle.stop(false));
            }
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl RPCServerHandler<Arc<Blockchain>> for DaemonRpcServer {
    fn get_rpc_handler(&self) -> &RPCHandler<Arc<Blockchain>> {
        &self.rpc_handler
    }
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body(format!("Vela node running on: {}", config::VERSION))
}
