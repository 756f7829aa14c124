use crate::broadcast::BroadcastScheduler;
use crate::config::SimConfig;
use crate::error::ListenerError;
use crate::field::FieldSimulator;
use crate::imagery::ImageSynthesizer;
use crate::session::{Session, SessionReport};
use crate::transport::{FrameReader, FrameWriter};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Single-client endpoint. Accepts one connection and is consumed by it.
#[derive(Debug)]
pub struct SatListener {
    listener: TcpListener,
    config: SimConfig,
}

impl SatListener {
    pub async fn bind(config: SimConfig) -> Result<Self, ListenerError> {
        config.validate()?;
        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        info!("🌐 Listening on {}", listener.local_addr()?);

        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Accept the one client, run its session to completion and report.
    ///
    /// The listening socket is closed as soon as the client is accepted.
    pub async fn serve_one(self) -> Result<SessionReport, ListenerError> {
        let Self { listener, config } = self;
        let (stream, peer) = listener.accept().await.map_err(ListenerError::Accept)?;
        drop(listener);
        info!("🔗 Client connected: {}", peer);

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
        }

        let mut field = FieldSimulator::from_config(&config);
        field.initialize(config.initial_entity_count());
        let field = Arc::new(Mutex::new(field));

        let (read_half, write_half) = stream.into_split();
        let reader = FrameReader::new(read_half);
        let writer = FrameWriter::shared(write_half);

        let scheduler =
            BroadcastScheduler::start(Arc::clone(&field), Arc::clone(&writer), config.broadcast_period());
        let session = Session::new(reader, writer, field, ImageSynthesizer::from_config(&config));
        let report = session.run(scheduler).await;

        info!("🔌 Client {} disconnected", peer);
        Ok(report)
    }
}

/// Bind and serve a single session.
pub async fn run_simulator(config: SimConfig) -> Result<SessionReport, ListenerError> {
    SatListener::bind(config).await?.serve_one().await
}
