use crate::broadcast::{BroadcastReport, BroadcastScheduler, SharedField};
use crate::entity::EntityId;
use crate::error::TransportError;
use crate::imagery::ImageSynthesizer;
use crate::protocol::{CameraSpec, Message};
use crate::transport::{FrameReader, SharedWriter};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    AwaitingMessage,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEnd {
    /// Peer closed the stream at a frame boundary.
    Closed,
    /// Any other transport fault, including undecodable frames.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub end: SessionEnd,
    pub messages_received: u64,
    pub images_sent: u64,
    pub unhandled_messages: u64,
    pub camera_spec: Option<CameraSpec>,
    pub broadcast: BroadcastReport,
}

/// Receive side of one client connection.
///
/// Reads frames one at a time and answers image requests through the writer
/// it shares with the broadcast scheduler.
#[derive(Debug)]
pub struct Session<R, W> {
    reader: FrameReader<R>,
    writer: SharedWriter<W>,
    field: SharedField,
    imagery: ImageSynthesizer,
    state: SessionState,
    camera_spec: Option<CameraSpec>,
    messages_received: u64,
    images_sent: u64,
    unhandled_messages: u64,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        reader: FrameReader<R>,
        writer: SharedWriter<W>,
        field: SharedField,
        imagery: ImageSynthesizer,
    ) -> Self {
        Self {
            reader,
            writer,
            field,
            imagery,
            state: SessionState::AwaitingMessage,
            camera_spec: None,
            messages_received: 0,
            images_sent: 0,
            unhandled_messages: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn camera_spec(&self) -> Option<&CameraSpec> {
        self.camera_spec.as_ref()
    }

    /// Dispatch one inbound message. Only a failed write is an error.
    pub async fn handle(&mut self, message: Message) -> Result<(), TransportError> {
        self.messages_received += 1;
        info!("📨 Received {}", message.kind());

        match message {
            Message::CameraSpec(spec) => {
                debug!("Camera spec stored: {:?}", spec);
                self.camera_spec = Some(spec);
            }
            Message::ImageRequest { id } => {
                self.send_image(id).await?;
            }
            Message::Frame(_) | Message::Image(_) | Message::Unknown => {
                self.unhandled_messages += 1;
                warn!("Ignoring unhandled message kind: {}", message.kind());
            }
        }
        Ok(())
    }

    async fn send_image(&mut self, id: EntityId) -> Result<(), TransportError> {
        let image = {
            let field = self.field.lock().await;
            self.imagery.synthesize(&field, id)
        };
        if image.entity_id != id {
            debug!("Entity {} not live, answered with placeholder", id);
        }

        let (x_offset, y_offset) = (image.x_offset, image.y_offset);
        self.writer.lock().await.send(&Message::Image(image)).await?;
        self.images_sent += 1;
        info!("📤 Sent image for entity {} (offset {}, {})", id, x_offset, y_offset);
        Ok(())
    }

    /// Run until the peer goes away, then stop the scheduler and close the writer.
    pub async fn run(mut self, scheduler: BroadcastScheduler) -> SessionReport {
        let end = loop {
            let result = match self.reader.recv().await {
                Ok(message) => self.handle(message).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {}
                Err(TransportError::Closed) => break SessionEnd::Closed,
                Err(e) => {
                    error!("Session transport failure: {}", e);
                    break SessionEnd::Failed(e.to_string());
                }
            }
        };
        self.state = SessionState::Terminated;

        // Scheduler first, so nothing writes into the closing transport.
        let broadcast = scheduler.stop().await;
        if let Err(e) = self.writer.lock().await.shutdown().await {
            debug!("Writer shutdown after session end: {}", e);
        }

        let report = SessionReport {
            end,
            messages_received: self.messages_received,
            images_sent: self.images_sent,
            unhandled_messages: self.unhandled_messages,
            camera_spec: self.camera_spec,
            broadcast,
        };
        info!(
            "🔌 Session terminated: {:?} ({} messages, {} images, {} frames broadcast)",
            report.end, report.messages_received, report.images_sent, report.broadcast.frames_sent
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::entity::PLACEHOLDER_ID;
    use crate::field::FieldSimulator;
    use crate::transport::FrameWriter;
    use std::sync::Arc;
    use tokio::io::duplex;
    use tokio::sync::Mutex;

    fn shared_field() -> SharedField {
        let mut field = FieldSimulator::from_config(&SimConfig::default());
        field.initialize(5);
        Arc::new(Mutex::new(field))
    }

    #[tokio::test]
    async fn test_handle_dispatch() {
        let (_peer_in, session_in) = duplex(1024);
        let (session_out, peer_out) = duplex(64 * 1024);
        let mut peer = FrameReader::new(peer_out);

        let mut session = Session::new(
            FrameReader::new(session_in),
            FrameWriter::shared(session_out),
            shared_field(),
            ImageSynthesizer::new(20, 20),
        );
        assert_eq!(session.state(), SessionState::AwaitingMessage);

        let spec = CameraSpec { enabled: false, zoom: 3.0 };
        session.handle(Message::CameraSpec(spec)).await.unwrap();
        assert_eq!(session.camera_spec(), Some(&spec));

        session.handle(Message::Unknown).await.unwrap();
        assert_eq!(session.unhandled_messages, 1);

        session.handle(Message::ImageRequest { id: 2 }).await.unwrap();
        session.handle(Message::ImageRequest { id: 500 }).await.unwrap();
        assert_eq!(session.images_sent, 2);
        assert_eq!(session.state(), SessionState::AwaitingMessage);

        match peer.recv().await.unwrap() {
            Message::Image(image) => {
                assert_eq!(image.entity_id, 2);
                assert_eq!(image.pixels.len(), 400);
            }
            other => panic!("Expected image, got {:?}", other),
        }
        match peer.recv().await.unwrap() {
            Message::Image(image) => assert_eq!(image.entity_id, PLACEHOLDER_ID),
            other => panic!("Expected image, got {:?}", other),
        }
    }
}
