//! End-to-end tests against a real TCP endpoint on an ephemeral port.

use debrissat::entity::PLACEHOLDER_ID;
use debrissat::protocol::CameraSpec;
use debrissat::session::SessionEnd;
use debrissat::transport::{FrameReader, FrameWriter};
use debrissat::*;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn test_config(period_ms: u64) -> SimConfig {
    SimConfig {
        port: 0,
        broadcast_period_ms: period_ms,
        ..SimConfig::default()
    }
}

async fn start(
    config: SimConfig,
) -> (TcpStream, JoinHandle<Result<SessionReport, debrissat::error::ListenerError>>) {
    let listener = SatListener::bind(config).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(listener.serve_one());
    let stream = TcpStream::connect(addr).await.unwrap();
    (stream, server)
}

async fn next_frame(reader: &mut FrameReader<OwnedReadHalf>) -> FrameSnapshot {
    loop {
        match timeout(TEST_TIMEOUT, reader.recv()).await.unwrap().unwrap() {
            Message::Frame(frame) => return frame,
            _ => continue,
        }
    }
}

async fn next_image(reader: &mut FrameReader<OwnedReadHalf>) -> ImageResponse {
    loop {
        match timeout(TEST_TIMEOUT, reader.recv()).await.unwrap().unwrap() {
            Message::Image(image) => return image,
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_first_frame_is_immediate_and_seeded() {
    init_tracing();
    let config = test_config(60_000);
    let (stream, server) = start(config.clone()).await;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);

    let frame = next_frame(&mut reader).await;

    // Same seed, same initialization, one tick: identical field.
    let mut expected = FieldSimulator::from_config(&config);
    expected.initialize(config.initial_entity_count());
    expected.tick();
    assert_eq!(frame.entities, expected.entities());

    drop(reader);
    drop(write_half);
    let report = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap().unwrap();
    assert_eq!(report.end, SessionEnd::Closed);
}

#[tokio::test]
async fn test_frames_keep_arriving() {
    init_tracing();
    let (stream, server) = start(test_config(20)).await;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);

    let mut last_timestamp = 0;
    for _ in 0..4 {
        let frame = next_frame(&mut reader).await;
        assert!(frame.entities.len() <= 10);
        assert!(frame.timestamp_ms >= last_timestamp);
        last_timestamp = frame.timestamp_ms;
    }

    drop(write_half);
    let report = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap().unwrap();
    assert_eq!(report.end, SessionEnd::Closed);
    assert!(report.broadcast.frames_sent >= 4);
}

#[tokio::test]
async fn test_image_request_for_live_entity() {
    init_tracing();
    let (stream, server) = start(test_config(60_000)).await;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    let frame = next_frame(&mut reader).await;
    let target = frame.entities[0].clone();

    writer
        .send(&Message::ImageRequest { id: target.id() })
        .await
        .unwrap();
    let image = next_image(&mut reader).await;

    let half = target.size() / 2.0;
    assert_eq!(image.entity_id, target.id());
    assert_eq!(image.x_offset, (target.position.x / half).floor() as i32);
    assert_eq!(image.y_offset, (target.position.y / half).floor() as i32);
    assert_eq!(image.pixels.len(), (image.width * image.height) as usize);

    writer.shutdown().await.unwrap();
    let report = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap().unwrap();
    assert_eq!(report.end, SessionEnd::Closed);
    assert_eq!(report.images_sent, 1);
}

#[tokio::test]
async fn test_image_burst_interleaves_whole_frames() {
    init_tracing();
    let (stream, server) = start(test_config(5)).await;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    const BURST: u64 = 40;
    for id in 0..BURST {
        writer.send(&Message::ImageRequest { id }).await.unwrap();
    }

    // Every inbound frame must decode; images and frames share one writer.
    let mut images = 0;
    let mut frames = 0;
    while images < BURST {
        match timeout(TEST_TIMEOUT, reader.recv()).await.unwrap().unwrap() {
            Message::Image(image) => {
                assert_eq!(image.pixels.len(), (image.width * image.height) as usize);
                images += 1;
            }
            Message::Frame(frame) => {
                assert!(frame.entities.len() <= 10);
                frames += 1;
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }
    assert!(frames > 0);

    writer.shutdown().await.unwrap();
    let report = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap().unwrap();
    assert_eq!(report.end, SessionEnd::Closed);
    assert_eq!(report.images_sent, BURST);
    assert!(report.broadcast.failure.is_none());
}

#[tokio::test]
async fn test_tolerant_dispatch_and_placeholder() {
    init_tracing();
    let (stream, server) = start(test_config(60_000)).await;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);

    // An unknown kind, written by hand, must not end the session.
    let payload = br#"{"type":"SetZoomLevel","level":4}"#;
    write_half
        .write_all(&(payload.len() as u32).to_be_bytes())
        .await
        .unwrap();
    write_half.write_all(payload).await.unwrap();

    let mut writer = FrameWriter::new(write_half);
    let spec = CameraSpec {
        enabled: false,
        zoom: 2.0,
    };
    writer.send(&Message::CameraSpec(spec)).await.unwrap();
    writer
        .send(&Message::Frame(FrameSnapshot {
            entities: vec![],
            timestamp_ms: 0,
        }))
        .await
        .unwrap();
    writer
        .send(&Message::ImageRequest { id: 987_654 })
        .await
        .unwrap();

    let image = next_image(&mut reader).await;
    assert_eq!(image.entity_id, PLACEHOLDER_ID);
    assert_eq!((image.x_offset, image.y_offset), (0, 0));

    writer.shutdown().await.unwrap();
    let report = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap().unwrap();
    assert_eq!(report.end, SessionEnd::Closed);
    assert_eq!(report.messages_received, 4);
    assert_eq!(report.unhandled_messages, 2);
    assert_eq!(report.images_sent, 1);
    assert_eq!(report.camera_spec, Some(spec));
}

#[tokio::test]
async fn test_undecodable_frame_fails_session_only() {
    init_tracing();
    let (stream, server) = start(test_config(60_000)).await;
    let (_read_half, mut write_half) = stream.into_split();

    write_half.write_all(&4u32.to_be_bytes()).await.unwrap();
    write_half.write_all(b"\xff\xfe{{").await.unwrap();

    let report = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap().unwrap();
    assert!(matches!(report.end, SessionEnd::Failed(_)));
    assert!(report.broadcast.failure.is_none());
}

#[tokio::test]
async fn test_remote_close_mid_session_stops_scheduler() {
    init_tracing();
    let (stream, server) = start(test_config(10)).await;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);

    next_frame(&mut reader).await;
    next_frame(&mut reader).await;
    drop(reader);
    drop(write_half);

    // Unread frames in our buffer turn the close into a reset, so either end
    // reason is acceptable; the session must still come back in one piece.
    let report = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap().unwrap();
    assert!(matches!(report.end, SessionEnd::Closed | SessionEnd::Failed(_)));
    assert!(report.broadcast.ticks >= 2);
    assert!(report.broadcast.frames_sent >= 2);
}

#[tokio::test]
async fn test_listener_is_single_shot() {
    init_tracing();
    let listener = SatListener::bind(test_config(60_000)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(listener.serve_one());

    let first = TcpStream::connect(addr).await.unwrap();
    let (read_half, write_half) = first.into_split();
    let mut reader = FrameReader::new(read_half);
    next_frame(&mut reader).await;

    // The listening socket is gone once the first client is in.
    assert!(TcpStream::connect(addr).await.is_err());

    drop(reader);
    drop(write_half);
    let report = timeout(TEST_TIMEOUT, server).await.unwrap().unwrap().unwrap();
    assert_eq!(report.end, SessionEnd::Closed);
}

#[tokio::test]
async fn test_bind_rejects_invalid_config() {
    let config = SimConfig {
        spawn_probability: 2.0,
        ..test_config(1000)
    };
    assert!(matches!(
        SatListener::bind(config).await,
        Err(debrissat::error::ListenerError::Config(_))
    ));
}
