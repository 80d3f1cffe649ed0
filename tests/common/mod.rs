//! Shared mock services and image builders for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use remote_bgremove::{BackgroundService, ServiceFailure, SourceImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Canned answer for every request
#[derive(Debug, Clone)]
pub enum MockReply {
    Success(Bytes),
    Failure(ServiceFailure),
}

/// Service that replies with a fixed answer and records what it was sent
#[derive(Debug)]
pub struct MockService {
    reply: MockReply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen_keys: Mutex<Vec<String>>,
}

impl MockService {
    pub fn succeeding(bytes: impl Into<Bytes>) -> Arc<Self> {
        Arc::new(Self::new(MockReply::Success(bytes.into()), None))
    }

    pub fn failing(failure: ServiceFailure) -> Arc<Self> {
        Arc::new(Self::new(MockReply::Failure(failure), None))
    }

    pub fn slow(bytes: impl Into<Bytes>, delay: Duration) -> Arc<Self> {
        Arc::new(Self::new(MockReply::Success(bytes.into()), Some(delay)))
    }

    fn new(reply: MockReply, delay: Option<Duration>) -> Self {
        Self {
            reply,
            delay,
            calls: AtomicUsize::new(0),
            seen_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_keys(&self) -> Vec<String> {
        self.seen_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundService for MockService {
    async fn remove_background(&self, _image: &SourceImage, api_key: &str) -> Result<Bytes, ServiceFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_keys.lock().unwrap().push(api_key.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            MockReply::Success(bytes) => Ok(bytes.clone()),
            MockReply::Failure(failure) => Err(failure.clone()),
        }
    }
}

/// Service that blocks until released, for observing `Processing`
#[derive(Debug)]
pub struct GatedService {
    pub started: Notify,
    pub release: Notify,
    reply: Bytes,
}

impl GatedService {
    pub fn new(reply: impl Into<Bytes>) -> Arc<Self> {
        Arc::new(Self {
            started: Notify::new(),
            release: Notify::new(),
            reply: reply.into(),
        })
    }
}

#[async_trait]
impl BackgroundService for GatedService {
    async fn remove_background(&self, _image: &SourceImage, _api_key: &str) -> Result<Bytes, ServiceFailure> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(self.reply.clone())
    }
}

/// A JPEG-typed source of `len` bytes
pub fn jpeg_source(name: &str, len: usize) -> SourceImage {
    let mut bytes = vec![0u8; len];
    bytes[..4].copy_from_slice(&[0xff, 0xd8, 0xff, 0xe0]);
    SourceImage::new(bytes, "image/jpeg", name)
}

/// PNG bytes of a `width`×`height` image filled with `pixel`
pub fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(pixel));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
