use super::{EncodeBackend, EncodeRequest, EncodedImage, SourceImage};
use crate::compression::{OutputFormat, Quality};
use crate::resource::ResourceHandle;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type SizeFn = Arc<dyn Fn(&EncodeRequest) -> u64 + Send + Sync>;

/// Backend that reports scripted sizes without touching any pixels.
///
/// Sizes come from, in order of precedence: the scripted queue (the last
/// entry repeats once the queue runs dry), a size function, or a fixed
/// default. Clones share their recorded calls, so a clone kept by a test
/// can inspect what the engine asked for.
#[derive(Clone)]
pub struct MockBackend {
    sizes: Arc<Mutex<VecDeque<u64>>>,
    last_size: Arc<Mutex<Option<u64>>>,
    size_fn: Option<SizeFn>,
    default_size: u64,
    fail_on_call: Arc<Mutex<Option<usize>>>,
    calls: Arc<Mutex<Vec<EncodeRequest>>>,
    issued: Arc<Mutex<Vec<ResourceHandle>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            sizes: Arc::new(Mutex::new(VecDeque::new())),
            last_size: Arc::new(Mutex::new(None)),
            size_fn: None,
            default_size: 1024,
            fail_on_call: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
            issued: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Report these sizes for successive calls.
    pub fn with_sizes(self, sizes: Vec<u64>) -> Self {
        *self.sizes.lock().unwrap() = sizes.into();
        self
    }

    /// Derive the reported size from each request.
    pub fn with_size_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&EncodeRequest) -> u64 + Send + Sync + 'static,
    {
        self.size_fn = Some(Arc::new(f));
        self
    }

    /// Size shrinking linearly with quality: `bytes_at_full * quality`.
    pub fn with_linear_sizes(self, bytes_at_full: u64) -> Self {
        self.with_size_fn(move |request| {
            bytes_at_full * u64::from(request.quality.hundredths()) / 100
        })
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.fail_on_call.lock().unwrap() = should_fail.then_some(1);
        self
    }

    /// Fail the `n`th call (1-based) and every call after it.
    pub fn with_failure_on_call(self, n: usize) -> Self {
        *self.fail_on_call.lock().unwrap() = Some(n);
        self
    }

    pub fn get_calls(&self) -> Vec<EncodeRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn qualities(&self) -> Vec<Quality> {
        self.get_calls().iter().map(|c| c.quality).collect()
    }

    /// Every handle this backend has produced, in call order.
    pub fn issued_handles(&self) -> Vec<ResourceHandle> {
        self.issued.lock().unwrap().clone()
    }

    fn next_size(&self, request: &EncodeRequest) -> u64 {
        if let Some(size) = self.sizes.lock().unwrap().pop_front() {
            *self.last_size.lock().unwrap() = Some(size);
            return size;
        }
        if let Some(size) = *self.last_size.lock().unwrap() {
            return size;
        }
        match &self.size_fn {
            Some(f) => f(request),
            None => self.default_size,
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EncodeBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn encode(&self, _source: &SourceImage, request: &EncodeRequest) -> Result<EncodedImage> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(*request);
            calls.len()
        };

        if let Some(n) = *self.fail_on_call.lock().unwrap() {
            if call_number >= n {
                return Err(Error::Backend("Mock failure".to_string()));
            }
        }

        let size_bytes = self.next_size(request);
        // Placeholder bytes carry the format signature, not the full size
        let placeholder = match request.format {
            OutputFormat::Jpeg => vec![0xFF, 0xD8, 0xFF, 0xE0],
            OutputFormat::Png => vec![0x89, 0x50, 0x4E, 0x47],
            OutputFormat::Webp => b"RIFF\0\0\0\0WEBP".to_vec(),
        };
        let handle = ResourceHandle::in_memory(placeholder);
        self.issued.lock().unwrap().push(handle.clone());

        Ok(EncodedImage {
            handle,
            width: request.width,
            height: request.height,
            size_bytes,
        })
    }
}
