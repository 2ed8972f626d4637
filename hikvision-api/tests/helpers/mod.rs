//! Test helpers: XML fixtures and an in-memory stand-in for a camera

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use hikvision_api::{Dialect, EndpointSet, Transport, TransportError, WriteMethod};

pub const BASE_URL: &str = "http://10.0.0.64";

/// Load an XML fixture from `tests/fixtures`
pub fn fixture(filename: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(filename);

    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", filename, e))
}

/// A record of one write received by [`StubDevice`]
#[derive(Debug, Clone)]
pub struct Write {
    pub method: WriteMethod,
    pub url: String,
    pub body: String,
}

/// A camera that serves documents from memory and persists whatever is written
///
/// Unknown URLs answer 404. A URL can be made to fail with any status via
/// [`StubDevice::fail`].
pub struct StubDevice {
    documents: RefCell<HashMap<String, String>>,
    failures: RefCell<HashMap<String, u16>>,
    writes: RefCell<Vec<Write>>,
    gets: RefCell<Vec<String>>,
    write_response: String,
}

impl StubDevice {
    /// A device with every document of `dialect` populated from fixtures
    pub fn new(dialect: Dialect) -> Self {
        let endpoints = EndpointSet::new(BASE_URL, dialect);
        let (info, motion) = match dialect {
            Dialect::Isapi => ("isapi_device_info.xml", "isapi_motion_detection.xml"),
            Dialect::Legacy => ("legacy_device_info.xml", "legacy_motion_detection.xml"),
        };

        let mut documents = HashMap::new();
        documents.insert(endpoints.device_info.clone(), fixture(info));
        documents.insert(endpoints.motion_detection.clone(), fixture(motion));
        documents.insert(endpoints.channel_name_overlay.clone(), fixture("channel_name_overlay.xml"));
        documents.insert(endpoints.date_time_overlay.clone(), fixture("date_time_overlay.xml"));

        Self {
            documents: RefCell::new(documents),
            failures: RefCell::new(HashMap::new()),
            writes: RefCell::new(Vec::new()),
            gets: RefCell::new(Vec::new()),
            write_response: fixture("response_ok.xml"),
        }
    }

    /// Replace the document served at `url`
    pub fn serve(&self, url: &str, body: String) {
        self.documents.borrow_mut().insert(url.to_string(), body);
    }

    /// Make every request to `url` answer `status`
    pub fn fail(&self, url: &str, status: u16) {
        self.failures.borrow_mut().insert(url.to_string(), status);
    }

    /// Answer writes with `body` instead of an OK status document
    pub fn with_write_response(mut self, body: String) -> Self {
        self.write_response = body;
        self
    }

    pub fn document(&self, url: &str) -> Option<String> {
        self.documents.borrow().get(url).cloned()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.borrow().clone()
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.gets.borrow().iter().filter(|u| u.as_str() == url).count()
    }

    fn check_failure(&self, url: &str) -> Result<(), TransportError> {
        match self.failures.borrow().get(url) {
            Some(status) => Err(TransportError::status(*status, Some("stub failure".to_string()))),
            None => Ok(()),
        }
    }
}

impl Transport for StubDevice {
    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.gets.borrow_mut().push(url.to_string());
        self.check_failure(url)?;
        self.documents
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::status(404, None))
    }

    fn send(&self, method: WriteMethod, url: &str, body: &str) -> Result<String, TransportError> {
        self.check_failure(url)?;
        self.writes.borrow_mut().push(Write {
            method,
            url: url.to_string(),
            body: body.to_string(),
        });
        self.documents.borrow_mut().insert(url.to_string(), body.to_string());
        Ok(self.write_response.clone())
    }
}

/// Shared buffer capturing formatted log output
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// A dispatcher writing every event at `debug` and above into this buffer
    pub fn dispatch(&self) -> tracing::Dispatch {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::Dispatch::new(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
