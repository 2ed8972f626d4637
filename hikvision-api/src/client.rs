use isapi_client::{HttpTransport, Transport};

use crate::config::{ClientConfig, MissingFieldPolicy, MAX_SENSITIVITY_LEVEL};
use crate::device_info::DeviceInfo;
use crate::endpoint::{EndpointSet, Feature};
use crate::xml::XmlDocument;
use crate::{ApiError, Result};

const ENABLED: &str = "enabled";
const SENSITIVITY_LEVEL: &str = "sensitivityLevel";
const FIRMWARE_VERSION: &str = "firmwareVersion";
const STATUS_STRING: &str = "statusString";

/// How far the device confirmed a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The device answered `statusString` = `OK`
    Confirmed,
    /// The device accepted the request but did not report `OK`; carries
    /// whatever status string it did report. The write may have partially
    /// applied.
    Unconfirmed(Option<String>),
}

impl WriteOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, WriteOutcome::Confirmed)
    }
}

/// A client for one camera
///
/// Every operation fetches the current document from the device; nothing is
/// cached between calls. Write operations fetch, patch and submit within the
/// same call. The fetch-then-submit sequence is not atomic, so calls on a
/// single client must not be interleaved by the caller.
///
/// # Example
///
/// ```rust,no_run
/// use hikvision_api::{ClientConfig, DeviceClient, Feature};
///
/// let config = ClientConfig::builder()
///     .host("192.168.1.64")
///     .credentials("admin", "12345")
///     .build()?;
/// let client = DeviceClient::connect(config)?;
///
/// if !client.is_enabled(Feature::MotionDetection) {
///     client.set_enabled(Feature::MotionDetection, true)?;
/// }
/// # Ok::<(), hikvision_api::ApiError>(())
/// ```
#[derive(Debug)]
pub struct DeviceClient<T: Transport = HttpTransport> {
    config: ClientConfig,
    endpoints: EndpointSet,
    transport: T,
}

impl DeviceClient<HttpTransport> {
    /// Connect to the device described by `config` over HTTP(S)
    ///
    /// Validates the configuration, then probes the device by reading its
    /// firmware version and motion-detection state.
    ///
    /// # Errors
    ///
    /// * `ApiError::MissingParameter` if no host is configured (no request is made)
    /// * `ApiError::DeviceUnreachable` if the probe cannot reach the device
    /// * `ApiError::RequestFailed` if the device rejects the version probe
    pub fn connect(config: ClientConfig) -> Result<Self> {
        in_scope(&config, || config.validate())?;

        let mut builder = HttpTransport::builder()
            .auth(config.auth.into())
            .host_header(config.host_header());
        if let Some(credentials) = config.credentials() {
            builder = builder.credentials(credentials);
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Self::with_transport(config, builder.build())
    }
}

impl<T: Transport> DeviceClient<T> {
    /// Connect over a caller-supplied transport
    ///
    /// Runs the same validation and probe as [`DeviceClient::connect`].
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        in_scope(&config, || config.validate())?;

        let client = Self {
            endpoints: config.endpoints(),
            config,
            transport,
        };
        client.scoped(|| client.probe())?;
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn host(&self) -> &str {
        self.config.host.trim()
    }

    fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        in_scope(&self.config, f)
    }

    fn probe(&self) -> Result<()> {
        tracing::info!(
            "Initialising client for {} ({} dialect)",
            self.host(),
            self.config.dialect.name()
        );
        tracing::debug!("motion detection url: {}", self.endpoints.motion_detection);

        if self.config.is_insecure() {
            tracing::warn!("{}: HTTP Basic Auth without SSL is insecure", self.host());
        }

        let version = self.fetch_version().map_err(|e| self.wrap_unreachable(e))?;
        let enabled = match self.read_enabled(Feature::MotionDetection) {
            Ok(enabled) => enabled,
            Err(e) if e.is_unreachable() => return Err(self.wrap_unreachable(e)),
            Err(e) => {
                tracing::warn!("{}: could not read motion detection state: {}", self.host(), e);
                false
            }
        };

        tracing::info!(
            "{} connected, firmware = {}, motion detection enabled = {}",
            self.host(),
            version.as_deref().unwrap_or("unknown"),
            enabled
        );
        Ok(())
    }

    fn wrap_unreachable(&self, error: ApiError) -> ApiError {
        match error {
            ApiError::DeviceUnreachable(msg) => {
                ApiError::DeviceUnreachable(format!("connection to {} failed: {}", self.host(), msg))
            }
            other => other,
        }
    }

    fn parse(&self, text: &str) -> Result<XmlDocument> {
        XmlDocument::parse_with(
            text,
            self.config.namespace_mode,
            self.config.dialect.namespace_uri(),
        )
    }

    /// Firmware version running on the camera
    ///
    /// `Ok(None)` only when the field is absent and the missing-field policy is
    /// `Fallback`.
    pub fn version(&self) -> Result<Option<String>> {
        self.scoped(|| self.fetch_version())
    }

    fn fetch_version(&self) -> Result<Option<String>> {
        self.fetch_device_info_field(FIRMWARE_VERSION)
    }

    /// Unparsed body of the device-info document
    pub fn device_info_raw(&self) -> Result<String> {
        self.scoped(|| {
            tracing::debug!("url: {}", self.endpoints.device_info);
            Ok(self.transport.get(&self.endpoints.device_info)?)
        })
    }

    /// Identity and firmware details of the camera
    pub fn device_info(&self) -> Result<DeviceInfo> {
        self.scoped(|| {
            let text = self.transport.get(&self.endpoints.device_info)?;
            DeviceInfo::from_document(&self.parse(&text)?)
        })
    }

    /// Text of a single device-info element, e.g. `serialNumber`
    ///
    /// An absent field is an error or `Ok(None)` depending on the configured
    /// [`MissingFieldPolicy`]. A duplicated field is always an error.
    pub fn device_info_field(&self, field: &str) -> Result<Option<String>> {
        self.scoped(|| self.fetch_device_info_field(field))
    }

    fn fetch_device_info_field(&self, field: &str) -> Result<Option<String>> {
        let text = self.transport.get(&self.endpoints.device_info)?;
        let doc = self.parse(&text)?;

        match doc.get_text(field) {
            Ok(value) => {
                tracing::debug!("{}: {} = {}", self.host(), field, value);
                Ok(Some(value))
            }
            Err(ApiError::FieldNotFound(path))
                if self.config.missing_field_policy == MissingFieldPolicy::Fallback =>
            {
                tracing::error!("{}: there was a problem finding element {}", self.host(), path);
                tracing::debug!("Entire response: {}", text);
                Ok(None)
            }
            Err(e) => {
                tracing::debug!("Entire response: {}", text);
                Err(e)
            }
        }
    }

    /// Fetch the current document controlling `feature`
    ///
    /// Motion-detection documents reporting a sensitivity level of 0 come
    /// back with the configured default level in its place.
    pub fn fetch(&self, feature: Feature) -> Result<XmlDocument> {
        self.scoped(|| self.fetch_document(feature))
    }

    fn fetch_document(&self, feature: Feature) -> Result<XmlDocument> {
        let url = self.endpoints.feature(feature);
        let text = self.transport.get(url)?;
        tracing::debug!("Response: {}", text);

        let mut doc = self.parse(&text)?;
        if feature == Feature::MotionDetection {
            self.normalize_sensitivity(&mut doc)?;
        }
        Ok(doc)
    }

    fn normalize_sensitivity(&self, doc: &mut XmlDocument) -> Result<()> {
        match doc.get_int(SENSITIVITY_LEVEL) {
            Ok(0) => {
                tracing::warn!("{} sensitivityLevel is 0", self.host());
                doc.set_int(SENSITIVITY_LEVEL, i64::from(self.config.sensitivity_level))?;
                tracing::info!(
                    "{} sensitivityLevel now set to {}",
                    self.host(),
                    self.config.sensitivity_level
                );
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(ApiError::FieldNotFound(_)) => {
                tracing::debug!("{}: no sensitivityLevel in motion detection document", self.host());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Whether `feature` is enabled, as an error-propagating query
    pub fn try_is_enabled(&self, feature: Feature) -> Result<bool> {
        self.scoped(|| self.read_enabled(feature))
    }

    fn read_enabled(&self, feature: Feature) -> Result<bool> {
        let enabled = self.fetch_document(feature)?.get_bool(ENABLED)?;
        tracing::info!("{} {} state, enabled: {}", self.host(), feature, enabled);
        Ok(enabled)
    }

    /// Whether `feature` is enabled
    ///
    /// Any failure (unreachable device, error status, unexpected document)
    /// is logged and reported as `false`. Use [`DeviceClient::try_is_enabled`]
    /// to see the error.
    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.scoped(|| match self.read_enabled(feature) {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::error!(
                    "{}: problem getting {} state from {}: {}",
                    self.host(),
                    feature,
                    self.endpoints.feature(feature),
                    e
                );
                false
            }
        })
    }

    /// Turn `feature` on or off
    pub fn set_enabled(&self, feature: Feature, enabled: bool) -> Result<WriteOutcome> {
        self.patch(feature, |doc| {
            doc.set_bool(ENABLED, enabled)?;
            Ok(())
        })
    }

    /// Fetch the document for `feature`, apply `edit` to it and submit it
    ///
    /// The fetch immediately precedes the submit; the edited document is
    /// dropped afterwards.
    pub fn patch<F>(&self, feature: Feature, edit: F) -> Result<WriteOutcome>
    where
        F: FnOnce(&mut XmlDocument) -> Result<()>,
    {
        self.scoped(|| {
            let mut doc = self.fetch_document(feature)?;
            edit(&mut doc)?;
            self.submit_document(feature, &doc)
        })
    }

    /// Serialize `doc` and write it to the endpoint of `feature`
    pub fn submit(&self, feature: Feature, doc: &XmlDocument) -> Result<WriteOutcome> {
        self.scoped(|| self.submit_document(feature, doc))
    }

    fn submit_document(&self, feature: Feature, doc: &XmlDocument) -> Result<WriteOutcome> {
        let url = self.endpoints.feature(feature);
        let body = doc.to_xml()?;
        let method = self.config.write_method();

        let response = self.transport.send(method, url, &body).map_err(|e| {
            tracing::error!("{}: error writing {} to {}: {}", self.host(), feature, url, e);
            ApiError::from(e)
        })?;
        tracing::debug!("Response: {}", response);

        Ok(self.check_status(feature, &response))
    }

    fn check_status(&self, feature: Feature, response: &str) -> WriteOutcome {
        match XmlDocument::parse(response).and_then(|doc| doc.get_text(STATUS_STRING)) {
            Ok(status) if status == "OK" => {
                tracing::info!("{}: {} updated successfully", self.host(), feature);
                WriteOutcome::Confirmed
            }
            Ok(status) => {
                tracing::warn!(
                    "{}: {} update returned status '{}', the change may be incomplete",
                    self.host(),
                    feature,
                    status
                );
                WriteOutcome::Unconfirmed(Some(status))
            }
            Err(e) => {
                tracing::warn!(
                    "{}: problem parsing the {} update response: {}",
                    self.host(),
                    feature,
                    e
                );
                WriteOutcome::Unconfirmed(None)
            }
        }
    }

    pub fn is_motion_detection_enabled(&self) -> bool {
        self.is_enabled(Feature::MotionDetection)
    }

    pub fn enable_motion_detection(&self) -> Result<WriteOutcome> {
        self.set_enabled(Feature::MotionDetection, true)
    }

    pub fn disable_motion_detection(&self) -> Result<WriteOutcome> {
        self.set_enabled(Feature::MotionDetection, false)
    }

    /// Current motion-detection sensitivity, after normalization of 0
    pub fn motion_sensitivity(&self) -> Result<u8> {
        self.scoped(|| {
            let level = self
                .fetch_document(Feature::MotionDetection)?
                .get_int(SENSITIVITY_LEVEL)?;
            u8::try_from(level).map_err(|_| {
                ApiError::ParseError(format!("sensitivityLevel {} is out of range", level))
            })
        })
    }

    /// Write a new motion-detection sensitivity (1-100)
    pub fn set_motion_sensitivity(&self, level: u8) -> Result<WriteOutcome> {
        if level == 0 || level > MAX_SENSITIVITY_LEVEL {
            return Err(ApiError::InvalidParameter(format!(
                "sensitivity level {} is out of range [1, {}]",
                level, MAX_SENSITIVITY_LEVEL
            )));
        }
        self.patch(Feature::MotionDetection, |doc| {
            doc.set_int(SENSITIVITY_LEVEL, i64::from(level))?;
            Ok(())
        })
    }

    pub fn is_channel_name_overlay_enabled(&self) -> bool {
        self.is_enabled(Feature::ChannelNameOverlay)
    }

    pub fn set_channel_name_overlay(&self, enabled: bool) -> Result<WriteOutcome> {
        self.set_enabled(Feature::ChannelNameOverlay, enabled)
    }

    pub fn is_date_time_overlay_enabled(&self) -> bool {
        self.is_enabled(Feature::DateTimeOverlay)
    }

    pub fn set_date_time_overlay(&self, enabled: bool) -> Result<WriteOutcome> {
        self.set_enabled(Feature::DateTimeOverlay, enabled)
    }
}

/// Run `f` with the config's log sink as the default dispatcher, if it has one
fn in_scope<R>(config: &ClientConfig, f: impl FnOnce() -> R) -> R {
    match &config.log_dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}
