//! Typed view over the device-info document

use crate::xml::XmlDocument;
use crate::{ApiError, Result};

/// Identity and firmware details reported by `/System/deviceInfo`
///
/// Every field is optional: firmware generations differ in what they report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_name: Option<String>,
    pub device_id: Option<String>,
    pub device_type: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub mac_address: Option<String>,
    pub firmware_version: Option<String>,
    pub firmware_released_date: Option<String>,
}

impl DeviceInfo {
    /// Extract the known fields from a parsed device-info document
    ///
    /// # Errors
    ///
    /// Returns `ApiError::FieldNotUnique` if a known field appears more than once.
    pub fn from_document(doc: &XmlDocument) -> Result<Self> {
        Ok(Self {
            device_name: optional_text(doc, "deviceName")?,
            device_id: optional_text(doc, "deviceID")?,
            device_type: optional_text(doc, "deviceType")?,
            model: optional_text(doc, "model")?,
            serial_number: optional_text(doc, "serialNumber")?,
            mac_address: optional_text(doc, "macAddress")?,
            firmware_version: optional_text(doc, "firmwareVersion")?,
            firmware_released_date: optional_text(doc, "firmwareReleasedDate")?,
        })
    }
}

fn optional_text(doc: &XmlDocument, field: &str) -> Result<Option<String>> {
    match doc.get_text(field) {
        Ok(text) if text.is_empty() => Ok(None),
        Ok(text) => Ok(Some(text)),
        Err(ApiError::FieldNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
