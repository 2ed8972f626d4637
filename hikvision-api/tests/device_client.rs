//! Device client behavior against an in-memory camera
//!
//! The stub persists every written document, so these tests exercise the full
//! fetch, patch and submit cycle without a network.

mod helpers;

use helpers::{fixture, LogCapture, StubDevice};
use hikvision_api::{
    ApiError, ClientConfig, DeviceClient, Dialect, Feature, MissingFieldPolicy, NamespaceMode,
    WriteMethod, WriteOutcome, XmlDocument,
};
use rstest::rstest;

fn config(dialect: Dialect) -> ClientConfig {
    ClientConfig::builder()
        .host("10.0.0.64")
        .credentials("admin", "12345")
        .dialect(dialect)
        .build()
        .expect("valid config")
}

fn connect(dialect: Dialect) -> DeviceClient<StubDevice> {
    DeviceClient::with_transport(config(dialect), StubDevice::new(dialect)).expect("probe should succeed")
}

#[test]
fn test_construction_probes_version_and_motion_state() {
    let client = connect(Dialect::Isapi);
    let endpoints = client.endpoints().clone();

    assert_eq!(client.transport().get_count(&endpoints.device_info), 1);
    assert_eq!(client.transport().get_count(&endpoints.motion_detection), 1);
    assert!(client.transport().writes().is_empty());
}

#[test]
fn test_version_and_device_info() {
    let client = connect(Dialect::Isapi);
    assert_eq!(client.version().unwrap().as_deref(), Some("V5.4.5"));

    let info = client.device_info().unwrap();
    assert_eq!(info.device_name.as_deref(), Some("Driveway"));
    assert_eq!(info.model.as_deref(), Some("DS-2CD2142FWD-I"));
    assert_eq!(info.serial_number.as_deref(), Some("DS-2CD2142FWD-I20170412AAWR745612345"));

    assert_eq!(
        client.device_info_field("macAddress").unwrap().as_deref(),
        Some("c0:56:e3:aa:bb:cc")
    );
    assert!(client.device_info_raw().unwrap().contains("<deviceName>Driveway</deviceName>"));
}

#[test]
fn test_missing_field_policy() {
    let strict = connect(Dialect::Legacy);
    assert!(matches!(
        strict.device_info_field("encoderVersion"),
        Err(ApiError::FieldNotFound(_))
    ));

    let lenient_config = ClientConfig::builder()
        .host("10.0.0.64")
        .dialect(Dialect::Legacy)
        .missing_field_policy(MissingFieldPolicy::Fallback)
        .build()
        .unwrap();
    let lenient = DeviceClient::with_transport(lenient_config, StubDevice::new(Dialect::Legacy)).unwrap();
    assert_eq!(lenient.device_info_field("encoderVersion").unwrap(), None);
    assert_eq!(lenient.version().unwrap().as_deref(), Some("V5.2.0"));
}

#[rstest]
#[case(Dialect::Isapi)]
#[case(Dialect::Legacy)]
fn test_set_enabled_round_trip(#[case] dialect: Dialect) {
    let client = connect(dialect);

    for feature in Feature::ALL {
        assert_eq!(client.set_enabled(feature, true).unwrap(), WriteOutcome::Confirmed);
        assert!(client.is_enabled(feature), "{} should be on", feature);

        assert_eq!(client.set_enabled(feature, false).unwrap(), WriteOutcome::Confirmed);
        assert!(!client.is_enabled(feature), "{} should be off", feature);
    }
}

#[test]
fn test_set_enabled_is_idempotent() {
    let client = connect(Dialect::Isapi);
    let url = client.endpoints().motion_detection.clone();

    client.set_enabled(Feature::MotionDetection, true).unwrap();
    let once = client.transport().document(&url).unwrap();

    client.set_enabled(Feature::MotionDetection, true).unwrap();
    let twice = client.transport().document(&url).unwrap();

    assert_eq!(once, twice);
    assert!(client.is_motion_detection_enabled());
}

#[test]
fn test_every_write_is_preceded_by_a_fresh_read() {
    let client = connect(Dialect::Isapi);
    let url = client.endpoints().date_time_overlay.clone();

    client.set_date_time_overlay(true).unwrap();
    // Someone else changes another field on the device between our calls
    let changed = fixture("date_time_overlay.xml").replace("24hour", "12hour");
    client.transport().serve(&url, changed);
    client.set_date_time_overlay(false).unwrap();

    assert_eq!(client.transport().get_count(&url), 2);
    let sent = XmlDocument::parse(&client.transport().writes().last().unwrap().body).unwrap();
    assert_eq!(sent.get_text("timeStyle").unwrap(), "12hour");
    assert!(!sent.get_bool("enabled").unwrap());
}

#[test]
fn test_write_preserves_untouched_fields() {
    let client = connect(Dialect::Isapi);
    client.set_channel_name_overlay(false).unwrap();

    let write = client.transport().writes().pop().unwrap();
    assert_eq!(write.method, WriteMethod::Put);
    assert!(write.url.ends_with("/overlays/channelNameOverlay"));

    let sent = XmlDocument::parse(&write.body).unwrap();
    assert!(!sent.get_bool("enabled").unwrap());
    assert_eq!(sent.get_text("name").unwrap(), "Driveway");
    assert_eq!(sent.get_int("positionX").unwrap(), 512);
    assert!(write.body.contains("xmlns=\"http://www.hikvision.com/ver20/XMLSchema\""));
}

#[test]
fn test_zero_sensitivity_is_replaced_with_default() {
    let dialect = Dialect::Isapi;
    let device = StubDevice::new(dialect);
    let endpoints = hikvision_api::EndpointSet::new(helpers::BASE_URL, dialect);
    device.serve(
        &endpoints.motion_detection,
        fixture("isapi_motion_detection_zero_sensitivity.xml"),
    );

    let config = ClientConfig::builder()
        .host("10.0.0.64")
        .sensitivity_level(40)
        .build()
        .unwrap();
    let client = DeviceClient::with_transport(config, device).unwrap();

    assert_eq!(client.motion_sensitivity().unwrap(), 40);
    assert!(client.fetch(Feature::MotionDetection).unwrap().get_int("sensitivityLevel").unwrap() == 40);

    client.enable_motion_detection().unwrap();
    let sent = XmlDocument::parse(&client.transport().writes()[0].body).unwrap();
    assert_eq!(sent.get_int("sensitivityLevel").unwrap(), 40);
    assert!(sent.get_bool("enabled").unwrap());
}

#[test]
fn test_nonzero_sensitivity_is_left_alone() {
    let client = connect(Dialect::Isapi);
    assert_eq!(client.motion_sensitivity().unwrap(), 1);

    client.set_motion_sensitivity(75).unwrap();
    assert_eq!(client.motion_sensitivity().unwrap(), 75);
}

#[test]
fn test_legacy_prefixed_document() {
    let client = connect(Dialect::Legacy);

    // legacy fixture is enabled, namespaced with an xs: prefix, sensitivity 0
    assert!(client.is_motion_detection_enabled());
    assert_eq!(client.motion_sensitivity().unwrap(), 1);

    client.disable_motion_detection().unwrap();
    assert!(!client.is_motion_detection_enabled());

    let writes = client.transport().writes();
    let write = &writes[0];
    assert!(write.url.ends_with("/MotionDetection/1"));
    assert!(
        write.body.contains(r#"xmlns:xs="http://www.hikvision.com/ver10/XMLSchema""#),
        "body: {}",
        write.body
    );
    assert!(write.body.contains("<xs:enabled>false</xs:enabled>"), "body: {}", write.body);

    let sent = XmlDocument::parse_with(&write.body, NamespaceMode::Qualified, Dialect::Legacy.namespace_uri()).unwrap();
    assert!(!sent.get_bool("enabled").unwrap());
    assert_eq!(sent.get_int("sensitivityLevel").unwrap(), 1);
}

#[test]
fn test_zero_default_sensitivity_is_rejected_before_any_request() {
    let config = ClientConfig {
        host: "10.0.0.64".to_string(),
        dialect: Dialect::Legacy,
        sensitivity_level: 0,
        ..ClientConfig::default()
    };
    let device = StubDevice::new(Dialect::Legacy);

    assert!(matches!(
        DeviceClient::with_transport(config, &device),
        Err(ApiError::InvalidParameter(_))
    ));
    assert_eq!(device.get_count(&format!("{}/System/deviceInfo", helpers::BASE_URL)), 0);
}

#[test]
fn test_submit_writes_caller_document() {
    let client = connect(Dialect::Isapi);

    let mut doc = client.fetch(Feature::ChannelNameOverlay).unwrap();
    assert_eq!(doc.root_name(), "channelNameOverlay");
    doc.set_text("name", "Back Door").unwrap().set_bool("enabled", false).unwrap();

    assert_eq!(client.submit(Feature::ChannelNameOverlay, &doc).unwrap(), WriteOutcome::Confirmed);
    assert!(!client.is_channel_name_overlay_enabled());

    let stored = client.fetch(Feature::ChannelNameOverlay).unwrap();
    assert_eq!(stored.get_text("name").unwrap(), "Back Door");
}

#[test]
fn test_qualified_namespace_mode() {
    let config = ClientConfig::builder()
        .host("10.0.0.64")
        .namespace_mode(NamespaceMode::Qualified)
        .build()
        .unwrap();
    let client = DeviceClient::with_transport(config, StubDevice::new(Dialect::Isapi)).unwrap();

    assert!(!client.is_motion_detection_enabled());
    assert_eq!(client.version().unwrap().as_deref(), Some("V5.4.5"));
}

#[rstest]
#[case(401)]
#[case(500)]
fn test_error_status_on_read(#[case] status: u16) {
    let client = connect(Dialect::Isapi);
    let url = client.endpoints().motion_detection.clone();
    client.transport().fail(&url, status);

    assert!(!client.is_motion_detection_enabled());
    match client.try_is_enabled(Feature::MotionDetection) {
        Err(ApiError::RequestFailed { status: got, body }) => {
            assert_eq!(got, status);
            assert_eq!(body.as_deref(), Some("stub failure"));
        }
        other => panic!("Expected RequestFailed, got {:?}", other),
    }
    match client.set_enabled(Feature::MotionDetection, true) {
        Err(e) => assert_eq!(e.status(), Some(status)),
        Ok(_) => panic!("write should fail"),
    }
    assert!(client.transport().writes().is_empty());
}

#[test]
fn test_unparseable_document_reads_as_disabled() {
    let client = connect(Dialect::Isapi);
    let url = client.endpoints().channel_name_overlay.clone();

    client.transport().serve(&url, "<html><body>login</body>".to_string());
    assert!(!client.is_channel_name_overlay_enabled());
    assert!(matches!(
        client.try_is_enabled(Feature::ChannelNameOverlay),
        Err(ApiError::ParseError(_))
    ));

    client.transport().serve(&url, "<channelNameOverlay><name>x</name></channelNameOverlay>".to_string());
    assert!(!client.is_channel_name_overlay_enabled());
    assert!(matches!(
        client.set_channel_name_overlay(true),
        Err(ApiError::FieldNotFound(_))
    ));
}

#[test]
fn test_unconfirmed_write_is_logged() {
    let logs = LogCapture::default();
    let config = ClientConfig::builder()
        .host("10.0.0.64")
        .log_dispatch(logs.dispatch())
        .build()
        .unwrap();
    let device = StubDevice::new(Dialect::Isapi).with_write_response(fixture("response_invalid_content.xml"));
    let client = DeviceClient::with_transport(config, device).unwrap();

    let outcome = client.set_date_time_overlay(true).unwrap();
    assert_eq!(outcome, WriteOutcome::Unconfirmed(Some("Invalid Content".to_string())));

    let output = logs.contents();
    assert!(output.contains("WARN"), "log output: {}", output);
    assert!(output.contains("Invalid Content"), "log output: {}", output);
}

#[test]
fn test_write_response_without_status_is_unconfirmed() {
    let device = StubDevice::new(Dialect::Isapi).with_write_response(String::new());
    let client = DeviceClient::with_transport(config(Dialect::Isapi), device).unwrap();

    assert_eq!(
        client.set_channel_name_overlay(true).unwrap(),
        WriteOutcome::Unconfirmed(None)
    );
}

#[test]
fn test_probe_logs_through_injected_sink() {
    let logs = LogCapture::default();
    let config = ClientConfig::builder()
        .host("10.0.0.64")
        .log_dispatch(logs.dispatch())
        .build()
        .unwrap();
    let _client = DeviceClient::with_transport(config, StubDevice::new(Dialect::Isapi)).unwrap();

    let output = logs.contents();
    assert!(output.contains("10.0.0.64 connected"), "log output: {}", output);
    assert!(output.contains("V5.4.5"), "log output: {}", output);
}

#[test]
fn test_probe_fails_when_version_is_rejected() {
    let device = StubDevice::new(Dialect::Isapi);
    device.fail(&format!("{}/ISAPI/System/deviceInfo", helpers::BASE_URL), 401);

    match DeviceClient::with_transport(config(Dialect::Isapi), device) {
        Err(ApiError::RequestFailed { status, .. }) => assert_eq!(status, 401),
        Err(other) => panic!("Expected RequestFailed, got {:?}", other),
        Ok(_) => panic!("construction should fail"),
    }
}

#[test]
fn test_probe_tolerates_motion_detection_failure() {
    let device = StubDevice::new(Dialect::Isapi);
    device.fail(
        &format!("{}/ISAPI/System/Video/Inputs/channels/1/motionDetection", helpers::BASE_URL),
        500,
    );

    let client = DeviceClient::with_transport(config(Dialect::Isapi), device).unwrap();
    assert!(!client.is_motion_detection_enabled());
}
