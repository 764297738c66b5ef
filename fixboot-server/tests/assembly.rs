/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

use fixboot_engine::{
    Acceptor, AcceptorBuilder, AcceptorKind, Application, ApplicationAdapter, ConnectorManager,
    DefaultMessageFactory, Lifecycle, LogFactory, ManagementExporter, MessageFactory, ObjectName,
    ScreenLogFactory,
};
use fixboot_server::{
    ConfigurationError, ServerOverrides, ServerProperties, assemble, server_config_available,
};
use fixboot_settings::SessionSettings;
use fixboot_store::{MemoryStoreFactory, MessageStoreFactory};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const SETTINGS: &str = "\
[DEFAULT]
ConnectionType=acceptor
SocketAcceptAddress=127.0.0.1
SocketAcceptPort=0
HeartBtInt=30

[SESSION]
BeginString=FIX.4.4
SenderCompID=SERVER
TargetCompID=CLIENT
";

const BUNDLED: &str = "\
[DEFAULT]
ConnectionType=acceptor
SocketAcceptPort=0

[SESSION]
BeginString=FIX.4.2
SenderCompID=BUNDLED
TargetCompID=CLIENT
";

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
}

fn settings_file(contents: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quickfixj-server.cfg");
    fs::write(&path, contents).unwrap();
    Fixture { _dir: dir, path }
}

fn properties(fixture: &Fixture) -> ServerProperties {
    ServerProperties::default().with_config(&fixture.path)
}

fn private_exporter() -> Arc<ManagementExporter> {
    Arc::new(ManagementExporter::new("test.fixboot"))
}

#[test]
fn concurrent_absent_selects_single_threaded_acceptor() {
    let fixture = settings_file(SETTINGS);
    let props = ServerProperties::from_toml_str(&format!(
        "[quickfixj.server]\nconfig = {:?}\n",
        fixture.path.display().to_string()
    ))
    .unwrap();
    let server = assemble(&props, ServerOverrides::new()).unwrap();
    assert_eq!(server.acceptor().kind(), AcceptorKind::SingleThreaded);
}

#[test]
fn concurrent_enabled_selects_multi_threaded_acceptor() {
    let fixture = settings_file(SETTINGS);
    let server = assemble(
        &properties(&fixture).with_concurrent(true),
        ServerOverrides::new(),
    )
    .unwrap();
    assert_eq!(server.acceptor().kind(), AcceptorKind::MultiThreaded);

    let server = assemble(
        &properties(&fixture).with_concurrent(false),
        ServerOverrides::new(),
    )
    .unwrap();
    assert_eq!(server.acceptor().kind(), AcceptorKind::SingleThreaded);
}

#[test]
fn default_roles_are_built_once_and_shared() {
    let fixture = settings_file(SETTINGS);
    let server = assemble(&properties(&fixture), ServerOverrides::new()).unwrap();

    assert_eq!(server.session_settings().session_count(), 1);
    assert!(Arc::ptr_eq(
        server.connector_manager().connector(),
        server.acceptor()
    ));
    assert!(server.connector_manager().is_auto_startup());
    assert_eq!(server.connector_manager().phase(), i32::MAX);
    assert!(server.management_name().is_none());
    assert!(!server.is_running());
}

#[test]
fn lifecycle_properties_reach_connector_manager() {
    let fixture = settings_file(SETTINGS);
    let server = assemble(
        &properties(&fixture).with_auto_startup(false).with_phase(42),
        ServerOverrides::new(),
    )
    .unwrap();
    assert!(!server.connector_manager().is_auto_startup());
    assert_eq!(server.connector_manager().phase(), 42);
    assert!(!server.start_if_auto().unwrap());
}

#[test]
fn missing_settings_raise_configuration_error() {
    let dir = TempDir::new().unwrap();
    let props = ServerProperties::default().with_config(dir.path().join("absent.cfg"));
    let err = assemble(&props, ServerOverrides::new()).unwrap_err();
    assert!(err.message().starts_with("settings file not found"));
}

#[test]
fn malformed_settings_keep_original_message() {
    let fixture = settings_file("[DEFAULT]\nConnectionType=acceptor\nthis line is wrong\n");
    let err = assemble(&properties(&fixture), ServerOverrides::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "line 3: expected key=value, found 'this line is wrong'"
    );
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn acceptor_construction_failure_is_wrapped() {
    let fixture = settings_file(
        "[SESSION]\nBeginString=FIX.4.4\nSenderCompID=S\nTargetCompID=C\nConnectionType=acceptor\n",
    );
    let err: ConfigurationError =
        assemble(&properties(&fixture), ServerOverrides::new()).unwrap_err();
    assert_eq!(
        err.message(),
        "missing setting 'SocketAcceptPort' in FIX.4.4:S->C"
    );
}

#[test]
fn overrides_suppress_defaults() {
    let settings = Arc::new(SessionSettings::parse(SETTINGS).unwrap());
    let application: Arc<dyn Application> = Arc::new(ApplicationAdapter);
    let store: Arc<dyn MessageStoreFactory> = Arc::new(MemoryStoreFactory::new());
    let log: Arc<dyn LogFactory> = Arc::new(ScreenLogFactory::new(false, false, true));
    let messages: Arc<dyn MessageFactory> = Arc::new(DefaultMessageFactory);

    let overrides = ServerOverrides {
        session_settings: Some(Arc::clone(&settings)),
        application: Some(Arc::clone(&application)),
        message_store_factory: Some(Arc::clone(&store)),
        log_factory: Some(Arc::clone(&log)),
        message_factory: Some(Arc::clone(&messages)),
        ..ServerOverrides::default()
    };
    let server = assemble(&ServerProperties::default(), overrides).unwrap();

    assert!(Arc::ptr_eq(server.session_settings(), &settings));
    assert!(Arc::ptr_eq(server.application(), &application));
    assert!(Arc::ptr_eq(server.message_store_factory(), &store));
    assert!(Arc::ptr_eq(server.log_factory(), &log));
    assert!(Arc::ptr_eq(server.message_factory(), &messages));
}

#[test]
fn supplied_acceptor_and_manager_are_used_as_is() {
    let settings = Arc::new(SessionSettings::parse(SETTINGS).unwrap());
    let acceptor = AcceptorBuilder::new()
        .concurrent(true)
        .build(Arc::clone(&settings))
        .unwrap();
    let manager = Arc::new(ConnectorManager::new(Arc::clone(&acceptor)).with_phase(7));

    let server = assemble(
        &ServerProperties::default().with_concurrent(false),
        ServerOverrides::new()
            .with_session_settings(SessionSettings::parse(SETTINGS).unwrap())
            .with_acceptor(Arc::clone(&acceptor))
            .with_connector_manager(Arc::clone(&manager)),
    )
    .unwrap();

    assert!(Arc::ptr_eq(server.acceptor(), &acceptor));
    assert_eq!(server.acceptor().kind(), AcceptorKind::MultiThreaded);
    assert!(Arc::ptr_eq(server.connector_manager(), &manager));
    assert_eq!(server.connector_manager().phase(), 7);
}

#[test]
fn jmx_enabled_registers_acceptor() {
    let fixture = settings_file(SETTINGS);
    let exporter = private_exporter();
    let server = assemble(
        &properties(&fixture).with_jmx_enabled(true),
        ServerOverrides::new().with_management_exporter(Arc::clone(&exporter)),
    )
    .unwrap();

    let name = server.management_name().unwrap();
    assert_eq!(name.domain(), "test.fixboot");
    assert_eq!(name.property("role"), Some("Acceptor"));
    assert_eq!(exporter.registered(), vec![name.clone()]);
    let snapshot = exporter.lookup(name).unwrap();
    assert_eq!(snapshot.kind, AcceptorKind::SingleThreaded);
}

#[test]
fn jmx_disabled_skips_registration() {
    let fixture = settings_file(SETTINGS);
    let exporter = private_exporter();
    let server = assemble(
        &properties(&fixture),
        ServerOverrides::new().with_management_exporter(Arc::clone(&exporter)),
    )
    .unwrap();
    assert!(server.management_name().is_none());
    assert!(exporter.registered().is_empty());
}

#[test]
fn supplied_management_name_suppresses_registration() {
    let fixture = settings_file(SETTINGS);
    let exporter = private_exporter();
    let name: ObjectName = "custom:type=Acceptor".parse().unwrap();
    let server = assemble(
        &properties(&fixture).with_jmx_enabled(true),
        ServerOverrides::new()
            .with_management_exporter(Arc::clone(&exporter))
            .with_management_name(name.clone()),
    )
    .unwrap();
    assert_eq!(server.management_name(), Some(&name));
    assert!(exporter.registered().is_empty());
}

#[test]
fn registration_failure_aborts_assembly() {
    let settings = Arc::new(SessionSettings::parse(SETTINGS).unwrap());
    let acceptor: Arc<dyn Acceptor> = AcceptorBuilder::new().build(settings).unwrap();
    let exporter = private_exporter();
    exporter.register(Arc::clone(&acceptor)).unwrap();

    let err = assemble(
        &ServerProperties::default().with_jmx_enabled(true),
        ServerOverrides::new()
            .with_session_settings(SessionSettings::parse(SETTINGS).unwrap())
            .with_acceptor(acceptor)
            .with_management_exporter(exporter),
    )
    .unwrap_err();
    assert!(err.message().starts_with("already registered"));
}

#[test]
fn explicit_config_beats_bundled_settings() {
    let fixture = settings_file(SETTINGS);
    let server = assemble(
        &properties(&fixture),
        ServerOverrides::new().with_bundled_settings(BUNDLED),
    )
    .unwrap();
    let ids: Vec<_> = server.session_settings().session_ids().cloned().collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].sender_comp_id, "SERVER");
}

#[test]
fn bundled_settings_used_when_nothing_else_exists() {
    let props = ServerProperties::default();
    assert!(server_config_available(&props, Some(BUNDLED)));
    let server = assemble(&props, ServerOverrides::new().with_bundled_settings(BUNDLED)).unwrap();
    let ids: Vec<_> = server.session_settings().session_ids().cloned().collect();
    assert_eq!(ids[0].sender_comp_id, "BUNDLED");
}

#[test]
fn assembled_server_starts_and_stops() {
    let fixture = settings_file(SETTINGS);
    let server = assemble(&properties(&fixture), ServerOverrides::new()).unwrap();
    assert!(server.start_if_auto().unwrap());
    assert_eq!(server.acceptor().endpoints().len(), 1);
    server.stop();
    assert!(!server.is_running());
    server.stop();
}

#[test]
fn dropping_server_releases_registration_and_acceptor() {
    let fixture = settings_file(SETTINGS);
    let exporter = private_exporter();
    let server = assemble(
        &properties(&fixture).with_jmx_enabled(true),
        ServerOverrides::new().with_management_exporter(Arc::clone(&exporter)),
    )
    .unwrap();
    assert!(server.start_if_auto().unwrap());
    let acceptor = Arc::downgrade(server.acceptor());
    assert_eq!(exporter.registered().len(), 1);

    drop(server);
    assert!(exporter.registered().is_empty());
    assert!(acceptor.upgrade().is_none());
}

#[test]
fn dropping_server_keeps_foreign_registrations() {
    let settings = Arc::new(SessionSettings::parse(SETTINGS).unwrap());
    let exporter = private_exporter();
    let other = exporter
        .register(AcceptorBuilder::new().build(settings).unwrap())
        .unwrap();

    let fixture = settings_file(SETTINGS);
    let name: ObjectName = "custom:type=Acceptor".parse().unwrap();
    let server = assemble(
        &properties(&fixture).with_jmx_enabled(true),
        ServerOverrides::new()
            .with_management_exporter(Arc::clone(&exporter))
            .with_management_name(name),
    )
    .unwrap();
    drop(server);
    assert_eq!(exporter.registered(), vec![other]);
}

#[tokio::test]
async fn shutdown_stops_connector_from_async_context() {
    let fixture = settings_file(SETTINGS);
    let exporter = private_exporter();
    let server = assemble(
        &properties(&fixture).with_jmx_enabled(true),
        ServerOverrides::new().with_management_exporter(Arc::clone(&exporter)),
    )
    .unwrap();
    assert!(server.start_if_auto().unwrap());
    let acceptor = Arc::downgrade(server.acceptor());

    server.shutdown().await;
    assert!(acceptor.upgrade().is_none());
    assert!(exporter.registered().is_empty());
}
