//! End-to-end gateway behavior across storage, policy and transport.

use std::io;
use std::sync::{Arc, Mutex};

use crashgate_core::domain::{AppMetadata, BuildChannel, Category, ChannelHint, Severity};
use crashgate_core::ports::{Envelope, StaticProbe, Transport};
use crashgate_telemetry::{
    DirectoryStorage, Gateway, LaunchSentinel, MemoryStorage, DEVICE_APP_HASH_KEY,
};

#[derive(Default)]
struct RecordingTransport {
    delivered: Mutex<Vec<Envelope>>,
}

impl Transport for RecordingTransport {
    fn deliver(&self, envelope: Envelope) {
        self.delivered.lock().unwrap().push(envelope);
    }
}

fn metadata(hint: ChannelHint) -> AppMetadata {
    AppMetadata::new("org.mozilla.ios.Firefox", "131.0").with_channel_hint(hint)
}

fn gateway(meta: AppMetadata, transport: Arc<RecordingTransport>) -> Gateway {
    Gateway::builder(meta)
        .probe(Arc::new(StaticProbe(false)))
        .storage(Some(Arc::new(MemoryStorage::new())))
        .transport(transport)
        .build()
}

#[test]
fn warning_becomes_breadcrumb_for_following_crash() {
    let transport = Arc::new(RecordingTransport::default());
    let gateway = gateway(metadata(ChannelHint::Release), Arc::clone(&transport));
    gateway.setup(true);

    gateway.send("disk full", Category::new("storage"), Severity::Warning, None);
    assert!(transport.delivered.lock().unwrap().is_empty());

    gateway.send("crash", Category::new("core"), Severity::Fatal, None);

    let delivered = transport.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].event.message(), "crash");
    let crumbs: Vec<&str> = delivered[0]
        .breadcrumbs
        .iter()
        .map(|e| e.message())
        .collect();
    assert_eq!(crumbs, ["disk full"]);
    // Transmitted events are not retained as breadcrumbs
    assert_eq!(gateway.breadcrumbs().len(), 1);
}

#[test]
fn simulated_environment_never_activates() {
    let transport = Arc::new(RecordingTransport::default());
    let gateway = Gateway::builder(metadata(ChannelHint::Release))
        .probe(Arc::new(StaticProbe(true)))
        .storage(Some(Arc::new(MemoryStorage::new())))
        .transport(Arc::clone(&transport) as Arc<dyn Transport>)
        .build();

    gateway.setup(true);
    gateway.capture_error(&io::Error::new(io::ErrorKind::Other, "boom"));

    assert!(!gateway.is_enabled());
    assert!(gateway.install_id().is_none());
    assert!(transport.delivered.lock().unwrap().is_empty());
}

#[test]
fn unrecognized_build_keeps_fatal_events_local() {
    let transport = Arc::new(RecordingTransport::default());
    let meta = AppMetadata::new("com.example.fork", "1.0").with_channel_hint(ChannelHint::Release);
    let gateway = gateway(meta, Arc::clone(&transport));
    assert_eq!(gateway.channel(), BuildChannel::Unrecognized);

    gateway.setup(true);
    gateway.send("crash", Category::new("core"), Severity::Fatal, None);

    assert!(transport.delivered.lock().unwrap().is_empty());
    assert_eq!(gateway.breadcrumbs().len(), 1);
}

#[test]
fn concurrent_sends_are_all_accounted_for() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;
    const CAPACITY: usize = 100;

    let transport = Arc::new(RecordingTransport::default());
    let gateway = Gateway::builder(metadata(ChannelHint::Beta))
        .probe(Arc::new(StaticProbe(false)))
        .storage(None)
        .breadcrumb_capacity(CAPACITY)
        .transport(Arc::clone(&transport) as Arc<dyn Transport>)
        .build();
    gateway.setup(true);

    std::thread::scope(|s| {
        for t in 0..THREADS {
            let gateway = &gateway;
            s.spawn(move || {
                for i in 0..PER_THREAD {
                    let severity = if i % 10 == 0 {
                        Severity::Fatal
                    } else {
                        Severity::Info
                    };
                    gateway.send(format!("{t}-{i}"), Category::new("load"), severity, None);
                }
            });
        }
    });

    let transmitted = transport.delivered.lock().unwrap().len();
    let retained = THREADS * PER_THREAD - transmitted;
    assert_eq!(transmitted, THREADS * PER_THREAD / 10);
    assert_eq!(gateway.breadcrumbs().len(), retained.min(CAPACITY));
}

fn launch_in(dir: &std::path::Path) -> Gateway {
    Gateway::builder(metadata(ChannelHint::Release))
        .probe(Arc::new(StaticProbe(false)))
        .storage(None)
        .reports_dir(Some(dir.to_path_buf()))
        .build()
}

#[test]
fn unclean_exit_is_reported_on_next_launch() {
    let dir = tempfile::tempdir().unwrap();
    // Earlier process that died without shutdown and whose PID we inherited
    LaunchSentinel::for_pid(dir.path(), std::process::id()).arm();

    let first = launch_in(dir.path());
    assert!(!first.crashed_last_launch());
    first.setup(true);
    assert!(first.crashed_last_launch());
    first.shutdown();

    let second = launch_in(dir.path());
    second.setup(true);
    assert!(!second.crashed_last_launch());
}

#[test]
fn gateways_in_one_process_share_its_sentinel() {
    let dir = tempfile::tempdir().unwrap();

    let first = launch_in(dir.path());
    first.setup(true);
    let second = launch_in(dir.path());
    second.setup(true);
    assert!(!first.crashed_last_launch());
    assert!(!second.crashed_last_launch());
}

#[cfg(unix)]
#[test]
fn concurrent_process_is_not_mistaken_for_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let mut helper = std::process::Command::new("sleep")
        .arg("30")
        .spawn()
        .unwrap();
    let helper_sentinel = LaunchSentinel::for_pid(dir.path(), helper.id());
    helper_sentinel.arm();

    // Helper is still running: its sentinel is neither a crash nor ours to remove
    let app = launch_in(dir.path());
    app.setup(true);
    assert!(!app.crashed_last_launch());
    app.shutdown();
    assert!(helper_sentinel.path().exists());

    helper.kill().unwrap();
    helper.wait().unwrap();

    let next = launch_in(dir.path());
    next.setup(true);
    assert!(next.crashed_last_launch());
    assert!(!helper_sentinel.path().exists());
    next.shutdown();
}

#[test]
fn install_identifier_is_stable_across_launches() {
    let dir = tempfile::tempdir().unwrap();
    let launch = || {
        let gateway = Gateway::builder(metadata(ChannelHint::Release))
            .probe(Arc::new(StaticProbe(false)))
            .storage(Some(Arc::new(DirectoryStorage::new(dir.path()))))
            .build();
        gateway.setup(true);
        gateway.install_id().expect("identifier provisioned")
    };

    let first = launch();
    let second = launch();
    assert_eq!(first, second);
    assert_eq!(first.as_str().len(), 40);

    let stored = std::fs::read_to_string(dir.path().join(DEVICE_APP_HASH_KEY)).unwrap();
    assert_eq!(stored, first.as_str());
}

#[test]
fn missing_shared_container_still_activates() {
    let transport = Arc::new(RecordingTransport::default());
    let gateway = Gateway::builder(metadata(ChannelHint::Release))
        .probe(Arc::new(StaticProbe(false)))
        .storage(None)
        .transport(Arc::clone(&transport) as Arc<dyn Transport>)
        .build();

    gateway.setup(true);
    gateway.send("crash", Category::new("core"), Severity::Fatal, None);

    assert!(gateway.is_enabled());
    let delivered = transport.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].install_id.is_none());
}
