#![allow(dead_code)]

pub mod mock_asr;
pub mod mock_services;
pub mod mock_tts;

use lala::assistant::{AssistantOptions, AssistantServices, LalaAssistant};
use lala::bridge::{DeviceAdapter, SimulatedBridge};
use mock_asr::MockRecognizer;
use mock_services::{MockPlanner, MockRouter};
use mock_tts::MockTts;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use std::{fs, thread};
use tempfile::TempDir;

/// Assistant wired to mocks, with handles to every mock
pub struct Harness {
    pub assistant: LalaAssistant,
    pub bridge: Arc<SimulatedBridge>,
    pub recognizer: Arc<MockRecognizer>,
    pub planner: Arc<MockPlanner>,
    pub router: Arc<MockRouter>,
    pub tts: Arc<MockTts>,
    pub temp_dir: TempDir,
}

impl Harness {
    pub fn new(
        recognizer: MockRecognizer,
        planner: MockPlanner,
        router: MockRouter,
        options: AssistantOptions,
    ) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bridge = Arc::new(SimulatedBridge::new());
        let recognizer = Arc::new(recognizer);
        let planner = Arc::new(planner);
        let router = Arc::new(router);
        let tts = Arc::new(MockTts::new());

        let device = DeviceAdapter::new(
            bridge.clone(),
            recognizer.clone(),
            tts.clone(),
            temp_dir.path(),
            options.prefer_offline,
        )
        .expect("Failed to create device adapter");

        let assistant = LalaAssistant::new(
            options,
            AssistantServices {
                device: Arc::new(device),
                planner: planner.clone(),
                router: router.clone(),
            },
        );

        Self {
            assistant,
            bridge,
            recognizer,
            planner,
            router,
            tts,
            temp_dir,
        }
    }
}

/// Options with short background timings
pub fn fast_options() -> AssistantOptions {
    AssistantOptions {
        listen_interval: Duration::from_millis(20),
        join_timeout: Duration::from_millis(300),
        error_backoff: Duration::from_millis(20),
        ..AssistantOptions::default()
    }
}

/// A `lala daemon` process isolated in a temp dir
pub struct TestContext {
    pub temp_dir: TempDir,
    pub child: Child,
    pub socket_path: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bin_path = env!("CARGO_BIN_EXE_lala");

        let config_dir = temp_dir.path().join("config");
        let data_dir = temp_dir.path().join("data");

        fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        fs::create_dir_all(&data_dir).expect("Failed to create data dir");

        // Unique user name isolates the socket path between tests
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        let test_user = format!("lala_test_{}", nanos);

        let child = Command::new(bin_path)
            .args(["--demo", "daemon", "--no-listen"])
            .env("XDG_CONFIG_HOME", &config_dir)
            .env("XDG_DATA_HOME", &data_dir)
            .env("USER", &test_user)
            .env_remove("LALA_CONFIG")
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .expect("Failed to spawn lala daemon");

        let socket_path = PathBuf::from(format!("/tmp/lala-{}.sock", test_user));

        let ctx = TestContext {
            temp_dir,
            child,
            socket_path,
        };

        ctx.wait_for_socket();
        ctx
    }

    fn wait_for_socket(&self) {
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_secs(10) {
            if self.socket_path.exists() {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
        panic!("Timed out waiting for socket at {:?}", self.socket_path);
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = fs::remove_file(&self.socket_path);
    }
}
