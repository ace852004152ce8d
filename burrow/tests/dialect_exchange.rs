//! Exchange-level tests for both dialects over a scripted resolver.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use burrow::{
    dialects::{minimal::MinimalDialect, mythic::MythicDialect, Dialect},
    encoding,
    messages::{HostProfile, Task},
    package::{self, PackageType},
    transport::{LookupClient, TxtExchange},
};

type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone)]
struct Script {
    log: Arc<Mutex<Vec<String>>>,
    respond: Responder,
}

impl Script {
    fn new(respond: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Script {
            log: Arc::new(Mutex::new(Vec::new())),
            respond: Arc::new(respond),
        }
    }

    fn queries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn client(&self) -> LookupClient {
        LookupClient::new(Box::new(self.clone())).with_attempts(1)
    }
}

#[async_trait]
impl TxtExchange for Script {
    async fn query(&self, name: &str) -> Option<String> {
        self.log.lock().unwrap().push(name.to_string());
        (self.respond)(name)
    }
}

fn profile() -> HostProfile {
    HostProfile {
        hostname: "ws-042".into(),
        username: "svc-backup".into(),
        os: "Windows 10.0 (Build 19045)".into(),
        ip: "192.168.35.10".into(),
        processes: vec!["explorer.exe".into(), "svchost.exe".into()],
        directory: "C:\\work".into(),
        pid: 4242,
        arch: "x86_64".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn minimal_pwd_exchange_end_to_end() {
    let encoded_result = encoding::encode(b"C:\\work");
    let script = Script::new(move |name| {
        if name == "cmd.agent-00000001.10.0.0.5" {
            return Some(encoding::encode(b"pwd"));
        }
        if name.starts_with("result.agent-00000001.") && name.ends_with(".10.0.0.5") {
            return Some("ACK".to_string());
        }
        None
    });

    let mut dialect = MinimalDialect::new(
        "agent-00000001".into(),
        "10.0.0.5".into(),
        script.client(),
    );

    let tasking = dialect.request_tasking().await.unwrap();
    assert_eq!(tasking.as_deref(), Some("pwd"));

    dialect.send_result("C:\\work").await.unwrap();

    let queries = script.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0], "cmd.agent-00000001.10.0.0.5");

    // result.<agent>.<result_id>.<chunk>.<address>, one query for a short result
    let rest = queries[1]
        .strip_prefix("result.agent-00000001.")
        .unwrap()
        .strip_suffix(".10.0.0.5")
        .unwrap();
    let (result_id, chunk) = rest.split_once('.').unwrap();
    assert_eq!(result_id.len(), 8);
    assert!(result_id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(chunk, encoded_result);
}

#[tokio::test(start_paused = true)]
async fn minimal_long_result_is_chunked_and_reassembles() {
    let script = Script::new(|name| name.starts_with("result.").then(|| "ACK".to_string()));
    let mut dialect =
        MinimalDialect::new("agent-7".into(), "10.0.0.5".into(), script.client());

    let long: String = "0123456789".repeat(13);
    dialect.send_result(&long).await.unwrap();

    let queries = script.queries();
    assert_eq!(queries.len(), 5, "130 bytes over 30-byte chunks");

    let mut reassembled = Vec::new();
    for name in &queries {
        let rest = name
            .strip_prefix("result.agent-7.")
            .unwrap()
            .strip_suffix(".10.0.0.5")
            .unwrap();
        let (_, chunk) = rest.split_once('.').unwrap();
        reassembled.extend(encoding::decode(chunk).unwrap());
    }
    assert_eq!(reassembled, long.as_bytes());
}

#[tokio::test(start_paused = true)]
async fn minimal_nack_stops_the_result_train() {
    let script = Script::new(|name| {
        name.starts_with("result.")
            .then(|| "RST".to_string())
    });
    let mut dialect =
        MinimalDialect::new("agent-7".into(), "10.0.0.5".into(), script.client());

    let long: String = "0123456789".repeat(13);
    assert!(dialect.send_result(&long).await.is_err());
    assert_eq!(script.queries().len(), 1, "no chunk after the first refusal");
}

#[tokio::test(start_paused = true)]
async fn minimal_tasking_decode_failure_is_idle_not_error() {
    let script = Script::new(|_| Some("!!not-an-encoding!!".to_string()));
    let mut dialect =
        MinimalDialect::new("agent-7".into(), "10.0.0.5".into(), script.client());

    assert!(dialect.request_tasking().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn minimal_silent_controller_means_no_tasking() {
    let script = Script::new(|_| None);
    let mut dialect =
        MinimalDialect::new("agent-7".into(), "10.0.0.5".into(), script.client());

    assert!(dialect.request_tasking().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn minimal_probe_accepts_any_nonempty_answer() {
    // Known permissive coupling: a controller that answers probe queries
    // with arbitrary text, even an error string, still reads as reachable.
    let script = Script::new(|name| {
        (name == "cmd.test-agent.10.0.0.5").then(|| "NO SUCH AGENT".to_string())
    });
    let dialect = MinimalDialect::new("agent-7".into(), "10.0.0.5".into(), script.client());

    assert!(dialect.probe().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn minimal_probe_fails_on_silence() {
    let script = Script::new(|_| None);
    let dialect = MinimalDialect::new("agent-7".into(), "10.0.0.5".into(), script.client());

    assert!(!dialect.probe().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn minimal_checkin_registers_then_ships_framed_profile() {
    let script = Script::new(|name| {
        if name.starts_with("register.") {
            return Some("agent-assigned".to_string());
        }
        name.starts_with("result.agent-assigned.checkin.")
            .then(|| "ACK".to_string())
    });
    let mut dialect =
        MinimalDialect::new("agent-7".into(), "10.0.0.5".into(), script.client());

    dialect.check_in(&profile()).await.unwrap();
    assert_eq!(dialect.agent_id(), "agent-assigned");

    let queries = script.queries();
    let register = &queries[0];
    let record = register
        .strip_prefix("register.")
        .unwrap()
        .strip_suffix(".10.0.0.5")
        .unwrap();
    assert_eq!(
        encoding::decode(record).unwrap(),
        b"host=ws-042;user=svc-backup"
    );

    // Check-in chunks reassemble into a sysinfo package holding the profile.
    let mut framed = Vec::new();
    for name in &queries[1..] {
        let rest = name
            .strip_prefix("result.agent-assigned.checkin.")
            .unwrap()
            .strip_suffix(".10.0.0.5")
            .unwrap();
        framed.extend(encoding::decode(rest).unwrap());
    }
    let (ty, body) = package::unpack(&framed).unwrap();
    assert_eq!(ty, PackageType::SysInfo);
    let shipped: HostProfile = serde_json::from_slice(&body).unwrap();
    assert_eq!(shipped.hostname, "ws-042");
    assert_eq!(shipped.pid, 4242);
}

#[tokio::test(start_paused = true)]
async fn minimal_heartbeat_unregister_and_config() {
    let config_answer = encoding::encode(b"sleep=30000;jitter=50");
    let script = Script::new(move |name| {
        if name.starts_with("heartbeat.agent-7.") || name.starts_with("unregister.agent-7.") {
            return Some("ACK".to_string());
        }
        (name == "config.agent-7.10.0.0.5").then(|| config_answer.clone())
    });
    let dialect = MinimalDialect::new("agent-7".into(), "10.0.0.5".into(), script.client());

    assert!(dialect.heartbeat(&profile()).await.unwrap());
    assert!(dialect.unregister().await.unwrap());
    assert_eq!(dialect.fetch_config().await.unwrap(), "sleep=30000;jitter=50");

    let queries = script.queries();
    let heartbeat = queries[0]
        .strip_prefix("heartbeat.agent-7.")
        .unwrap()
        .strip_suffix(".10.0.0.5")
        .unwrap();
    let record = encoding::decode(heartbeat).unwrap();
    let record = String::from_utf8(record).unwrap();
    assert!(record.starts_with("host=ws-042;user=svc-backup;time="));
}

#[tokio::test(start_paused = true)]
async fn mythic_checkin_carries_the_uuid() {
    let script = Script::new(|name| name.starts_with("checkin-").then(|| "ok".to_string()));
    let mut dialect = MythicDialect::new("10.0.0.5".into(), script.client());
    let uuid = dialect.uuid().to_string();

    dialect.check_in(&profile()).await.unwrap();

    let queries = script.queries();
    let encoded = queries[0]
        .strip_prefix("checkin-")
        .unwrap()
        .strip_suffix(".10.0.0.5")
        .unwrap();
    let body = encoding::decode(encoded).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["action"], "checkin");
    assert_eq!(value["host"], "ws-042");
    assert_eq!(value["uuid"], uuid.as_str());
}

#[tokio::test(start_paused = true)]
async fn mythic_tasking_response_cycle_echoes_the_task_id() {
    let task = Task {
        id: "task-1138".into(),
        command: "ls".into(),
        params: "C:\\work".into(),
    };
    let tasking_answer = encoding::encode(&serde_json::to_vec(&task).unwrap());
    let script = Script::new(move |name| {
        if name.starts_with("tasking-") {
            return Some(tasking_answer.clone());
        }
        name.starts_with("response-").then(|| "ACK".to_string())
    });

    let mut dialect = MythicDialect::new("10.0.0.5".into(), script.client());
    let uuid = dialect.uuid().to_string();

    let line = dialect.request_tasking().await.unwrap().unwrap();
    assert_eq!(line, "ls C:\\work");

    dialect.send_result("dir listing here").await.unwrap();

    let queries = script.queries();
    assert_eq!(queries[0], format!("tasking-{uuid}.10.0.0.5"));

    // response-<uuid>-<index>-<chunk>.<address>, indexes in order
    let mut payload = Vec::new();
    for (i, name) in queries[1..].iter().enumerate() {
        let rest = name
            .strip_prefix(&format!("response-{uuid}-"))
            .unwrap()
            .strip_suffix(".10.0.0.5")
            .unwrap();
        let (index, chunk) = rest.split_once('-').unwrap();
        assert_eq!(index, i.to_string());
        payload.extend(encoding::decode(chunk).unwrap());
    }

    let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(value["task_id"], "task-1138");
    assert_eq!(value["user_output"], "dir listing here");
    assert_eq!(value["completed"], true);
}

#[tokio::test(start_paused = true)]
async fn mythic_overwrites_the_task_slot_on_each_parse() {
    let answers = Arc::new(Mutex::new(vec![
        encoding::encode(&serde_json::to_vec(&Task {
            id: "task-1".into(),
            command: "pwd".into(),
            params: String::new(),
        }).unwrap()),
        encoding::encode(&serde_json::to_vec(&Task {
            id: "task-2".into(),
            command: "whoami".into(),
            params: String::new(),
        }).unwrap()),
    ]));
    let feed = Arc::clone(&answers);
    let script = Script::new(move |name| {
        if name.starts_with("tasking-") {
            let mut feed = feed.lock().unwrap();
            return Some(feed.remove(0));
        }
        name.starts_with("response-").then(|| "ACK".to_string())
    });

    let mut dialect = MythicDialect::new("10.0.0.5".into(), script.client());
    assert_eq!(dialect.request_tasking().await.unwrap().as_deref(), Some("pwd"));
    assert_eq!(
        dialect.request_tasking().await.unwrap().as_deref(),
        Some("whoami")
    );

    dialect.send_result("svc-backup").await.unwrap();

    let response_chunks: Vec<_> = script
        .queries()
        .into_iter()
        .filter(|q| q.starts_with("response-"))
        .collect();
    let uuid = dialect.uuid().to_string();
    let mut payload = Vec::new();
    for name in &response_chunks {
        let rest = name
            .strip_prefix(&format!("response-{uuid}-"))
            .unwrap()
            .strip_suffix(".10.0.0.5")
            .unwrap();
        let (_, chunk) = rest.split_once('-').unwrap();
        payload.extend(encoding::decode(chunk).unwrap());
    }
    let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(value["task_id"], "task-2");
}

#[tokio::test(start_paused = true)]
async fn mythic_malformed_tasking_is_idle_not_error() {
    let script = Script::new(|name| {
        name.starts_with("tasking-")
            .then(|| encoding::encode(b"{\"not\":\"a task\"}"))
    });
    let mut dialect = MythicDialect::new("10.0.0.5".into(), script.client());

    assert!(dialect.request_tasking().await.unwrap().is_none());
}
