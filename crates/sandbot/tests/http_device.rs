use std::io::Read;
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use sandbot::command::MotionCommand;
use sandbot::device::{DeviceRequest, DeviceTransport, HttpDevice};
use sandbot::SandbotError;
use tiny_http::{Header, Response, Server};

/// Request as the loopback robot received it.
struct Captured {
    method: String,
    url: String,
    content_type: Option<String>,
    body: String,
}

fn reserve_loopback_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let port = listener.local_addr().expect("read local addr").port();
    drop(listener);
    port
}

fn start_robot() -> (String, Receiver<Captured>) {
    let port = reserve_loopback_port();
    let listen = format!("127.0.0.1:{port}");
    let server = Server::http(&listen).expect("start loopback robot");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let content_type = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Content-Type"))
                .map(|header| header.value.to_string());
            let url = request.url().to_string();
            let _ = tx.send(Captured {
                method: request.method().to_string(),
                url: url.clone(),
                content_type,
                body,
            });
            let json = Header::from_bytes("Content-Type", "application/json").expect("header");
            let response = match url.as_str() {
                "/status" => Response::from_string(r#"{"XYZ":[1,2,0],"Qd":0,"pause":0}"#)
                    .with_header(json),
                "/exec/G28" => Response::from_string("busy").with_status_code(503),
                "/uploadtofileman" => Response::from_string(r#"{"rslt":"ok"}"#).with_header(json),
                _ => Response::from_string("").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });
    (listen, rx)
}

#[test]
fn get_returns_body_of_successful_reply() {
    let (host, rx) = start_robot();
    let device = HttpDevice::with_timeout(Duration::from_secs(5));
    let reply = device.request(&host, &DeviceRequest::status()).unwrap();
    assert_eq!(reply.status, 200);
    assert_eq!(reply.json().unwrap()["XYZ"][1], 2);
    let captured = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(captured.method, "GET");
    assert_eq!(captured.url, "/status");
}

#[test]
fn non_success_status_is_a_device_rejection() {
    let (host, _rx) = start_robot();
    let device = HttpDevice::with_timeout(Duration::from_secs(5));
    let err = device
        .request(&host, &DeviceRequest::exec(MotionCommand::Home))
        .unwrap_err();
    assert_eq!(
        err,
        SandbotError::DeviceRejected {
            action: "home".into(),
            reason: "HTTP 503: busy".into(),
        }
    );

    let err = device
        .request(&host, &DeviceRequest::play_file("sd", "nope.thr"))
        .unwrap_err();
    assert_eq!(
        err,
        SandbotError::DeviceRejected {
            action: "play".into(),
            reason: "HTTP 404".into(),
        }
    );
}

#[test]
fn upload_is_multipart_with_file_field() {
    let (host, rx) = start_robot();
    let device = HttpDevice::with_timeout(Duration::from_secs(5));
    device
        .request(&host, &DeviceRequest::upload("evening.seq", "a.thr\nb.thr"))
        .unwrap();
    let captured = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.url, "/uploadtofileman");
    let content_type = captured.content_type.unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert!(captured
        .body
        .contains("name=\"file\"; filename=\"evening.seq\""));
    assert!(captured.body.contains("a.thr\nb.thr"));
}

#[test]
fn unreachable_robot_is_a_transport_error() {
    let port = reserve_loopback_port();
    let device = HttpDevice::with_timeout(Duration::from_secs(2));
    let err = device
        .request(&format!("127.0.0.1:{port}"), &DeviceRequest::status())
        .unwrap_err();
    assert!(matches!(err, SandbotError::Transport(_)));
    assert!(err.is_link_failure());
}

#[test]
fn missing_host_is_a_precondition() {
    let device = HttpDevice::new();
    let err = device.request("  ", &DeviceRequest::status()).unwrap_err();
    assert!(matches!(err, SandbotError::Precondition(_)));
}
