//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Protocol tests against a live server on loopback

mod common;

use common::{TestClient, config, echo, start};
use rconix_rconcodec::consts::{
    AUTH_FAILURE_ID, MAX_BODY_SIZE, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE,
    SERVERDATA_RESPONSE_VALUE,
};
use rconix_service::Packet;

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_correct_password_is_acknowledged() {
    let server = start(config(), echo);
    let mut client = TestClient::connect(server.local_addr()).await;

    client.send(Packet::auth(42, "secret")).await;

    let response = client.recv().await.unwrap();
    assert_eq!(response.kind, SERVERDATA_AUTH_RESPONSE);
    assert_eq!(response.id, 42);
    assert!(response.body.is_empty());

    let ack = client.recv().await.unwrap();
    assert_eq!(ack.kind, SERVERDATA_RESPONSE_VALUE);
    assert_eq!(ack.id, 42);

    assert_eq!(client.exec(43, "ping").await, "ping");
}

#[tokio::test]
async fn test_auth_ack_disabled() {
    let server = start(config().with_auth_ack(false), echo);
    let mut client = TestClient::connect(server.local_addr()).await;

    client.send(Packet::auth(1, "secret")).await;
    assert_eq!(client.recv().await.unwrap(), Packet::auth_response(1));

    // The next packet is already the command response.
    assert_eq!(client.exec(2, "next").await, "next");
}

#[tokio::test]
async fn test_wrong_password_is_rejected_and_closed() {
    let server = start(config(), echo);

    for password in ["", "Secret", "secret ", "wrong"] {
        let mut client = TestClient::connect(server.local_addr()).await;
        client.send(Packet::auth(5, password)).await;

        let response = client.recv().await.unwrap();
        assert_eq!(response.kind, SERVERDATA_AUTH_RESPONSE);
        assert_eq!(response.id, AUTH_FAILURE_ID);
        client.assert_closed().await;
    }
}

#[tokio::test]
async fn test_exec_before_auth_is_rejected() {
    let server = start(config(), echo);

    for body in ["", "status", "secret", "say hello world"] {
        let mut client = TestClient::connect(server.local_addr()).await;
        client.send(Packet::exec_command(9, body)).await;

        let response = client.recv().await.unwrap();
        assert_eq!(response.id, AUTH_FAILURE_ID);
        client.assert_closed().await;
    }
}

#[tokio::test]
async fn test_second_auth_closes_session() {
    let server = start(config(), echo);
    let mut client = TestClient::connect(server.local_addr()).await;
    client.authenticate(1).await;

    client.send(Packet::auth(2, "secret")).await;
    assert_eq!(client.recv().await.unwrap().id, AUTH_FAILURE_ID);
    client.assert_closed().await;
}

// ============================================================================
// Framing
// ============================================================================

#[tokio::test]
async fn test_packets_split_across_writes() {
    let server = start(config(), echo);
    let mut client = TestClient::connect(server.local_addr()).await;

    let bytes = Packet::auth(3, "secret").to_bytes().unwrap();
    for chunk in bytes.chunks(3) {
        client.send_raw(chunk).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(client.recv().await.unwrap(), Packet::auth_response(3));
    assert_eq!(client.recv().await.unwrap(), Packet::response_value(3, ""));
}

#[tokio::test]
async fn test_pipelined_commands_answered_in_order() {
    let server = start(config(), echo);
    let mut client = TestClient::connect(server.local_addr()).await;
    client.authenticate(1).await;

    let mut bytes = Vec::new();
    for id in 10..15 {
        bytes.extend_from_slice(&Packet::exec_command(id, format!("cmd {id}")).to_bytes().unwrap());
    }
    client.send_raw(&bytes).await;

    for id in 10..15 {
        let response = client.recv().await.unwrap();
        assert_eq!(response.id, id);
        assert_eq!(response.body, format!("cmd {id}"));
    }
}

#[tokio::test]
async fn test_malformed_frame_before_auth_gets_failure() {
    let server = start(config(), echo);
    let mut client = TestClient::connect(server.local_addr()).await;

    // size 10, but the payload carries no NUL terminator
    let mut frame = 10i32.to_le_bytes().to_vec();
    frame.extend_from_slice(&1i32.to_le_bytes());
    frame.extend_from_slice(&SERVERDATA_AUTH.to_le_bytes());
    frame.extend_from_slice(b"ab");
    client.send_raw(&frame).await;

    assert_eq!(client.recv().await.unwrap().id, AUTH_FAILURE_ID);
    client.assert_closed().await;
}

#[tokio::test]
async fn test_password_followed_by_extra_bytes_is_rejected() {
    let server = start(config(), echo);
    let mut client = TestClient::connect(server.local_addr()).await;

    let payload = b"secret\0junk\0\0";
    let mut frame = ((payload.len() + 8) as i32).to_le_bytes().to_vec();
    frame.extend_from_slice(&1i32.to_le_bytes());
    frame.extend_from_slice(&SERVERDATA_AUTH.to_le_bytes());
    frame.extend_from_slice(payload);
    client.send_raw(&frame).await;

    assert_eq!(client.recv().await.unwrap().id, AUTH_FAILURE_ID);
    client.assert_closed().await;
}

#[tokio::test]
async fn test_single_terminator_body_over_ceiling_is_rejected() {
    let server = start(config(), echo);
    let mut client = TestClient::connect(server.local_addr()).await;
    client.authenticate(1).await;

    // The size prefix stays within bounds because only one NUL follows.
    let body = "c".repeat(MAX_BODY_SIZE + 1);
    let mut frame = ((body.len() + 9) as i32).to_le_bytes().to_vec();
    frame.extend_from_slice(&2i32.to_le_bytes());
    frame.extend_from_slice(&2i32.to_le_bytes());
    frame.extend_from_slice(body.as_bytes());
    frame.push(0);
    client.send_raw(&frame).await;

    client.assert_closed().await;
}

#[tokio::test]
async fn test_negative_size_closes_without_response() {
    let server = start(config(), echo);
    let mut client = TestClient::connect(server.local_addr()).await;

    client.send_raw(&(-5i32).to_le_bytes()).await;
    client.assert_closed().await;
}

#[tokio::test]
async fn test_body_at_ceiling_accepted_one_over_rejected() {
    let server = start(config().with_strip_formatting(false), echo);
    let mut client = TestClient::connect(server.local_addr()).await;
    client.authenticate(1).await;

    let at_ceiling = "a".repeat(MAX_BODY_SIZE);
    assert_eq!(client.exec(2, &at_ceiling).await, at_ceiling);

    // Packet::to_bytes refuses an oversized body, so build it by hand.
    let body = "b".repeat(MAX_BODY_SIZE + 1);
    let mut frame = ((body.len() + 10) as i32).to_le_bytes().to_vec();
    frame.extend_from_slice(&3i32.to_le_bytes());
    frame.extend_from_slice(&2i32.to_le_bytes());
    frame.extend_from_slice(body.as_bytes());
    frame.extend_from_slice(&[0, 0]);
    client.send_raw(&frame).await;

    client.assert_closed().await;
}

// ============================================================================
// Responses
// ============================================================================

#[tokio::test]
async fn test_large_response_is_split_with_terminator() {
    let text: String = "line of output ünïcode\n".repeat(800);
    let expected = text.clone();
    let server = start(config(), move |_: &str| text.clone());
    let mut client = TestClient::connect(server.local_addr()).await;
    client.authenticate(1).await;

    client.send(Packet::exec_command(77, "dump")).await;

    let mut bodies = Vec::new();
    loop {
        let packet = client.recv().await.unwrap();
        assert_eq!(packet.kind, SERVERDATA_RESPONSE_VALUE);
        assert_eq!(packet.id, 77);
        if packet.body.is_empty() {
            break;
        }
        assert!(packet.body.len() <= MAX_BODY_SIZE);
        bodies.push(packet.body);
    }

    assert!(bodies.len() > 1);
    assert_eq!(bodies.concat(), expected);
}

#[tokio::test]
async fn test_formatting_is_stripped() {
    let server = start(config(), |_: &str| "§aThere are §c3§r players".to_string());
    let mut client = TestClient::connect(server.local_addr()).await;
    client.authenticate(1).await;

    assert_eq!(client.exec(2, "list").await, "There are 3 players");
}

#[tokio::test]
async fn test_executor_panic_becomes_error_text() {
    let server = start(config(), |command: &str| -> String {
        if command == "crash" {
            panic!("handler exploded");
        }
        "fine".to_string()
    });
    let mut client = TestClient::connect(server.local_addr()).await;
    client.authenticate(1).await;

    let response = client.exec(2, "crash").await;
    assert!(response.contains("handler exploded"));

    // The session and the server survive.
    assert_eq!(client.exec(3, "again").await, "fine");
}
