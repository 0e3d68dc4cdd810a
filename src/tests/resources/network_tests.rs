use super::{NODE, create_test_client, mount_finished_task, task_status_path, upid};
use crate::{Netmask, NetworkRequest, NetworkType, Patch, ProxmoxError, TaskFailure};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

const NETWORK_PATH: &str = "/api2/json/nodes/pve/network";

async fn mount_reload(mock_server: &MockServer, upid: &str, times: u64) {
    Mock::given(method("PUT"))
        .and(path(NETWORK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": upid
        })))
        .expect(times)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_networks_list() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(NETWORK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {
                    "iface": "vmbr0",
                    "type": "bridge",
                    "method": "static",
                    "families": ["inet"],
                    "address": "192.168.1.10",
                    "netmask": "24",
                    "cidr": "192.168.1.10/24",
                    "gateway": "192.168.1.1",
                    "bridge_ports": "eno1",
                    "autostart": 1,
                    "active": 1,
                    "priority": 4
                },
                {
                    "iface": "eno1",
                    "type": "eth",
                    "method": "manual",
                    "families": ["inet"],
                    "active": 1,
                    "exists": 1,
                    "priority": 3
                }
            ]
        })))
        .mount(&mock_server)
        .await;

    let networks = proxmox_client.networks(NODE).await.unwrap();
    assert_eq!(networks.len(), 2);

    let bridge = &networks[0];
    assert_eq!(bridge.iface, "vmbr0");
    assert_eq!(bridge.network_type, NetworkType::Bridge);
    assert_eq!(bridge.netmask.map(Netmask::to_dotted).as_deref(), Some("255.255.255.0"));
    assert_eq!(bridge.gateway.as_deref(), Some("192.168.1.1"));
    assert_eq!(bridge.autostart, Some(true));

    let eth = &networks[1];
    assert_eq!(eth.network_type, NetworkType::Eth);
    assert_eq!(eth.address, None);
    assert_eq!(eth.autostart, None);
}

#[tokio::test]
async fn test_network_fills_missing_iface() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/vmbr1", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"type": "bridge", "method": "manual", "families": ["inet"]}
        })))
        .mount(&mock_server)
        .await;

    let network = proxmox_client.network(NODE, "vmbr1").await.unwrap();
    assert_eq!(network.iface, "vmbr1");
    assert_eq!(network.network_type, NetworkType::Bridge);
}

#[tokio::test]
async fn test_create_then_delete_bridge() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let reload = upid("srvreload", "networking");

    Mock::given(method("POST"))
        .and(path(NETWORK_PATH))
        .and(body_json(serde_json::json!({"iface": "vmbr99", "type": "bridge"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_reload(&mock_server, &reload, 2).await;
    mount_finished_task(&mock_server, &reload, "OK").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/vmbr99", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "type": "bridge",
                "method": "manual",
                "families": ["inet"],
                "autostart": 1,
                "active": 1
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/vmbr99", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(NETWORK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"iface": "vmbr0", "type": "bridge"}]
        })))
        .mount(&mock_server)
        .await;

    let request = NetworkRequest::new("vmbr99", NetworkType::Bridge);
    let created = proxmox_client.create_network(NODE, &request).await.unwrap();
    assert_eq!(created.iface, "vmbr99");
    assert_eq!(created.active, Some(true));

    proxmox_client.delete_network(NODE, "vmbr99").await.unwrap();

    let remaining = proxmox_client.networks(NODE).await.unwrap();
    assert!(remaining.iter().all(|n| n.iface != "vmbr99"));
}

#[tokio::test]
async fn test_create_sends_netmask_as_prefix() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let reload = upid("srvreload", "networking");

    Mock::given(method("POST"))
        .and(path(NETWORK_PATH))
        .and(body_json(serde_json::json!({
            "iface": "vmbr1",
            "type": "bridge",
            "address": "10.0.0.2",
            "netmask": "16",
            "autostart": 0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_reload(&mock_server, &reload, 1).await;
    mount_finished_task(&mock_server, &reload, "OK").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/vmbr1", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"type": "bridge", "address": "10.0.0.2", "netmask": "16", "autostart": 0}
        })))
        .mount(&mock_server)
        .await;

    let request = NetworkRequest::new("vmbr1", NetworkType::Bridge)
        .with_ipv4("10.0.0.2", Netmask::from_dotted("255.255.0.0").unwrap())
        .with_autostart(false);
    let created = proxmox_client.create_network(NODE, &request).await.unwrap();

    assert_eq!(created.netmask.unwrap().to_dotted(), "255.255.0.0");
    assert_eq!(created.autostart, Some(false));
}

#[tokio::test]
async fn test_update_comments_leaves_other_fields_alone() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let reload = upid("srvreload", "networking");

    Mock::given(method("PUT"))
        .and(path(format!("{}/vmbr0", NETWORK_PATH)))
        .and(body_json(serde_json::json!({"type": "bridge", "comments": "uplink"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_reload(&mock_server, &reload, 1).await;
    mount_finished_task(&mock_server, &reload, "OK").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/vmbr0", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "type": "bridge",
                "address": "192.168.1.10",
                "netmask": "24",
                "gateway": "192.168.1.1",
                "bridge_ports": "eno1",
                "autostart": 1,
                "comments": "uplink\n"
            }
        })))
        .mount(&mock_server)
        .await;

    let request = NetworkRequest::new("vmbr0", NetworkType::Bridge).with_comments("uplink");
    let updated = proxmox_client.update_network(NODE, &request).await.unwrap();

    assert_eq!(updated.autostart, Some(true));
    assert_eq!(updated.gateway.as_deref(), Some("192.168.1.1"));
    assert_eq!(updated.bridge_ports.as_deref(), Some("eno1"));
}

#[tokio::test]
async fn test_update_clears_fields_through_delete() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let reload = upid("srvreload", "networking");

    Mock::given(method("PUT"))
        .and(path(format!("{}/vmbr0", NETWORK_PATH)))
        .and(body_json(serde_json::json!({
            "type": "bridge",
            "mtu": 0,
            "delete": "comments,gateway"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_reload(&mock_server, &reload, 1).await;
    mount_finished_task(&mock_server, &reload, "OK").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/vmbr0", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"type": "bridge", "autostart": 1}
        })))
        .mount(&mock_server)
        .await;

    // an explicit zero is a value, not a reset
    let request = NetworkRequest {
        gateway: Patch::Clear,
        comments: Patch::Clear,
        mtu: Patch::Set(0),
        ..NetworkRequest::new("vmbr0", NetworkType::Bridge)
    };
    let updated = proxmox_client.update_network(NODE, &request).await.unwrap();
    assert_eq!(updated.gateway, None);
}

#[tokio::test]
async fn test_failed_reload_is_reported_with_context() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let reload = upid("srvreload", "networking");

    Mock::given(method("DELETE"))
        .and(path(format!("{}/vmbr99", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
        .mount(&mock_server)
        .await;
    mount_reload(&mock_server, &reload, 1).await;
    mount_finished_task(&mock_server, &reload, "ifreload failed: exit code 1").await;

    let err = proxmox_client
        .delete_network(NODE, "vmbr99")
        .await
        .unwrap_err();

    match &err {
        ProxmoxError::Operation {
            operation,
            resource,
            ..
        } => {
            assert_eq!(*operation, "delete_network");
            assert_eq!(resource, "pve/vmbr99");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    match err.root_cause() {
        ProxmoxError::TaskFailed { upid, reason } => {
            assert_eq!(upid, &reload);
            assert_eq!(
                reason,
                &TaskFailure::ExitStatus("ifreload failed: exit code 1".to_string())
            );
        }
        other => panic!("unexpected root cause: {:?}", other),
    }
}

#[tokio::test]
async fn test_reload_waits_for_running_task() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let reload = upid("srvreload", "networking");

    mount_reload(&mock_server, &reload, 1).await;
    Mock::given(method("GET"))
        .and(path(task_status_path(&reload)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"upid": reload, "node": NODE, "status": "running"}
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_finished_task(&mock_server, &reload, "OK").await;

    proxmox_client.reload_network(NODE).await.unwrap();
}

#[tokio::test]
async fn test_reload_without_task_id_fails() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/vmbr99", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path(NETWORK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = proxmox_client
        .delete_network(NODE, "vmbr99")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProxmoxError::Operation {
            operation: "delete_network",
            ..
        }
    ));
    assert!(matches!(err.root_cause(), ProxmoxError::Decode(_)));
}

#[tokio::test]
async fn test_interface_names_are_encoded_in_paths() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/vmbr0%2F..%3Fx", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"type": "bridge"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let network = proxmox_client.network(NODE, "vmbr0/..?x").await.unwrap();
    assert_eq!(network.iface, "vmbr0/..?x");
}

#[tokio::test]
async fn test_create_rejects_empty_iface() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("POST"))
        .and(path(NETWORK_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = NetworkRequest::new(" ", NetworkType::Bridge);
    let err = proxmox_client
        .create_network(NODE, &request)
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), ProxmoxError::Validation(_)));
}

#[tokio::test]
async fn test_missing_interface_keeps_remote_message() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/vmbr7", NETWORK_PATH)))
        .respond_with(ResponseTemplate::new(500).set_body_string(
            "{\"data\":null,\"message\":\"interface 'vmbr7' does not exist\\n\"}",
        ))
        .mount(&mock_server)
        .await;

    let err = proxmox_client.network(NODE, "vmbr7").await.unwrap_err();
    assert!(err.to_string().contains("get_network on 'pve/vmbr7'"));
    match err.root_cause() {
        ProxmoxError::Request { status, body } => {
            assert_eq!(*status, 500);
            assert!(body.contains("does not exist"));
        }
        other => panic!("unexpected root cause: {:?}", other),
    }
}
