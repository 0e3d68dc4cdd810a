use super::{NODE, create_test_client, create_test_client_with, mount_finished_task, upid};
use crate::{
    ClientConfig, InternalDataStorage, Patch, ProxmoxError, VirtualMachineRequest,
};
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

const QEMU_PATH: &str = "/api2/json/nodes/pve/qemu";

fn config_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "data": {
            "name": "web",
            "cores": 2,
            "sockets": 1,
            "memory": "2048",
            "ostype": "l26",
            "scsihw": "virtio-scsi-single",
            "boot": "order=scsi0;ide2;net0",
            "digest": "3b2f6c0a5e",
            "ide0": "local-lvm:vm-100-disk-1,size=32G",
            "ide2": "local:iso/ubuntu-24.04.1-live-server-amd64.iso,media=cdrom,size=2690412K",
            "scsi0": "local-lvm:vm-100-disk-0,iothread=1,size=16G",
            "net0": "virtio=BC:24:11:2E:4F:01,bridge=vmbr0,firewall=1"
        }
    }))
}

#[tokio::test]
async fn test_vms_list_success() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(QEMU_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {
                    "vmid": 100,
                    "name": "ubuntu-vm",
                    "status": "running",
                    "cpu": 0.23,
                    "cpus": 4,
                    "mem": 4294967296_i64,
                    "maxmem": 8589934592_i64,
                    "disk": 0,
                    "maxdisk": 42949672960_i64,
                    "uptime": 123456,
                    "tags": "ubuntu;production"
                },
                {
                    "vmid": "101",
                    "status": "stopped",
                    "cpus": 8,
                    "maxmem": 17179869184_i64
                }
            ]
        })))
        .mount(&mock_server)
        .await;

    let vms = proxmox_client.vms(NODE).await.unwrap();
    assert_eq!(vms.len(), 2);

    let vm1 = &vms[0];
    assert_eq!(vm1.vmid, 100);
    assert_eq!(vm1.name.as_deref(), Some("ubuntu-vm"));
    assert_eq!(vm1.status, "running");
    assert_eq!(vm1.cpu, Some(0.23));
    assert_eq!(vm1.cpus, Some(4));
    assert_eq!(vm1.mem, Some(4294967296));
    assert_eq!(vm1.uptime, Some(123456));
    assert_eq!(vm1.tags.as_deref(), Some("ubuntu;production"));

    let vm2 = &vms[1];
    assert_eq!(vm2.vmid, 101);
    assert_eq!(vm2.name, None);
    assert_eq!(vm2.cpu, None);
    assert_eq!(vm2.maxmem, Some(17179869184));
}

#[tokio::test]
async fn test_vm_config_decodes_devices() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/100/config", QEMU_PATH)))
        .respond_with(config_response())
        .mount(&mock_server)
        .await;

    let vm = proxmox_client.vm(NODE, 100).await.unwrap();
    assert_eq!(vm.vmid, 100);
    assert_eq!(vm.name.as_deref(), Some("web"));
    assert_eq!(vm.cores, Some(2));
    assert_eq!(vm.memory, Some(2048));
    assert_eq!(vm.ide_devices.len(), 2);

    let cdrom = vm.ide(2).unwrap();
    assert_eq!(cdrom.storage, "local");
    assert_eq!(
        cdrom.path.as_deref(),
        Some("iso/ubuntu-24.04.1-live-server-amd64.iso")
    );
    assert_eq!(cdrom.media.as_deref(), Some("cdrom"));
    assert_eq!(cdrom.size.as_deref(), Some("2690412K"));

    assert_eq!(vm.ide(0).unwrap().path.as_deref(), Some("vm-100-disk-1"));
    assert_eq!(
        vm.scsi.get(&0).map(String::as_str),
        Some("local-lvm:vm-100-disk-0,iothread=1,size=16G")
    );
    assert!(vm.net.get(&0).unwrap().contains("bridge=vmbr0"));
}

#[tokio::test]
async fn test_vm_status_running() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/100/status/current", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "status": "running",
                "vmid": 100,
                "name": "web",
                "qmpstatus": "running",
                "cpu": 0.05,
                "mem": 1073741824_i64,
                "maxmem": 2147483648_i64,
                "uptime": 3600,
                "pid": 4242,
                "running-qemu": "9.0.2"
            }
        })))
        .mount(&mock_server)
        .await;

    let status = proxmox_client.vm_status(NODE, 100).await.unwrap();
    assert!(!status.is_stopped());
    assert_eq!(status.qmpstatus.as_deref(), Some("running"));
    assert_eq!(status.pid, Some(4242));
    assert_eq!(status.running_qemu.as_deref(), Some("9.0.2"));
}

#[tokio::test]
async fn test_start_vm_returns_task_id() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let start = upid("qmstart", "100");

    Mock::given(method("POST"))
        .and(path(format!("{}/100/status/start", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": start
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let task_id = proxmox_client.start_vm(NODE, 100).await.unwrap();
    assert_eq!(task_id, start);
}

#[tokio::test]
async fn test_create_vm_with_ide_devices() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let create = upid("qmcreate", "100");

    Mock::given(method("POST"))
        .and(path(QEMU_PATH))
        .and(body_json(serde_json::json!({
            "vmid": 100,
            "name": "web",
            "cores": 2,
            "memory": 2048,
            "ide0": "local-lvm:32",
            "ide2": "local:iso/ubuntu-24.04.1-live-server-amd64.iso,media=cdrom",
            "net0": "virtio,bridge=vmbr0"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": create
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_finished_task(&mock_server, &create, "OK").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/100/config", QEMU_PATH)))
        .respond_with(config_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = VirtualMachineRequest {
        name: Patch::Set("web".to_string()),
        ..VirtualMachineRequest::new(100)
    }
    .with_cores(2)
    .with_memory(2048)
    .with_ide(InternalDataStorage::new_volume(0, "local-lvm", 32))
    .with_ide(InternalDataStorage::cdrom(
        2,
        "local",
        "iso/ubuntu-24.04.1-live-server-amd64.iso",
    ))
    .with_net(0, "virtio,bridge=vmbr0");

    let vm = proxmox_client
        .create_vm(NODE, &request, false)
        .await
        .unwrap();
    assert_eq!(vm.vmid, 100);
    assert_eq!(vm.ide_devices.len(), 2);
}

#[tokio::test]
async fn test_create_vm_and_start() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let create = upid("qmcreate", "100");
    let start = upid("qmstart", "100");

    Mock::given(method("POST"))
        .and(path(QEMU_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": create
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/100/status/start", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": start
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_finished_task(&mock_server, &create, "OK").await;
    mount_finished_task(&mock_server, &start, "OK").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/100/config", QEMU_PATH)))
        .respond_with(config_response())
        .mount(&mock_server)
        .await;

    let request = VirtualMachineRequest::new(100).with_cores(2);
    proxmox_client
        .create_vm(NODE, &request, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_vm_rejects_fifth_ide_device() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("POST"))
        .and(path(QEMU_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut request = VirtualMachineRequest::new(100);
    for slot in 0..5 {
        request = request.with_ide(InternalDataStorage::new_volume(slot, "local-lvm", 8));
    }

    let err = proxmox_client
        .create_vm(NODE, &request, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxmoxError::Operation { operation: "create_vm", .. }));
    assert!(matches!(err.root_cause(), ProxmoxError::Validation(_)));
}

#[tokio::test]
async fn test_create_vm_rejects_out_of_range_slot() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("POST"))
        .and(path(QEMU_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = VirtualMachineRequest::new(100)
        .with_ide(InternalDataStorage::existing(4, "local-lvm", "vm-100-disk-1"));
    let err = proxmox_client
        .create_vm(NODE, &request, false)
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), ProxmoxError::Validation(_)));
}

#[tokio::test]
async fn test_update_vm_detaches_and_clears() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;

    Mock::given(method("PUT"))
        .and(path(format!("{}/100/config", QEMU_PATH)))
        .and(body_json(serde_json::json!({
            "cores": 4,
            "delete": "name,ide2,net1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/100/config", QEMU_PATH)))
        .respond_with(config_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut request = VirtualMachineRequest {
        name: Patch::Clear,
        ..VirtualMachineRequest::new(100)
    }
    .with_cores(4)
    .detach_ide(2);
    request.net.insert(1, Patch::Clear);

    proxmox_client.update_vm(NODE, &request).await.unwrap();
}

#[tokio::test]
async fn test_delete_running_vm_stops_it_first() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let stop = upid("qmstop", "100");
    let destroy = upid("qmdestroy", "100");

    // running, then still running right after the stop task, then stopped
    Mock::given(method("GET"))
        .and(path(format!("{}/100/status/current", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"status": "running", "vmid": 100}
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/100/status/current", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"status": "stopped", "vmid": 100}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/100/status/stop", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": stop
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/100", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": destroy
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_finished_task(&mock_server, &stop, "OK").await;
    mount_finished_task(&mock_server, &destroy, "OK").await;

    proxmox_client.delete_vm(NODE, 100).await.unwrap();
}

#[tokio::test]
async fn test_delete_stopped_vm_skips_stop() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let destroy = upid("qmdestroy", "100");

    Mock::given(method("GET"))
        .and(path(format!("{}/100/status/current", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"status": "stopped", "vmid": 100}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/100/status/stop", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/100", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": destroy
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_finished_task(&mock_server, &destroy, "OK").await;

    proxmox_client.delete_vm(NODE, 100).await.unwrap();
}

#[tokio::test]
async fn test_delete_gives_up_when_vm_never_stops() {
    let mock_server = MockServer::start().await;
    let config = ClientConfig::default()
        .with_task_poll_interval(Duration::from_millis(5))
        .with_task_timeout(Some(Duration::from_millis(60)));
    let proxmox_client = create_test_client_with(&mock_server, config).await;
    let stop = upid("qmstop", "100");

    Mock::given(method("GET"))
        .and(path(format!("{}/100/status/current", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"status": "running", "vmid": 100}
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/100/status/stop", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": stop
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/100", QEMU_PATH)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_finished_task(&mock_server, &stop, "OK").await;

    let err = proxmox_client.delete_vm(NODE, 100).await.unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ProxmoxError::TaskTimeout { upid, .. } if *upid == stop
    ));
}

#[tokio::test]
async fn test_clone_vm() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let clone = upid("qmclone", "100");

    Mock::given(method("POST"))
        .and(path(format!("{}/100/clone", QEMU_PATH)))
        .and(body_json(serde_json::json!({"newid": 200, "full": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": clone
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_finished_task(&mock_server, &clone, "OK").await;
    Mock::given(method("GET"))
        .and(path(format!("{}/200/config", QEMU_PATH)))
        .respond_with(config_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    let vm = proxmox_client.clone_vm(NODE, 100, 200, true).await.unwrap();
    assert_eq!(vm.vmid, 200);
}

#[tokio::test]
async fn test_create_task_failure_propagates() {
    let mock_server = MockServer::start().await;
    let proxmox_client = create_test_client(&mock_server).await;
    let create = upid("qmcreate", "100");

    Mock::given(method("POST"))
        .and(path(QEMU_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": create
        })))
        .mount(&mock_server)
        .await;
    mount_finished_task(
        &mock_server,
        &create,
        "unable to create VM 100 - VM 100 already exists on node 'pve'",
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/100/config", QEMU_PATH)))
        .respond_with(config_response())
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = proxmox_client
        .create_vm(NODE, &VirtualMachineRequest::new(100), false)
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), ProxmoxError::TaskFailed { .. }));
    assert!(err.to_string().contains("already exists"));
}
