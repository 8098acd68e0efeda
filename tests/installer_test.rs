mod common;

use common::{zip_bytes, ComesUpAfterFirstProbe, FixedInspector, LocalResolver, RecordingRunner};
use httpmock::prelude::*;
use ih_installer::core::archive::ArchiveTool;
use ih_installer::core::init_system::HostEnvironment;
use ih_installer::core::service::RegistrationPlan;
use ih_installer::domain::model::{
    AuxPackage, ItemState, OsFamily, Platform,
};
use ih_installer::{
    Collaborators, InitSystemKind, InstallError, InstallProfile, InstallationContext, Installer,
    RuntimeConfig,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

/// 模擬所有遠端：release metadata、核心、node_modules、專案與輔助套件
async fn publish_release(server: &MockServer) {
    let core_url = server.url("/download/v5.2.0/ih-systems.zip");
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/ih-v5/releases/latest");
            then.status(200).json_body(serde_json::json!({
                "tag_name": "v5.2.0",
                "assets": [
                    {"name": "ih-systems.zip", "browser_download_url": core_url}
                ]
            }));
        })
        .await;
    // 下載網址會轉到儲存空間
    server
        .mock_async(|when, then| {
            when.method(GET).path("/download/v5.2.0/ih-systems.zip");
            then.status(302).header("Location", "/objects/core.zip");
        })
        .await;
    let core = zip_bytes(&[
        ("backend/app.js", "require('./lib/server')"),
        ("frontend/index.html", "<html></html>"),
    ]);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/objects/core.zip");
            then.status(200).body(core);
        })
        .await;

    let modules = zip_bytes(&[("node_modules/express/index.js", "module.exports = {}")]);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ih-v5/node_modules.zip");
            then.status(200).body(modules);
        })
        .await;

    let project = zip_bytes(&[("project.json", "{\"name\":\"smarthome5\"}"), ("layouts/main.json", "{}")]);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ih-v5/projects/smarthome5.ihpack");
            then.status(200).body(project);
        })
        .await;

    let zipball = server.url("/zipball/plugin-emulator");
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/plugin-emulator/releases/latest");
            then.status(200)
                .json_body(serde_json::json!({"tag_name": "v1.0.3", "zipball_url": zipball}));
        })
        .await;
    let plugin = zip_bytes(&[("org-plugin-emulator-3f2a9c1/index.js", "// emulator")]);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/zipball/plugin-emulator");
            then.status(200).body(plugin);
        })
        .await;

    // agent 的 repository 不存在
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/agent-influx/releases/latest");
            then.status(404).json_body(serde_json::json!({"message": "Not Found"}));
        })
        .await;
}

fn profile(server: &MockServer) -> InstallProfile {
    let mut profile = InstallProfile::default();
    profile.release.metadata_url = server.url("/repos/{variant}/releases/latest");
    profile.release.modules_url = server.url("/{variant}/node_modules.zip");
    profile.release.project_url = Some(server.url("/{variant}/projects/smarthome5.ihpack"));
    profile.release.aux_latest_url = server.url("/repos/{repo}/releases/latest");
    profile.plugins = vec![AuxPackage {
        name: "emulator".into(),
        id: "emuls".into(),
        repository: "plugin-emulator".into(),
    }];
    profile.agents = vec![AuxPackage {
        name: "influxDB".into(),
        id: "influx".into(),
        repository: "agent-influx".into(),
    }];
    profile.archive_tool = ArchiveTool::Bundled;
    profile.verify.interval_ms = 10;
    profile
}

fn context(root: &Path) -> InstallationContext {
    InstallationContext::new(
        "ih-v5",
        "ru",
        "ih-v5",
        "demo_test",
        root.join("opt/ih-v5"),
        root.join("var/lib/ih-v5"),
        8088,
        Platform {
            os: OsFamily::Linux,
            arch: "x86_64".to_string(),
            embedded: false,
        },
    )
    .with_home_dir(root.join("home"))
}

/// 假主機：搜尋路徑中只有指定的控制程式
fn host(root: &Path, binaries: &[&str], in_container: bool) -> HostEnvironment {
    let bin = root.join("usr/bin");
    fs::create_dir_all(&bin).unwrap();
    for binary in binaries {
        fs::write(bin.join(binary), "#!/bin/sh\n").unwrap();
    }
    let marker = root.join(".dockerenv");
    if in_container {
        fs::write(&marker, "").unwrap();
    }
    HostEnvironment {
        os: OsFamily::Linux,
        search_path: vec![bin],
        container_markers: vec![marker],
        cgroup_file: root.join("cgroup"),
    }
}

fn collaborators(
    runner: Arc<RecordingRunner>,
    probe: Arc<ComesUpAfterFirstProbe>,
    host: HostEnvironment,
) -> Collaborators {
    Collaborators {
        runner,
        probe,
        resolver: Arc::new(LocalResolver),
        inspector: Arc::new(FixedInspector(true)),
        host,
    }
}

fn state_of<'a>(items: &'a [ih_installer::domain::model::ItemStatus], name: &str) -> &'a ItemState {
    &items
        .iter()
        .find(|item| item.name == name)
        .unwrap_or_else(|| panic!("no status row named {name}"))
        .state
}

#[tokio::test]
async fn test_full_install_with_launchd() {
    let server = MockServer::start_async().await;
    publish_release(&server).await;
    let temp = TempDir::new().unwrap();

    let runner = Arc::new(RecordingRunner::default());
    let probe = Arc::new(ComesUpAfterFirstProbe::default());
    let installer = Installer::new(
        context(temp.path()),
        profile(&server),
        collaborators(
            runner.clone(),
            probe.clone(),
            host(temp.path(), &["launchctl"], false),
        ),
    );

    let summary = assert_ok!(installer.run().await);

    assert_eq!(summary.release_tag, "v5.2.0");
    assert_eq!(summary.port, 8088);
    assert_eq!(summary.init_system, InitSystemKind::Launchd);
    assert!(summary.manual_command.is_none());
    assert!(summary.verification.as_ref().unwrap().is_healthy());
    assert_eq!(summary.login, "admin");
    assert!(summary
        .web_urls
        .iter()
        .all(|url| url.ends_with(":8088/admin")));

    // 安裝樹
    let install = temp.path().join("opt/ih-v5");
    let data = temp.path().join("var/lib/ih-v5");
    assert!(install.join("backend/app.js").exists());
    assert!(install.join("frontend/index.html").exists());
    assert!(install.join("backend/node_modules/express/index.js").exists());
    assert!(data.join("projects/demo_test/project.json").exists());
    assert!(data.join("projects/demo_test/layouts/main.json").exists());
    assert_eq!(
        fs::read_to_string(data.join("plugins/emuls/index.js")).unwrap(),
        "// emulator"
    );
    assert!(!data.join("agents/influx").exists());

    // config.json 使用最終的埠號
    let config: RuntimeConfig =
        serde_json::from_str(&fs::read_to_string(install.join("config.json")).unwrap()).unwrap();
    assert_eq!(config.port, 8088);
    assert_eq!(config.project, "demo_test");
    assert_eq!(config.name_service, "ih-v5");
    assert!(config.vardir.is_none());

    // 服務描述檔與啟用指令
    let plist = temp.path().join("home/Library/LaunchAgents/ih-v5.plist");
    assert!(fs::read_to_string(&plist).unwrap().contains("<string>ih-v5</string>"));
    let commands = runner.commands();
    assert_eq!(commands[0], "service ih-v5 stop");
    assert!(commands
        .iter()
        .any(|c| c == &format!("launchctl load -w {}", plist.display())));
    assert!(commands.iter().any(|c| c == "launchctl start ih-v5"));

    // 協商一次，驗證一次
    assert_eq!(*probe.calls.lock().unwrap(), vec![8088, 8088]);

    // agent 失敗只記錄不中止
    let items = &summary.items;
    assert_eq!(state_of(items, "downloading core"), &ItemState::Ok);
    assert_eq!(state_of(items, "deploy project"), &ItemState::Ok);
    assert_eq!(state_of(items, "deploy emulator"), &ItemState::Ok);
    assert!(matches!(state_of(items, "deploy influxDB"), ItemState::Failed(_)));
    assert_eq!(state_of(items, "check port"), &ItemState::Ok);
    assert_eq!(summary.failed_items().count(), 1);
}

#[tokio::test]
async fn test_container_install_is_manual() {
    let server = MockServer::start_async().await;
    publish_release(&server).await;
    let temp = TempDir::new().unwrap();

    let runner = Arc::new(RecordingRunner::default());
    let probe = Arc::new(ComesUpAfterFirstProbe::default());
    let installer = Installer::new(
        context(temp.path()),
        profile(&server),
        collaborators(
            runner.clone(),
            probe.clone(),
            host(temp.path(), &["systemctl"], true),
        ),
    );

    let summary = installer.run().await.unwrap();

    assert_eq!(summary.init_system, InitSystemKind::Docker);
    assert!(summary.manual_command.as_deref().unwrap().ends_with("app.js prod"));
    assert!(summary.verification.is_none());
    assert_eq!(state_of(&summary.items, "service activation"), &ItemState::Skipped);
    assert!(!runner.commands().iter().any(|c| c.starts_with("systemctl")));
    // 只有協商埠號時探測過
    assert_eq!(probe.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_core_asset_aborts_before_install() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/ih-v5/releases/latest");
            then.status(200)
                .json_body(serde_json::json!({"tag_name": "v5.2.0", "assets": []}));
        })
        .await;
    let temp = TempDir::new().unwrap();

    let installer = Installer::new(
        context(temp.path()),
        profile(&server),
        collaborators(
            Arc::new(RecordingRunner::default()),
            Arc::new(ComesUpAfterFirstProbe::default()),
            host(temp.path(), &["systemctl"], false),
        ),
    );

    let err = assert_err!(installer.run().await);

    assert!(matches!(err, InstallError::AssetNotFound { .. }));
    assert!(!temp.path().join("opt/ih-v5/backend").exists());
    assert!(!temp.path().join("opt/ih-v5/config.json").exists());
    assert!(matches!(
        state_of(&installer.items(), "found version"),
        ItemState::Failed(_)
    ));
}

#[tokio::test]
async fn test_dependency_install_failure_aborts() {
    let server = MockServer::start_async().await;
    let metadata = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/ih-v5/releases/latest");
            then.status(200).json_body(serde_json::json!({"tag_name": "v5.2.0"}));
        })
        .await;
    let temp = TempDir::new().unwrap();

    // 檢查與安裝都失敗
    let runner = Arc::new(RecordingRunner::failing(&["rsync"]));
    let installer = Installer::new(
        context(temp.path()),
        profile(&server),
        collaborators(
            runner.clone(),
            Arc::new(ComesUpAfterFirstProbe::default()),
            host(temp.path(), &["systemctl"], false),
        ),
    );

    let err = installer.run().await.unwrap_err();

    assert!(matches!(err, InstallError::DependencyInstallFailure { ref name, .. } if name == "rsync"));
    assert!(runner
        .commands()
        .contains(&"sudo apt-get install -y rsync".to_string()));
    metadata.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_unsupported_init_system_aborts_after_config() {
    let server = MockServer::start_async().await;
    publish_release(&server).await;
    let temp = TempDir::new().unwrap();

    let installer = Installer::new(
        context(temp.path()),
        profile(&server),
        collaborators(
            Arc::new(RecordingRunner::default()),
            Arc::new(ComesUpAfterFirstProbe::default()),
            host(temp.path(), &["rc-update"], false),
        ),
    );

    let err = installer.run().await.unwrap_err();

    assert!(matches!(
        err,
        InstallError::UnsupportedInitSystem { ref system, .. } if system == "openrc"
    ));
    assert!(temp.path().join("opt/ih-v5/config.json").exists());
}

#[test]
fn test_dry_run_plan_renders_without_side_effects() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path());
    let installer = Installer::new(
        ctx,
        InstallProfile::default(),
        collaborators(
            Arc::new(RecordingRunner::default()),
            Arc::new(ComesUpAfterFirstProbe::default()),
            host(temp.path(), &["launchctl"], false),
        ),
    );

    let plan = installer.plan().unwrap();

    assert_eq!(plan.init_system, InitSystemKind::Launchd);
    assert_eq!(
        plan.metadata_url,
        "https://api.github.com/repos/intrahouseio/ih-v5/releases/latest"
    );
    match plan.registration {
        RegistrationPlan::Descriptor(descriptor) => {
            assert!(descriptor.destination.ends_with("Library/LaunchAgents/ih-v5.plist"));
            assert!(!descriptor.destination.exists());
        }
        other => panic!("unexpected plan {other:?}"),
    }
    assert!(!temp.path().join("opt").exists());
}
