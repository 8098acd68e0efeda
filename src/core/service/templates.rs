use crate::core::service::WindowsServiceOptions;
use crate::domain::model::{InstallationContext, ServiceDescriptor};
use std::path::PathBuf;

pub fn systemd(ctx: &InstallationContext) -> ServiceDescriptor {
    let name = &ctx.service_name;
    let install = ctx.install_path.display();
    let node_bin = ctx.install_path.join("node").join("bin");

    let body = format!(
        "[Unit]
Description={name}
After=network.target mysql.service

[Service]
WorkingDirectory={install}
Environment=PATH={node_bin}:/bin:/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin
Restart=always

ExecStart={node} {app} prod

StandardOutput=journal
StandardError=journal
SyslogIdentifier={name}

[Install]
WantedBy=multi-user.target
",
        node_bin = node_bin.display(),
        node = ctx.node_binary().display(),
        app = ctx.app_entry().display(),
    );

    ServiceDescriptor {
        destination: PathBuf::from(format!("/etc/systemd/system/{}.service", name)),
        commands: vec![
            "systemctl daemon-reload".to_string(),
            format!("systemctl enable {}", name),
            format!("systemctl restart {}", name),
        ],
        body,
    }
}

pub fn upstart(ctx: &InstallationContext) -> ServiceDescriptor {
    let name = &ctx.service_name;

    let body = format!(
        "description \"{name}\"

start on (filesystem and net-device-up IFACE!=lo)
stop on runlevel [!2345]

chdir {install}

env DAEMON=\"{node} {app} prod\"
env PATH={node_bin}:$PATH

respawn
respawn limit unlimited

exec $DAEMON
",
        install = ctx.install_path.display(),
        node = ctx.node_binary().display(),
        app = ctx.app_entry().display(),
        node_bin = ctx.install_path.join("node").join("bin").display(),
    );

    ServiceDescriptor {
        destination: PathBuf::from(format!("/etc/init/{}.conf", name)),
        commands: vec![
            "initctl reload-configuration".to_string(),
            format!("initctl stop {}", name),
            format!("initctl start {}", name),
        ],
        body,
    }
}

pub fn launchd(ctx: &InstallationContext) -> ServiceDescriptor {
    let name = &ctx.service_name;
    let install = ctx.install_path.display();
    let destination = ctx
        .home_dir
        .join("Library/LaunchAgents")
        .join(format!("{}.plist", name));

    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
  <dict>
    <key>Label</key>
    <string>{name}</string>
    <key>KeepAlive</key>
    <true/>
    <key>ProgramArguments</key>
    <array>
      <string>{node}</string>
      <string>{app}</string>
      <string>prod</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>WorkingDirectory</key>
    <string>{install}</string>
    <key>EnvironmentVariables</key>
    <dict>
      <key>PATH</key>
      <string>{node_bin}</string>
    </dict>
    <key>StandardOutPath</key>
    <string>{install}/launchdOutput.log</string>
    <key>StandardErrorPath</key>
    <string>{install}/launchdErrors.log</string>
  </dict>
</plist>
"#,
        node = ctx.node_binary().display(),
        app = ctx.app_entry().display(),
        node_bin = ctx.install_path.join("node").join("bin").display(),
    );

    ServiceDescriptor {
        commands: vec![
            format!("launchctl load -w {}", destination.display()),
            format!("launchctl stop {}", name),
            format!("launchctl start {}", name),
        ],
        destination,
        body,
    }
}

/// winsw 格式的服務描述；第一個指令是安裝，必須成功
pub fn windows(ctx: &InstallationContext, options: &WindowsServiceOptions) -> ServiceDescriptor {
    let name = &ctx.service_name;
    let daemon_dir = ctx.install_path.join("daemon");
    let destination = daemon_dir.join(format!("{}.xml", name));
    let wrapper = daemon_dir.join(&options.wrapper);

    let body = format!(
        r#"<service>
  <id>{name}</id>
  <name>{name}</name>
  <description>{name}</description>
  <executable>{node}</executable>
  <arguments>--max-old-space-size={memory} "{app}" prod</arguments>
  <workingdirectory>{install}</workingdirectory>
  <startmode>Automatic</startmode>
  <onfailure action="restart" delay="{delay} sec"/>
  <log mode="roll"/>
</service>
"#,
        node = ctx.node_binary().display(),
        memory = options.max_memory_mb,
        app = ctx.app_entry().display(),
        install = ctx.install_path.display(),
        delay = options.restart_delay_seconds,
    );

    let delay_ms = options.restart_delay_seconds * 1000;
    ServiceDescriptor {
        commands: vec![
            format!("\"{}\" install \"{}\"", wrapper.display(), destination.display()),
            format!(
                "sc.exe failure {name} reset= 86400 actions= restart/{delay_ms}/restart/{delay_ms}/restart/{delay_ms}"
            ),
            format!("sc.exe start {}", name),
        ],
        destination,
        body,
    }
}

/// 容器內不註冊服務，只提示手動啟動的指令
pub fn manual_command(ctx: &InstallationContext) -> String {
    format!(
        "cd {} && {} {} prod",
        ctx.install_path.display(),
        ctx.node_binary().display(),
        ctx.app_entry().display()
    )
}
