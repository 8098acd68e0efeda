#![allow(dead_code)]

use async_trait::async_trait;
use ih_installer::domain::model::ProbeOutcome;
use ih_installer::domain::ports::{CommandRunner, HostResolver, LivenessProbe, ProcessInspector};
use ih_installer::{InstallError, Result};
use std::io::Write;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use zip::write::SimpleFileOptions;

/// 建立記憶體中的 zip
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub struct LocalResolver;

#[async_trait]
impl HostResolver for LocalResolver {
    async fn resolve_ipv4(&self, _host: &str) -> std::io::Result<Ipv4Addr> {
        Ok(Ipv4Addr::LOCALHOST)
    }
}

/// 記錄所有指令；含有 `fail_on` 任一片段的指令失敗
#[derive(Default)]
pub struct RecordingRunner {
    pub fail_on: Vec<String>,
    pub log: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn failing(fragments: &[&str]) -> Self {
        Self {
            fail_on: fragments.iter().map(|f| f.to_string()).collect(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str) -> Result<String> {
        self.log.lock().unwrap().push(command.to_string());
        if self.fail_on.iter().any(|f| command.contains(f.as_str())) {
            return Err(InstallError::CommandFailed {
                command: command.to_string(),
                message: "exit status 1".to_string(),
            });
        }
        Ok(String::new())
    }
}

/// 第一次探測回報沒有連線 (埠可用)，之後服務回 200
#[derive(Default)]
pub struct ComesUpAfterFirstProbe {
    pub calls: Mutex<Vec<u16>>,
}

#[async_trait]
impl LivenessProbe for ComesUpAfterFirstProbe {
    async fn probe(&self, port: u16) -> ProbeOutcome {
        let mut calls = self.calls.lock().unwrap();
        calls.push(port);
        if calls.len() == 1 {
            ProbeOutcome::NotConnected
        } else {
            ProbeOutcome::Connected { status: 200 }
        }
    }
}

pub struct FixedInspector(pub bool);

impl ProcessInspector for FixedInspector {
    fn is_running(&self, _pattern: &str) -> bool {
        self.0
    }
}
