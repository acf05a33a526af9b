//! Shared fixtures: a temp project with fake `conda`/`pip` tools.
//!
//! Every fake tool appends one line to `$BOOTSEQ_LOG` and exits with
//! `$FAKE_<TOOL>_EXIT` (default 0). `pip` also records the variables the
//! bootstrap is expected to have set.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const INDEX_URL: &str = "https://wheels.example.com/links.html";

pub struct Project {
    pub dir: TempDir,
    pub bin: PathBuf,
    pub log: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        let log = dir.path().join("calls.log");

        write_tool(&bin, "conda", "echo \"conda $*\" >> \"$BOOTSEQ_LOG\"");
        write_tool(
            &bin,
            "pip",
            "echo \"pip $* links=${PIP_FIND_LINKS:-} cc=${CC:-}\" >> \"$BOOTSEQ_LOG\"",
        );

        let project = Self { dir, bin, log };
        project.write_script("build.sh", "echo build >> \"$BOOTSEQ_LOG\"\nexport CC=fakecc\n");
        project.write_script("test.sh", "echo test >> \"$BOOTSEQ_LOG\"\n");
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_script(&self, name: &str, body: &str) {
        std::fs::write(self.path().join("scripts").join(name), body).unwrap();
    }

    /// Stand-in for `$XDG_CONFIG_HOME`, empty unless a test writes to it.
    pub fn xdg_config_home(&self) -> PathBuf {
        self.path().join("xdg")
    }

    pub fn write_user_config(&self, body: &str) {
        let dir = self.xdg_config_home().join("bootseq");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), body).unwrap();
    }

    pub fn tool(&self, name: &str) -> String {
        self.bin.join(name).display().to_string()
    }

    /// A `bootseq.toml` pointing every step at the fake tools.
    pub fn config_toml(&self) -> String {
        format!(
            r#"[package_manager]
program = "{conda}"

[index]
url = "{url}"

[package]
installer = "{pip}"

[project]
installer = "{pip}"
extras = ["docs", "dev"]
"#,
            conda = self.tool("conda"),
            pip = self.tool("pip"),
            url = INDEX_URL,
        )
    }

    pub fn write_config(&self) {
        std::fs::write(self.path().join("bootseq.toml"), self.config_toml()).unwrap();
    }

    /// Lines logged by tools and scripts, in call order.
    pub fn calls(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.log) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn write_tool(bin: &Path, name: &str, body: &str) {
    let path = bin.join(name);
    let var = format!("FAKE_{}_EXIT", name.to_uppercase());
    std::fs::write(
        &path,
        format!("#!/bin/sh\n{}\nexit ${{{}:-0}}\n", body, var),
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
