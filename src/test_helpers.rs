//! Fake extraction tools for unit and router tests
//!
//! A fake tool is a shell script run as `/bin/sh <script> <args>`; the script
//! path travels in `tools.global_args` so nothing needs the executable bit.
//! Every script records its arguments and pid in its temp dir before running
//! the test body.

use crate::config::Config;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Env var pointing a script at its temp dir
pub(crate) const DIR_VAR: &str = "RELAY_TEST_DIR";

const PRELUDE: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$RELAY_TEST_DIR/args"
echo $$ > "$RELAY_TEST_DIR/pid"
"#;

pub(crate) struct FakeTool {
    dir: TempDir,
    config: Config,
}

impl FakeTool {
    /// Config wired to run `body` as the extraction tool
    pub(crate) fn new(body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("yt-dlp.sh");
        std::fs::write(&script, format!("{PRELUDE}{body}\n")).unwrap();

        let mut config = Config::default();
        config.tools.ytdlp_path = Some(PathBuf::from("/bin/sh"));
        config.tools.ffmpeg_path = Some(PathBuf::from("/usr/bin/ffmpeg"));
        config.tools.search_path = false;
        config.tools.global_args = vec![script.display().to_string()];
        config
            .tools
            .env
            .insert(DIR_VAR.to_string(), dir.path().display().to_string());
        config.server.api.public_base_url = Some("http://relay.test".to_string());

        Self { dir, config }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub(crate) fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Arguments of the last invocation, excluding the script path
    pub(crate) fn last_args(&self) -> Option<Vec<String>> {
        let raw = std::fs::read_to_string(self.dir.path().join("args")).ok()?;
        Some(raw.lines().map(str::to_string).collect())
    }

    /// Whether the tool was ever started
    pub(crate) fn was_spawned(&self) -> bool {
        self.dir.path().join("pid").exists()
    }

    /// Pid written by the last invocation
    pub(crate) fn last_pid(&self) -> Option<i32> {
        std::fs::read_to_string(self.dir.path().join("pid"))
            .ok()?
            .trim()
            .parse()
            .ok()
    }
}

/// Whether `pid` still names a live (non-zombie) process
#[cfg(unix)]
pub(crate) fn process_alive(pid: i32) -> bool {
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        let state = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next());
        return state != Some('Z');
    }
    // SAFETY: signal 0 only checks for existence.
    unsafe { libc::kill(pid, 0) == 0 }
}
