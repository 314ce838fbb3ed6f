//! Fake yt-dlp scripts and the configs that run them

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use yt_relay::Config;

/// A video URL on an allowed host
pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=abc123";

/// Metadata printed for `-j`
pub const VIDEO_JSON: &str =
    r#"{"title":"Test","duration":125,"thumbnails":[{"url":"a"},{"url":"b"}]}"#;

/// Recorded by every script before its body runs
const PRELUDE: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$RELAY_TEST_DIR/args"
echo $$ > "$RELAY_TEST_DIR/pid"
"#;

/// Answers `-j`, `--get-title` and `--flat-playlist`; `-o -` runs `download_body`
pub fn dispatching_tool(download_body: &str) -> String {
    format!(
        r#"case " $* " in
  *" -j "*) printf '%s' '{VIDEO_JSON}' ;;
  *" --get-title "*) echo 'Test' ;;
  *" --flat-playlist "*)
    echo '{{"id":"t1","title":"First","duration":61}}'
    echo '{{"id":"t2","title":"Second","duration":7}}'
    ;;
  *" -o "*)
{download_body}
    ;;
esac"#
    )
}

/// Script body that writes media forever, after starting a helper process
/// (like the transcoder yt-dlp would run) whose pid lands in `helper`
pub const ENDLESS_WITH_HELPER: &str = r#"    sleep 60 &
    echo $! > "$RELAY_TEST_DIR/helper"
    while :; do printf 'MEDIA-MEDIA-MEDIA-MEDIA-MEDIA-MEDIA'; done"#;

/// A fake tool in its own temp dir
pub struct FakeTool {
    dir: TempDir,
    config: Config,
}

impl FakeTool {
    pub fn new(body: &str) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let script = dir.path().join("yt-dlp.sh");
        std::fs::write(&script, format!("{PRELUDE}{body}\n")).expect("write script");

        let mut config = Config::default();
        config.tools.ytdlp_path = Some(PathBuf::from("/bin/sh"));
        config.tools.ffmpeg_path = Some(PathBuf::from("/usr/bin/ffmpeg"));
        config.tools.search_path = false;
        config.tools.global_args = vec![script.display().to_string()];
        config
            .tools
            .env
            .insert("RELAY_TEST_DIR".to_string(), dir.path().display().to_string());

        Self { dir, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Integer written to `name` in the temp dir, once the script wrote it
    pub fn read_pid(&self, name: &str) -> Option<i32> {
        std::fs::read_to_string(self.dir.path().join(name))
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// Arguments of the last invocation
    pub fn last_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("args"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn was_spawned(&self) -> bool {
        self.dir.path().join("pid").exists()
    }
}
