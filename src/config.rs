use std::io::ErrorKind;
use std::path::PathBuf;
use std::{env, fs, io};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Paths {
    /// Glob-like patterns for content files, e.g. `blog/*.md`.
    pub content: Vec<String>,
    pub template_dir: PathBuf,
    pub public_dir: PathBuf,
    pub cache_dir: Option<PathBuf>,
}

#[derive(Deserialize)]
pub struct Defaults {
    pub page_size: u32,
    pub debounce_ms: Option<u64>,
}

#[derive(Deserialize)]
pub struct Server {
    pub address: String,
    pub port: u16,
}

#[derive(Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize)]
pub struct RssFeed {
    pub title: String,
    pub site_url: String,
    pub description: String,
    pub page_size: u32,
}

#[derive(Deserialize)]
pub struct Config {
    pub paths: Paths,
    pub defaults: Defaults,
    pub server: Server,
    pub log: Option<Log>,
    pub rss_feed: Option<RssFeed>,
}

fn parse_path(path: PathBuf) -> PathBuf {
    if path.starts_with("${exe_dir}") {
        let cur_exe = env::current_exe().unwrap();
        let exe_dir = cur_exe.parent().unwrap().to_str().unwrap();
        let str_path = path.to_str().unwrap();
        PathBuf::from(str_path.replace("${exe_dir}", exe_dir))
    } else {
        path
    }
}

fn parse_pattern(pattern: String) -> String {
    parse_path(PathBuf::from(pattern)).to_string_lossy().into_owned()
}

pub fn read_config(cfg_path: &PathBuf) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.to_str().unwrap(), e))),
    };

    let mut cfg: Config = match toml::from_str::<Config>(cfg_content.as_str()) {
        Ok(cfg) => cfg,
        Err(e) => return Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    };

    cfg.paths = Paths {
        content: cfg.paths.content.into_iter().map(parse_pattern).collect(),
        template_dir: parse_path(cfg.paths.template_dir),
        public_dir: parse_path(cfg.paths.public_dir),
        cache_dir: cfg.paths.cache_dir.map(parse_path),
    };

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_src = r#"
            [paths]
            content = ["blog/*.md", "pages/*.md"]
            template_dir = "res/templates"
            public_dir = "res/public"

            [defaults]
            page_size = 10
            debounce_ms = 250

            [server]
            address = "127.0.0.1"
            port = 4000
        "#;
        let cfg: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.paths.content.len(), 2);
        assert_eq!(cfg.paths.cache_dir, None);
        assert_eq!(cfg.defaults.page_size, 10);
        assert_eq!(cfg.defaults.debounce_ms, Some(250));
        assert_eq!(cfg.server.port, 4000);
        assert!(cfg.log.is_none());
        assert!(cfg.rss_feed.is_none());
    }
}
