//! ssh client configuration lookup
//!
//! Understands enough of `ssh_config(5)` to answer "which options apply to this host":
//! - `Host` sections with `*`/`?` wildcards, several patterns per line and `!` negation
//! - `Keyword value` and `Keyword=value` forms, keywords are case-insensitive
//! - the first obtained value for each option wins
//! - `%h` in `HostName` is replaced with the original host name
//!
//! `Match` sections are not evaluated and never apply.
use std::path::{Path, PathBuf};

/// Options for a host, keywords lowercased
pub type SshOptions = indexmap::IndexMap<String, String>;

#[derive(Debug, Default, Clone)]
pub struct SshConfig {
    sections: Vec<Section>,
}

#[derive(Debug, Clone)]
struct Section {
    patterns: Vec<String>,
    options: Vec<(String, String)>,
}

impl Section {
    fn matches(&self, host: &str) -> bool {
        let mut matched = false;
        for pattern in &self.patterns {
            if let Some(negated) = pattern.strip_prefix('!') {
                if glob_match(negated, host) {
                    return false;
                }
            } else if glob_match(pattern, host) {
                matched = true;
            }
        }
        matched
    }
}

impl SshConfig {
    /// `~/.ssh/config` of the current user
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".ssh").join("config"))
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        // options before the first `Host` line apply to every host
        let mut sections = vec![Section {
            patterns: vec!["*".to_string()],
            options: vec![],
        }];

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let split_at = line
                .find(|c: char| c.is_whitespace() || c == '=')
                .unwrap_or(line.len());
            let (keyword, args) = line.split_at(split_at);
            let keyword = keyword.to_ascii_lowercase();
            let args = args
                .trim_start()
                .strip_prefix('=')
                .unwrap_or(args)
                .trim();

            match keyword.as_str() {
                "host" => sections.push(Section {
                    patterns: args.split_whitespace().map(unquote).collect(),
                    options: vec![],
                }),
                "match" => {
                    tracing::debug!(criteria = args, "Match sections in ssh config are not evaluated");
                    sections.push(Section {
                        patterns: vec![],
                        options: vec![],
                    });
                }
                _ => {
                    if let Some(section) = sections.last_mut() {
                        section.options.push((keyword, unquote(args)));
                    }
                }
            }
        }

        Self { sections }
    }

    /// All options that apply to `host`
    pub fn lookup(&self, host: &str) -> SshOptions {
        let mut options = SshOptions::new();

        for section in self.sections.iter().filter(|section| section.matches(host)) {
            for (keyword, value) in &section.options {
                options
                    .entry(keyword.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        if let Some(hostname) = options.get_mut("hostname") {
            *hostname = hostname.replace("%h", host).replace("%%", "%");
        }

        options
    }
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

/// Match `text` against a pattern where `*` matches any sequence and `?` any single character
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"
# global defaults
User deploy

Host web-* !web-internal
    HostName %h.example.com
    Port 2222

Host "db"
    HostName=10.0.0.5

Match host staging
    HostName 10.9.9.9

Host *
    HostName fallback
    Port 22
"#;

    #[test]
    fn glob_patterns() {
        assert!(glob_match("web-*", "web-1"));
        assert!(glob_match("w?b", "WEB"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*b*c", "aXXbYc"));
        assert!(!glob_match("a*b", "aXXc"));
        assert!(!glob_match("web", "web-1"));
    }

    #[test]
    fn first_match_wins() {
        let config = SshConfig::parse(CONFIG);
        let options = config.lookup("web-1");

        assert_eq!(options.get("hostname").map(String::as_str), Some("web-1.example.com"));
        assert_eq!(options.get("port").map(String::as_str), Some("2222"));
        assert_eq!(options.get("user").map(String::as_str), Some("deploy"));
    }

    #[test]
    fn negated_pattern_excludes_section() {
        let config = SshConfig::parse(CONFIG);
        let options = config.lookup("web-internal");

        assert_eq!(options.get("hostname").map(String::as_str), Some("fallback"));
    }

    #[test]
    fn equals_form_and_quotes() {
        let config = SshConfig::parse(CONFIG);
        assert_eq!(
            config.lookup("db").get("hostname").map(String::as_str),
            Some("10.0.0.5")
        );
    }

    #[test]
    fn match_sections_never_apply() {
        let config = SshConfig::parse(CONFIG);
        assert_eq!(
            config.lookup("staging").get("hostname").map(String::as_str),
            Some("fallback")
        );
    }
}
