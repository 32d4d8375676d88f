//! Offensive-tool fingerprinting by User-Agent.
//!
//! A match short-circuits routing: the client gets a trap artifact instead of
//! the requested page. sqlmap is fed a fake SQL error to keep it busy, every
//! other tool sees a WAF block page.

use hyper::StatusCode;
use serde::Serialize;

use crate::artifact::{simple, Artifact};

/// Known tool signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolSignature {
    pub name: &'static str,
    pub description: &'static str,
}

pub const TOOL_SIGNATURES: &[ToolSignature] = &[
    ToolSignature { name: "sqlmap", description: "SQL injection tool" },
    ToolSignature { name: "nmap", description: "Network scanner" },
    ToolSignature { name: "nikto", description: "Web vulnerability scanner" },
    ToolSignature { name: "gobuster", description: "Directory brute-forcer" },
    ToolSignature { name: "dirbuster", description: "Directory brute-forcer" },
    ToolSignature { name: "wpscan", description: "WordPress scanner" },
    ToolSignature { name: "burp", description: "Web proxy / scanner" },
    ToolSignature { name: "metasploit", description: "Exploitation framework" },
    ToolSignature { name: "nessus", description: "Vulnerability scanner" },
    ToolSignature { name: "acunetix", description: "Web vulnerability scanner" },
    ToolSignature { name: "masscan", description: "Port scanner" },
    ToolSignature { name: "zap", description: "OWASP ZAP proxy" },
];

const SQLMAP_TRAP_BODY: &str = "<html><body><h1>Database Error</h1><p>MySQL Error: Syntax error in query near '' limit 1'</p></body></html>";
const WAF_TRAP_BODY: &str =
    "<html><body><h1>WAF Blocked</h1><p>Suspicious activity detected.</p></body></html>";

/// First signature whose name occurs in the lower-cased User-Agent
pub fn identify(user_agent: Option<&str>) -> Option<&'static ToolSignature> {
    let user_agent = user_agent.filter(|ua| !ua.is_empty())?.to_lowercase();
    TOOL_SIGNATURES
        .iter()
        .find(|sig| user_agent.contains(sig.name))
}

/// Trap artifact for a known tool, `None` for everything else
pub fn detect(user_agent: Option<&str>) -> Option<Artifact> {
    identify(user_agent).map(trap_for)
}

pub fn trap_for(signature: &ToolSignature) -> Artifact {
    if signature.name == "sqlmap" {
        simple(StatusCode::INTERNAL_SERVER_ERROR, "text/html", SQLMAP_TRAP_BODY)
    } else {
        simple(StatusCode::FORBIDDEN, "text/html", WAF_TRAP_BODY)
    }
}
