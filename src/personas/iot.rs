//! TP-Link TL-WR841N router console.
//!
//! Pages under `/userRpm/` and `/goform/` sit behind the Basic-auth gate when
//! it is enabled (see [`crate::iot_auth`]); the exploit bait paths outside those
//! prefixes stay reachable without credentials.

use chrono::Duration;
use hyper::StatusCode;

use super::common::Device;
use super::{fixed, producer, BrandAttributes, Persona};
use crate::artifact::{http_date, Artifact};
use crate::freshness::RenderContext;
use crate::iot_auth::DEVICE_SERVER;

pub const DEVICE_BRAND: &str = "TP-Link";
pub const DEVICE_MODEL: &str = "TL-WR841N";
pub const FIRMWARE_VERSION: &str = "3.16.9 Build 20190208 Rel.58979n";
const HARDWARE_VERSION: &str = "WR841N v9 00000000";
const LAN_IP: &str = "192.168.0.1";
const WAN_IP: &str = "0.0.0.0";

const SESSION_COOKIES: &[&str] = &[
    "Authorization=Basic%20YWRtaW46YWRtaW4%3D; path=/",
    "subType=pcSub; path=/",
    "tLang=en; path=/",
];

/// Response with the router's own header set
pub fn tplink_response(
    ctx: &RenderContext,
    status: StatusCode,
    content_type: &str,
    body: impl Into<Vec<u8>>,
    with_cookies: bool,
) -> Artifact {
    let artifact = Artifact::new(status)
        .header("Server", DEVICE_SERVER)
        .header("Date", http_date(ctx.now))
        .header("Content-Type", content_type)
        .header("Connection", "close")
        .body(body)
        .with_content_length();

    if with_cookies {
        SESSION_COOKIES
            .iter()
            .fold(artifact, |a, cookie| a.header("Set-Cookie", *cookie))
    } else {
        artifact
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta http-equiv=\"Content-Type\" content=\"text/html; charset=UTF-8\">\n    <meta http-equiv=\"Pragma\" content=\"no-cache\">\n    <title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>",
        title, body
    )
}

/// Per-render device identity; only consistent within one page
struct DeviceInfo {
    mac: String,
    uptime_days: i64,
}

impl DeviceInfo {
    fn sample(ctx: &mut RenderContext) -> Self {
        Self {
            mac: ctx.tplink_mac(),
            uptime_days: ctx.uptime_days(),
        }
    }

    /// Default SSID: `TP-LINK_` plus the last three MAC octets
    fn ssid(&self) -> String {
        let tail = &self.mac[self.mac.len().saturating_sub(8)..];
        format!("TP-LINK_{}", tail.replace(':', ""))
    }
}

fn login_page(ctx: &mut RenderContext) -> Artifact {
    let body = format!(
        r#"<div class="login-container">
    <div class="login-box">
        <div class="login-header">{model} Wireless N Router</div>
        <div class="login-body">
            <div class="logo">TP-LINK</div>
            <div id="error" class="error-message"></div>
            <form method="POST" action="/userRpm/LoginRpm.htm">
                <label for="username">User Name:</label>
                <input type="text" id="username" name="username" maxlength="15" autocomplete="off">
                <label for="password">Password:</label>
                <input type="password" id="password" name="password" maxlength="15" autocomplete="off">
                <button type="submit" class="login-button">Login</button>
            </form>
        </div>
        <div class="login-footer">Copyright &copy; 2019 TP-LINK Technologies Co., Ltd. All rights reserved.</div>
    </div>
</div>"#,
        model = DEVICE_MODEL
    );
    tplink_response(ctx, StatusCode::OK, "text/html", page(DEVICE_MODEL, &body), false)
}

fn index_page(ctx: &mut RenderContext) -> Artifact {
    let info = DeviceInfo::sample(ctx);
    let menu: String = [
        "Status",
        "Quick Setup",
        "Network",
        "Wireless",
        "DHCP",
        "Forwarding",
        "Security",
        "Access Control",
        "Dynamic DNS",
        "System Tools",
    ]
    .iter()
    .map(|item| format!("        <div class=\"menu-item\">{}</div>\n", item))
    .collect();

    let body = format!(
        r#"<div class="header">{model} Wireless N Router</div>
<div class="container">
    <div class="sidebar">
{menu}    </div>
    <div class="content">
        <h2>Device Information</h2>
        <table class="info-table">
            <tr><td>Hardware Version</td><td>{hw}</td></tr>
            <tr><td>Firmware Version</td><td>{fw}</td></tr>
            <tr><td>MAC Address</td><td>{mac}</td></tr>
            <tr><td>LAN IP Address</td><td>{lan}</td></tr>
            <tr><td>WAN IP Address</td><td>{wan}</td></tr>
            <tr><td>System Up Time</td><td>{uptime} days</td></tr>
        </table>
        <h2>Wireless Status</h2>
        <table class="info-table">
            <tr><td>Wireless Radio</td><td>Enabled</td></tr>
            <tr><td>SSID</td><td>{ssid}</td></tr>
            <tr><td>Channel</td><td>6 (2.437GHz)</td></tr>
            <tr><td>Mode</td><td>11bgn mixed</td></tr>
            <tr><td>Security</td><td>WPA/WPA2-PSK</td></tr>
        </table>
    </div>
</div>"#,
        model = DEVICE_MODEL,
        hw = HARDWARE_VERSION,
        fw = FIRMWARE_VERSION,
        mac = info.mac,
        lan = LAN_IP,
        wan = WAN_IP,
        uptime = info.uptime_days,
        ssid = info.ssid(),
    );
    tplink_response(ctx, StatusCode::OK, "text/html", page(DEVICE_MODEL, &body), true)
}

fn status_page(ctx: &mut RenderContext) -> Artifact {
    let info = DeviceInfo::sample(ctx);
    let body = format!(
        "<h1>Router Status</h1>\n<h2>WAN</h2>\n<p>Status: Disconnected</p>\n<p>IP Address: {wan}</p>\n<h2>LAN</h2>\n<p>MAC Address: {mac}</p>\n<p>IP Address: {lan}</p>\n<p>Subnet Mask: 255.255.255.0</p>\n<h2>Wireless</h2>\n<p>Status: Enabled</p>\n<p>SSID: {ssid}</p>\n<p>Channel: 6</p>\n<h2>System</h2>\n<p>Firmware: {fw}</p>\n<p>Hardware: {hw}</p>\n<p>Uptime: {uptime} days</p>",
        wan = WAN_IP,
        mac = info.mac,
        lan = LAN_IP,
        ssid = info.ssid(),
        fw = FIRMWARE_VERSION,
        hw = HARDWARE_VERSION,
        uptime = info.uptime_days,
    );
    tplink_response(ctx, StatusCode::OK, "text/html", page("Status", &body), true)
}

fn wlan_security_page(ctx: &mut RenderContext) -> Artifact {
    let body = r#"<h1>Wireless Security Settings</h1>
<form method="POST" action="/userRpm/WlanSecurityRpm.htm">
    <h2>Security Mode</h2>
    <select name="secType">
        <option value="0">Disable Security</option>
        <option value="1" selected>WPA/WPA2 - Personal (Recommended)</option>
        <option value="2">WPA/WPA2 - Enterprise</option>
        <option value="3">WEP</option>
    </select>
    <h2>WPA/WPA2 Settings</h2>
    <label>Encryption:</label>
    <select name="cipher">
        <option value="0">Automatic</option>
        <option value="1">TKIP</option>
        <option value="2">AES</option>
    </select>
    <label>PSK Password:</label>
    <input type="password" name="pskSecret" maxlength="64">
    <button type="submit">Save</button>
</form>"#;
    tplink_response(ctx, StatusCode::OK, "text/html", page("Wireless Security", body), true)
}

fn reboot_page(ctx: &mut RenderContext) -> Artifact {
    let body = r#"<h1>System Reboot</h1>
<p>Click the button below to reboot the router:</p>
<form method="POST" action="/userRpm/SysRebootRpm.htm">
    <button type="submit" name="Reboot" value="Reboot">Reboot</button>
</form>
<p><small>The reboot process will take approximately 30 seconds.</small></p>"#;
    tplink_response(ctx, StatusCode::OK, "text/html", page("System Reboot", body), true)
}

const SYSTEM_LOG_ENTRIES: &[(&str, &str)] = &[
    ("INFO", "System started successfully"),
    ("INFO", "WAN connection established"),
    ("INFO", "DHCP server started"),
    ("INFO", "Wireless network enabled"),
    ("WARN", "Failed login attempt from 192.168.0.100"),
    ("INFO", "Firmware check completed"),
    ("INFO", "Time synchronized with NTP server"),
];

fn system_log_page(ctx: &mut RenderContext) -> Artifact {
    let rows: Vec<String> = SYSTEM_LOG_ENTRIES
        .iter()
        .enumerate()
        .map(|(i, (level, message))| {
            let at = ctx.now - Duration::hours(2 * i as i64);
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                at.format("%Y-%m-%d %H:%M:%S"),
                level,
                message
            )
        })
        .collect();
    let body = format!(
        "<h1>System Log</h1>\n<p>Displaying recent system events:</p>\n<table>\n<tr><th>Time</th><th>Level</th><th>Message</th></tr>\n{}\n</table>\n<p><small>Log entries are stored for 7 days.</small></p>",
        rows.join("\n")
    );
    tplink_response(ctx, StatusCode::OK, "text/html", page("System Log", &body), true)
}

fn statistics_page(ctx: &mut RenderContext) -> Artifact {
    use rand::Rng;

    let packets_sent: u64 = ctx.rng.gen_range(100_000..1_000_000);
    let packets_received: u64 = ctx.rng.gen_range(100_000..1_000_000);
    let bytes_sent: u64 = ctx.rng.gen_range(1_000_000_000..10_000_000_000);
    let bytes_received: u64 = ctx.rng.gen_range(1_000_000_000..10_000_000_000);
    let mb = |bytes: u64| bytes as f64 / 1024.0 / 1024.0;

    let body = format!(
        "<h1>System Statistics</h1>\n<h2>WAN Statistics</h2>\n<table>\n<tr><td>Packets Sent</td><td>{}</td></tr>\n<tr><td>Packets Received</td><td>{}</td></tr>\n<tr><td>Bytes Sent</td><td>{} bytes ({:.2} MB)</td></tr>\n<tr><td>Bytes Received</td><td>{} bytes ({:.2} MB)</td></tr>\n</table>",
        packets_sent,
        packets_received,
        bytes_sent,
        mb(bytes_sent),
        bytes_received,
        mb(bytes_received)
    );
    tplink_response(ctx, StatusCode::OK, "text/html", page("System Statistics", &body), true)
}

fn password_page(ctx: &mut RenderContext) -> Artifact {
    let body = r#"<h1>Password</h1>
<form method="POST" action="/userRpm/PasswordRpm.htm">
    <label>Old User Name:</label><input type="text" name="oldname">
    <label>Old Password:</label><input type="password" name="oldpassword">
    <label>New User Name:</label><input type="text" name="newname">
    <label>New Password:</label><input type="password" name="newpassword">
    <button type="submit">Save</button>
</form>"#;
    tplink_response(ctx, StatusCode::OK, "text/html", page("Password", body), true)
}

const MENU_SECTIONS: &[(&str, &[(&str, &str)])] = &[
    ("Status", &[("/userRpm/StatusRpm.htm", "Router Status")]),
    ("Network", &[("/userRpm/Index.htm", "WAN Settings")]),
    ("Wireless", &[("/userRpm/WlanSecurityRpm.htm", "Wireless Security")]),
    (
        "System Tools",
        &[
            ("/userRpm/PasswordRpm.htm", "Password"),
            ("/userRpm/SystemLogRpm.htm", "System Log"),
            ("/userRpm/SystemStatisticRpm.htm", "Statistics"),
            ("/userRpm/SysRebootRpm.htm", "Reboot"),
        ],
    ),
];

/// Left-hand frame of the console frameset
fn menu_page(ctx: &mut RenderContext) -> Artifact {
    let body: String = MENU_SECTIONS
        .iter()
        .map(|(title, items)| {
            let links: String = items
                .iter()
                .map(|(href, label)| {
                    format!(
                        "        <div class=\"menu-item\"><a href=\"{}\" target=\"mainFrame\">{}</a></div>\n",
                        href, label
                    )
                })
                .collect();
            format!(
                "    <div class=\"menu-section\">\n        <div class=\"menu-title\">{}</div>\n{}    </div>\n",
                title, links
            )
        })
        .collect();
    tplink_response(ctx, StatusCode::OK, "text/html", page("Menu", body.trim_end()), true)
}

fn help_page(ctx: &mut RenderContext) -> Artifact {
    let body = format!(
        "<h1>{model} Help</h1>\n<h2>Quick Start Guide</h2>\n<p>Welcome to your TP-LINK Wireless N Router.</p>\n<h3>Default Settings</h3>\n<ul>\n    <li>Username: admin</li>\n    <li>Password: admin</li>\n    <li>IP Address: {lan}</li>\n</ul>\n<h3>Support</h3>\n<p>For technical support, please visit <a href=\"http://www.tp-link.com\">www.tp-link.com</a></p>",
        model = DEVICE_MODEL,
        lan = LAN_IP
    );
    tplink_response(ctx, StatusCode::OK, "text/html", page("Help", &body), false)
}

fn static_asset(content_type: &'static str, body: &'static str) -> super::Producer {
    producer(move |ctx| tplink_response(ctx, StatusCode::OK, content_type, body, false))
}

/// Ping diagnostic page; the `ping_addr` parameter is a classic injection target
fn ping_page(ctx: &mut RenderContext) -> Artifact {
    let body = format!(
        "<h1>Diagnostic Tools</h1>\n<form method=\"GET\" action=\"/userRpm/PingIframeRpm.htm\">\n    <label>IP Address/Domain Name:</label><input type=\"text\" name=\"ping_addr\" value=\"{lan}\">\n    <button type=\"submit\" name=\"doType\" value=\"ping\">Start</button>\n</form>\n<pre>\nPinging {lan} with 64 bytes of data:\nReply from {lan}: bytes=64 time=1ms TTL=64\nReply from {lan}: bytes=64 time=1ms TTL=64\nReply from {lan}: bytes=64 time=1ms TTL=64\nReply from {lan}: bytes=64 time=1ms TTL=64\n</pre>",
        lan = LAN_IP
    );
    tplink_response(ctx, StatusCode::OK, "text/html", page("Diagnostic Tools", &body), true)
}

/// Paths commonly hit by router exploit kits
fn exploit_endpoints() -> Vec<(String, super::Producer)> {
    vec![
        (
            "/cgi-bin/luci".to_string(),
            producer(|ctx| {
                tplink_response(
                    ctx,
                    StatusCode::FORBIDDEN,
                    "text/html",
                    page("403 Forbidden", "<h2>Authorization Required</h2>\n<p>Access denied.</p>"),
                    false,
                )
            }),
        ),
        (
            "/cgi".to_string(),
            producer(|ctx| tplink_response(ctx, StatusCode::OK, "text/plain", "[error]0", false)),
        ),
        (
            "/goform/formLogin".to_string(),
            producer(|ctx| {
                tplink_response(
                    ctx,
                    StatusCode::OK,
                    "text/html",
                    "<html><head><script>location.href='/userRpm/Index.htm';</script></head></html>",
                    true,
                )
            }),
        ),
        ("/userRpm/PingIframeRpm.htm".to_string(), producer(ping_page)),
    ]
}

pub fn persona() -> Persona {
    let device = Device {
        brand: DEVICE_BRAND.to_string(),
        model: DEVICE_MODEL.to_string(),
        firmware: FIRMWARE_VERSION.to_string(),
    };
    let brand = BrandAttributes {
        name: DEVICE_BRAND.to_string(),
        tech_stack: Vec::new(),
        model: Some(DEVICE_MODEL.to_string()),
        firmware: Some(FIRMWARE_VERSION.to_string()),
    };

    Persona::new("iot", brand)
        .extend(device.endpoints())
        .endpoint("/userRpm/LoginRpm.htm", producer(login_page))
        .endpoint("/userRpm/Index.htm", producer(index_page))
        .endpoint("/userRpm/MenuRpm.htm", producer(menu_page))
        .endpoint("/userRpm/StatusRpm.htm", producer(status_page))
        .endpoint("/userRpm/WlanSecurityRpm.htm", producer(wlan_security_page))
        .endpoint("/help/", producer(help_page))
        .endpoint("/help/index.htm", producer(help_page))
        .endpoint("/userRpm/SysRebootRpm.htm", producer(reboot_page))
        .endpoint("/userRpm/SystemStatisticRpm.htm", producer(statistics_page))
        .endpoint("/userRpm/SystemLogRpm.htm", producer(system_log_page))
        .endpoint("/userRpm/PasswordRpm.htm", producer(password_page))
        .endpoint("/css/main.css", static_asset("text/css", "/* TP-Link CSS */"))
        .endpoint("/css/login.css", static_asset("text/css", "/* Login CSS */"))
        .endpoint("/js/jquery.js", static_asset("application/javascript", "// jQuery placeholder"))
        .endpoint("/js/login.js", static_asset("application/javascript", "// Login logic"))
        .endpoint("/img/logo.png", static_asset("image/png", ""))
        .extend(exploit_endpoints())
        .endpoint(
            "/cgi-bin/config.exp",
            fixed(
                Artifact::new(StatusCode::OK)
                    .header("Server", DEVICE_SERVER)
                    .header("Content-Type", "text/plain")
                    .body("admin=root\npassword=admin"),
            ),
        )
        .endpoint(
            "/camera/stream",
            fixed(
                Artifact::new(StatusCode::UNAUTHORIZED)
                    .header("Server", DEVICE_SERVER)
                    .header("Content-Type", "text/html")
                    .body("<h1>Camera Login</h1>"),
            ),
        )
}
