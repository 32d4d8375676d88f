//! Shared page generators reused by several personas.
//!
//! Each generator is a small config struct whose `endpoints()` returns an
//! independent set of producers; personas compose them rather than inherit.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use once_cell::sync::Lazy;

use super::{fixed, producer, Producer};
use crate::artifact::{self, build_response, html_page, Artifact};
use crate::freshness::RenderContext;

/// 16x16 grey square, 4-bit ICO
const FAVICON_B64: &str = concat!(
    "AAABAAEAEBAQAAEABAAoAQAAFgAAACgAAAAQAAAAIAAAAAEABAAAAAAAgAAAAAAA",
    "AAAAAAAAEAAAAAAAAAAAAAAAgAAAgAAAAICAAIAAAACAAIAAgIAAAMDAwACAgIAA",
    "AP//AAD//wAA//8AAP//AAD//wAA//8AAP//AAD//wAA//8AAP//AAD//wAA//8A",
    "AP//AAD//wAA//8AAP//AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
    "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAP//",
    "AAD//wAA//8AAP//AAD//wAA//8AAP//AAD//wAA//8AAP//AAD//wAA//8AAP//",
    "AAD//wAA//8AAP//AAA=",
);

static FAVICON: Lazy<Vec<u8>> = Lazy::new(|| STANDARD.decode(FAVICON_B64).unwrap_or_default());

const FAVICON_CACHE_AGE: u64 = 86400;

pub fn favicon(now: DateTime<Utc>) -> Artifact {
    build_response(
        now,
        StatusCode::OK,
        "image/x-icon",
        FAVICON.clone(),
        Some(FAVICON_CACHE_AGE),
    )
}

#[derive(Debug, Clone)]
pub struct RobotsTxt {
    pub disallow: Vec<&'static str>,
    pub allow: Vec<&'static str>,
    pub crawl_delay: u32,
    pub include_sitemap: bool,
}

impl RobotsTxt {
    pub fn render(&self) -> String {
        let mut content = format!("User-agent: *\nCrawl-delay: {}\n", self.crawl_delay);
        for path in &self.disallow {
            content.push_str(&format!("Disallow: {}\n", path));
        }
        for path in &self.allow {
            content.push_str(&format!("Allow: {}\n", path));
        }
        if self.include_sitemap {
            content.push_str("\n# Sitemap\nSitemap: /sitemap.xml");
        }
        content
    }

    pub fn into_producer(self) -> Producer {
        producer(move |ctx| artifact::text(ctx.now, self.render()))
    }
}

/// RFC 9116 security.txt
#[derive(Debug, Clone)]
pub struct SecurityTxt {
    pub contact_email: String,
    pub domain: String,
    pub languages: Vec<&'static str>,
}

impl SecurityTxt {
    pub fn render(&self, ctx: &RenderContext) -> String {
        format!(
            "Contact: mailto:{}\nExpires: {}\nPreferred-Languages: {}\nCanonical: https://{}/.well-known/security.txt\nAcknowledgments: https://{}/security/hall-of-fame",
            self.contact_email,
            ctx.security_txt_expiry(),
            self.languages.join(", "),
            self.domain,
            self.domain
        )
    }

    pub fn into_producer(self) -> Producer {
        producer(move |ctx| artifact::text(ctx.now, self.render(ctx)))
    }
}

/// Sitemap listing `(url, priority)` pairs; some URLs deliberately do not exist
pub fn sitemap(urls: &[(&str, f32)]) -> Producer {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (url, priority) in urls {
        xml.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <priority>{:.1}</priority>\n  </url>\n",
            url, priority
        ));
    }
    xml.push_str("</urlset>");

    producer(move |ctx| {
        build_response(
            ctx.now,
            StatusCode::OK,
            "application/xml; charset=UTF-8",
            xml.clone(),
            None,
        )
    })
}

fn favicon_producer() -> Producer {
    producer(|ctx| favicon(ctx.now))
}

/// Freshly installed Apache on Ubuntu
#[derive(Debug, Clone)]
pub struct ApacheDefault {
    pub domain: String,
}

impl Default for ApacheDefault {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
        }
    }
}

impl ApacheDefault {
    pub fn home(ctx: &mut RenderContext) -> Artifact {
        let uptime = ctx.uptime_days();
        let body = format!(
            r#"<div class="main_page">
    <div class="page_header"><span>Apache2 Ubuntu Default Page</span></div>
    <div class="section_header section_header_red">It works!</div>
    <div class="content_section_text">
        <p>This is the default welcome page used to test the correct operation of the Apache2 server after
        installation on Ubuntu systems. If you can read this page, it means that the Apache HTTP server installed
        at this site is working properly. You should <b>replace this file</b> (located at
        <tt>/var/www/html/index.html</tt>) before continuing to operate your HTTP server.</p>
        <p>If you are a normal user of this web site and don't know what this page is about, this probably means
        that the site is currently unavailable due to maintenance.</p>
    </div>
    <div class="section_header">Configuration Overview</div>
    <div class="content_section_text">
        <pre>
/etc/apache2/
|-- apache2.conf
|       `--  ports.conf
|-- mods-enabled
|-- conf-enabled
|-- sites-enabled
        </pre>
    </div>
</div>
<div class="validator"><p><small>Server uptime: {uptime} days</small></p></div>"#
        );
        html_page(ctx.now, StatusCode::OK, "Apache2 Ubuntu Default Page", &body)
    }

    fn humans(ctx: &mut RenderContext) -> Artifact {
        let content = format!(
            "/* TEAM */\nDeveloper: System Administrator\nContact: admin [at] localhost\nLocation: Cloud\n\n/* SITE */\nLast update: {}\nStandards: HTML5, CSS3\nComponents: Apache/2.4.41\nSoftware: Ubuntu 20.04 LTS",
            ctx.last_update_date()
        );
        artifact::text(ctx.now, content)
    }

    pub fn endpoints(&self) -> Vec<(String, Producer)> {
        vec![
            ("/".to_string(), producer(Self::home)),
            (
                "/robots.txt".to_string(),
                RobotsTxt {
                    disallow: vec!["/admin/", "/backup/", "/config/", "/private/"],
                    allow: vec!["/public/"],
                    crawl_delay: 10,
                    include_sitemap: true,
                }
                .into_producer(),
            ),
            ("/favicon.ico".to_string(), favicon_producer()),
            (
                "/sitemap.xml".to_string(),
                sitemap(&[("/", 1.0), ("/about", 0.8), ("/contact", 0.5)]),
            ),
            ("/humans.txt".to_string(), producer(Self::humans)),
            (
                "/.well-known/security.txt".to_string(),
                SecurityTxt {
                    contact_email: format!("security@{}", self.domain),
                    domain: self.domain.clone(),
                    languages: vec!["en"],
                }
                .into_producer(),
            ),
        ]
    }
}

/// Branded company landing site
#[derive(Debug, Clone)]
pub struct Corporate {
    pub brand_name: String,
    pub domain: String,
    pub tagline: String,
    pub tech_stack: Vec<String>,
}

impl Default for Corporate {
    fn default() -> Self {
        Self {
            brand_name: "TechSolutions Inc.".to_string(),
            domain: "techsolutions.local".to_string(),
            tagline: "Innovation in Technology".to_string(),
            tech_stack: vec![
                "Apache/2.4.41".to_string(),
                "PHP/7.4".to_string(),
                "MySQL/8.0".to_string(),
            ],
        }
    }
}

impl Corporate {
    fn stack_or(&self, fallback: &str) -> String {
        if self.tech_stack.is_empty() {
            fallback.to_string()
        } else {
            self.tech_stack.join(", ")
        }
    }

    pub fn home(&self, ctx: &mut RenderContext) -> Artifact {
        let uptime = ctx.uptime_days();
        let session = ctx.session_id();
        let body = format!(
            r#"<header>
    <div class="header-content">
        <a href="/" class="logo">{brand}</a>
        <nav><a href="/about">About</a> <a href="/services">Services</a> <a href="/contact">Contact</a></nav>
    </div>
</header>
<div class="container">
    <div class="hero">
        <h1>Welcome to {brand}</h1>
        <p class="tagline">{tagline}</p>
        <p class="description">We provide technology solutions to help businesses thrive in the digital age.</p>
        <a href="/contact" class="cta-button">Get Started</a>
    </div>
</div>
<footer>
    <p>&copy; 2024 {brand}. All rights reserved.</p>
    <p>Powered by {stack}</p>
    <small>Server Uptime: {uptime} days | Session: {session}</small>
</footer>"#,
            brand = self.brand_name,
            tagline = self.tagline,
            stack = self.stack_or("Apache"),
        );
        html_page(
            ctx.now,
            StatusCode::OK,
            &format!("{} - {}", self.brand_name, self.tagline),
            &body,
        )
    }

    fn humans(&self, ctx: &mut RenderContext) -> Artifact {
        let content = format!(
            "/* TEAM */\nCompany: {}\nDeveloper: Web Development Team\nContact: dev [at] {}\nLocation: Cloud Infrastructure\n\n/* SITE */\nLast update: {}\nStandards: HTML5, CSS3, JavaScript ES6\nComponents: {}\nFramework: Modern Web Stack",
            self.brand_name,
            self.domain,
            ctx.last_update_date(),
            self.stack_or("Apache, PHP")
        );
        artifact::text(ctx.now, content)
    }

    pub fn endpoints(&self) -> Vec<(String, Producer)> {
        let home = self.clone();
        let humans = self.clone();
        vec![
            ("/".to_string(), producer(move |ctx| home.home(ctx))),
            (
                "/robots.txt".to_string(),
                RobotsTxt {
                    disallow: vec!["/admin/", "/api/", "/backup/", "/wp-admin/", "/private/"],
                    allow: vec!["/public/", "/assets/", "/images/"],
                    crawl_delay: 5,
                    include_sitemap: true,
                }
                .into_producer(),
            ),
            ("/favicon.ico".to_string(), favicon_producer()),
            (
                "/sitemap.xml".to_string(),
                sitemap(&[
                    ("/", 1.0),
                    ("/about", 0.9),
                    ("/services", 0.9),
                    ("/contact", 0.8),
                    ("/blog", 0.7),
                    ("/products", 0.8),
                ]),
            ),
            ("/humans.txt".to_string(), producer(move |ctx| humans.humans(ctx))),
            (
                "/.well-known/security.txt".to_string(),
                SecurityTxt {
                    contact_email: format!("security@{}", self.domain),
                    domain: self.domain.clone(),
                    languages: vec!["en", "es"],
                }
                .into_producer(),
            ),
        ]
    }
}

/// Embedded device web console
#[derive(Debug, Clone)]
pub struct Device {
    pub brand: String,
    pub model: String,
    pub firmware: String,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            brand: "TP-Link".to_string(),
            model: "TL-WR841N".to_string(),
            firmware: "3.16.9 Build 20190208".to_string(),
        }
    }
}

impl Device {
    pub fn login_page(&self, ctx: &mut RenderContext) -> Artifact {
        let uptime = ctx.uptime_days();
        let body = format!(
            r#"<div class="login-container">
    <div class="header"><h1>{brand}</h1><p>{model} Wireless Router</p></div>
    <div class="login-form">
        <div class="warning">For security reasons, please change the default password after first login.</div>
        <form method="POST" action="/login">
            <label for="username">Username:</label>
            <input type="text" id="username" name="username" placeholder="admin">
            <label for="password">Password:</label>
            <input type="password" id="password" name="password" placeholder="Enter password">
            <button type="submit" class="login-button">Login</button>
        </form>
    </div>
    <div class="device-info">
        <table>
            <tr><td>Device Model:</td><td>{model}</td></tr>
            <tr><td>Firmware Version:</td><td>{firmware}</td></tr>
            <tr><td>Hardware Version:</td><td>V5.0</td></tr>
            <tr><td>Uptime:</td><td>{uptime} days</td></tr>
        </table>
    </div>
</div>"#,
            brand = self.brand,
            model = self.model,
            firmware = self.firmware,
        );
        html_page(
            ctx.now,
            StatusCode::OK,
            &format!("{} {}", self.brand, self.model),
            &body,
        )
    }

    fn humans(&self) -> String {
        format!(
            "/* DEVICE */\nManufacturer: {brand}\nModel: {model}\nFirmware: {firmware}\nType: Wireless Router\n\n/* SUPPORT */\nContact: support [at] {domain}.com\nDocumentation: /help/\nManual: /manual.pdf\n\n/* TECHNICAL */\nChipset: Atheros AR9341\nRAM: 32MB\nFlash: 4MB\nWireless: 802.11n 2.4GHz",
            brand = self.brand,
            model = self.model,
            firmware = self.firmware,
            domain = self.brand.to_lowercase().replace(' ', ""),
        )
    }

    pub fn endpoints(&self) -> Vec<(String, Producer)> {
        let login = self.clone();
        let humans = self.humans();
        vec![
            ("/".to_string(), producer(move |ctx| login.login_page(ctx))),
            (
                "/robots.txt".to_string(),
                RobotsTxt {
                    disallow: vec!["/"],
                    allow: vec![],
                    crawl_delay: 30,
                    include_sitemap: false,
                }
                .into_producer(),
            ),
            ("/favicon.ico".to_string(), favicon_producer()),
            (
                "/humans.txt".to_string(),
                producer(move |ctx| artifact::text(ctx.now, humans.clone())),
            ),
        ]
    }
}

/// Legacy-style page: bare status line and a single `Content-Type`
pub fn bare(status: StatusCode, content_type: &str, body: &str) -> Producer {
    fixed(artifact::simple(status, content_type, body.to_string()))
}
