use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::{CustomNamespace, ResolvedSettings};

pub const NS_MAIN: i32 = 0;
pub const NS_TALK: i32 = 1;
pub const NS_USER: i32 = 2;
pub const NS_PROJECT: i32 = 4;
pub const NS_FILE: i32 = 6;
pub const NS_MEDIAWIKI: i32 = 8;
pub const NS_TEMPLATE: i32 = 10;
pub const NS_HELP: i32 = 12;
pub const NS_CATEGORY: i32 = 14;
pub const NS_MODULE: i32 = 828;

const STANDARD_NAMESPACES: &[(i32, &str)] = &[
    (NS_MAIN, ""),
    (NS_TALK, "Talk"),
    (NS_USER, "User"),
    (3, "User talk"),
    (NS_PROJECT, "Project"),
    (5, "Project talk"),
    (NS_FILE, "File"),
    (7, "File talk"),
    (NS_MEDIAWIKI, "MediaWiki"),
    (9, "MediaWiki talk"),
    (NS_TEMPLATE, "Template"),
    (11, "Template talk"),
    (NS_HELP, "Help"),
    (13, "Help talk"),
    (NS_CATEGORY, "Category"),
    (15, "Category talk"),
    (NS_MODULE, "Module"),
    (829, "Module talk"),
];

/// Maps namespace ids to their canonical names.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    custom: Vec<CustomNamespace>,
}

impl NamespaceTable {
    pub fn new(custom: Vec<CustomNamespace>) -> Self {
        Self { custom }
    }

    pub fn name(&self, namespace: i32) -> Option<&str> {
        STANDARD_NAMESPACES
            .iter()
            .find(|(id, _)| *id == namespace)
            .map(|(_, name)| *name)
            .or_else(|| {
                self.custom
                    .iter()
                    .find(|ns| ns.id == namespace)
                    .map(|ns| ns.name.as_str())
            })
    }

    pub fn id(&self, name: &str) -> Option<i32> {
        let wanted = normalize_text(name);
        STANDARD_NAMESPACES
            .iter()
            .filter(|(id, _)| *id != NS_MAIN)
            .find(|(_, candidate)| candidate.eq_ignore_ascii_case(&wanted))
            .map(|(id, _)| *id)
            .or_else(|| {
                self.custom
                    .iter()
                    .find(|ns| normalize_text(&ns.name).eq_ignore_ascii_case(&wanted))
                    .map(|ns| ns.id)
            })
    }
}

/// Canonical title: namespace plus db key (underscored, first letter upper-cased).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageTitle {
    pub namespace: i32,
    pub namespace_name: String,
    pub db_key: String,
}

impl PageTitle {
    pub fn new(namespaces: &NamespaceTable, namespace: i32, text: &str) -> Result<Self> {
        let namespace_name = namespaces
            .name(namespace)
            .with_context(|| format!("unknown namespace id {namespace}"))?
            .to_string();
        let db_key = to_db_key(text);
        if db_key.is_empty() {
            bail!("title text cannot be empty");
        }
        Ok(Self {
            namespace,
            namespace_name,
            db_key,
        })
    }

    /// Parse prefixed text such as `Talk:Example page`.
    pub fn parse(namespaces: &NamespaceTable, text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let trimmed = trimmed.strip_prefix(':').unwrap_or(trimmed).trim_start();
        if let Some((prefix, rest)) = trimmed.split_once(':')
            && let Some(namespace) = namespaces.id(prefix)
        {
            return Self::new(namespaces, namespace, rest);
        }
        Self::new(namespaces, NS_MAIN, trimmed)
    }

    /// Title with namespace prefix and spaces, as shown to readers.
    pub fn prefixed_text(&self) -> String {
        self.prefixed_db_key().replace('_', " ")
    }

    pub fn prefixed_db_key(&self) -> String {
        if self.namespace_name.is_empty() {
            self.db_key.clone()
        } else {
            format!("{}:{}", self.namespace_name.replace(' ', "_"), self.db_key)
        }
    }
}

/// A full page record as supplied by the host on save and delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPage {
    #[serde(default)]
    pub id: Option<u64>,
    pub title: String,
}

/// Only the page identity, without a resolved title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIdentity {
    pub id: u64,
    pub namespace: i32,
    pub db_key: String,
}

/// Either shape the host may hand over for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    Page(WikiPage),
    Identity(PageIdentity),
}

impl PageRef {
    pub fn canonical_title(&self, namespaces: &NamespaceTable) -> Result<PageTitle> {
        match self {
            Self::Page(page) => PageTitle::parse(namespaces, &page.title),
            Self::Identity(identity) => {
                PageTitle::new(namespaces, identity.namespace, &identity.db_key)
                    .with_context(|| format!("cannot resolve page id {}", identity.id))
            }
        }
    }
}

/// Resolves a title to its absolute URL.
pub trait PermalinkSource {
    fn namespaces(&self) -> &NamespaceTable;
    fn full_url(&self, title: &PageTitle) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct Permalinks {
    server: String,
    article_path: String,
    namespaces: NamespaceTable,
}

impl Permalinks {
    pub fn new(server: &str, article_path: &str, namespaces: NamespaceTable) -> Self {
        Self {
            server: server.trim().trim_end_matches('/').to_string(),
            article_path: article_path.trim().to_string(),
            namespaces,
        }
    }

    pub fn from_settings(settings: &ResolvedSettings) -> Result<Self> {
        let server = settings
            .wiki_url
            .as_deref()
            .context("wiki url is not configured (set [wiki].url or WIKI_URL)")?;
        Ok(Self::new(
            server,
            &settings.article_path,
            NamespaceTable::new(settings.custom_namespaces.clone()),
        ))
    }
}

impl PermalinkSource for Permalinks {
    fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    fn full_url(&self, title: &PageTitle) -> Result<String> {
        let path = if self.article_path.contains("$1") {
            self.article_path
                .replace("$1", &encode_path_segment(&title.prefixed_db_key()))
        } else {
            format!(
                "{}/{}",
                self.article_path.trim_end_matches('/'),
                encode_path_segment(&title.prefixed_db_key())
            )
        };
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        let raw = format!("{}{}", self.server, path);
        let url = Url::parse(&raw).with_context(|| format!("invalid permalink: {raw}"))?;
        Ok(url.to_string())
    }
}

fn normalize_text(value: &str) -> String {
    value
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_db_key(text: &str) -> String {
    let normalized = normalize_text(text);
    let mut chars = normalized.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut out = String::with_capacity(normalized.len());
    out.extend(first.to_uppercase());
    out.push_str(chars.as_str());
    out.replace(' ', "_")
}

/// Percent-encode like MediaWiki's `wfUrlencode`: everything but unreserved
/// characters and `;@$!*(),/~:` is escaped.
fn encode_path_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"-_.~;@$!*(),/:".contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
