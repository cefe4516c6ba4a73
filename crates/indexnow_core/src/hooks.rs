use serde::{Deserialize, Serialize};

use crate::config::KeySource;
use crate::log::NotifyLog;
use crate::notifier::{Notifier, NotifyOutcome, SkipReason};
use crate::title::{PageRef, PageTitle, PermalinkSource, WikiPage};
use crate::transport::SubmitTransport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSaveEvent {
    pub page: WikiPage,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMoveEvent {
    pub old_title: String,
    pub new_title: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub page_id: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDeleteEvent {
    pub page: PageRef,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One content-change event as a host would pipe it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HookEvent {
    PageSaveComplete(PageSaveEvent),
    PageMoveComplete(PageMoveEvent),
    PageDeleteComplete(PageDeleteEvent),
}

/// Turns content-change events into single `notify` calls.
pub struct Hooks<P, K, L, T> {
    permalinks: P,
    notifier: Notifier<K, L, T>,
}

impl<P, K, L, T> Hooks<P, K, L, T>
where
    P: PermalinkSource,
    K: KeySource,
    L: NotifyLog,
    T: SubmitTransport,
{
    pub fn new(permalinks: P, notifier: Notifier<K, L, T>) -> Self {
        Self {
            permalinks,
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier<K, L, T> {
        &self.notifier
    }

    pub fn on_page_save_complete(&self, event: &PageSaveEvent) -> bool {
        self.save(event);
        true
    }

    pub fn on_page_move_complete(&self, event: &PageMoveEvent) -> bool {
        self.relocate(event);
        true
    }

    pub fn on_page_delete_complete(&self, event: &PageDeleteEvent) -> bool {
        self.delete(event);
        true
    }

    pub fn dispatch(&self, event: &HookEvent) -> bool {
        self.dispatch_outcome(event);
        true
    }

    /// Like [`Hooks::dispatch`], but exposes what happened.
    pub fn dispatch_outcome(&self, event: &HookEvent) -> NotifyOutcome {
        match event {
            HookEvent::PageSaveComplete(event) => self.save(event),
            HookEvent::PageMoveComplete(event) => self.relocate(event),
            HookEvent::PageDeleteComplete(event) => self.delete(event),
        }
    }

    fn save(&self, event: &PageSaveEvent) -> NotifyOutcome {
        let namespaces = self.permalinks.namespaces();
        let title = match PageTitle::parse(namespaces, &event.page.title) {
            Ok(title) => title,
            Err(error) => return self.unresolved("PageSaveComplete", &event.page.title, &error),
        };
        self.notifier.log().info(
            "PageSaveComplete triggered.",
            &[("title", title.prefixed_text())],
        );
        self.submit(&title)
    }

    fn relocate(&self, event: &PageMoveEvent) -> NotifyOutcome {
        let namespaces = self.permalinks.namespaces();
        let old = PageTitle::parse(namespaces, &event.old_title)
            .map(|title| title.prefixed_text())
            .unwrap_or_else(|_| event.old_title.clone());
        let new_title = match PageTitle::parse(namespaces, &event.new_title) {
            Ok(title) => title,
            Err(error) => return self.unresolved("PageMoveComplete", &event.new_title, &error),
        };
        self.notifier.log().info(
            "PageMoveComplete triggered.",
            &[("old", old), ("new", new_title.prefixed_text())],
        );
        self.submit(&new_title)
    }

    fn delete(&self, event: &PageDeleteEvent) -> NotifyOutcome {
        let title = match event.page.canonical_title(self.permalinks.namespaces()) {
            Ok(title) => title,
            Err(error) => {
                return self.unresolved("PageDeleteComplete", &describe(&event.page), &error);
            }
        };
        self.notifier.log().info(
            "PageDeleteComplete triggered.",
            &[("title", title.prefixed_text())],
        );
        self.submit(&title)
    }

    fn submit(&self, title: &PageTitle) -> NotifyOutcome {
        match self.permalinks.full_url(title) {
            Ok(url) => self.notifier.notify(&url),
            Err(error) => {
                self.notifier.log().error(
                    "Failed to build permalink.",
                    &[
                        ("title", title.prefixed_text()),
                        ("error", format!("{error:#}")),
                    ],
                );
                NotifyOutcome::Skipped(SkipReason::UnresolvedTitle)
            }
        }
    }

    fn unresolved(&self, hook: &str, raw: &str, error: &anyhow::Error) -> NotifyOutcome {
        self.notifier.log().error(
            "Failed to resolve page title.",
            &[
                ("hook", hook.to_string()),
                ("title", raw.to_string()),
                ("error", format!("{error:#}")),
            ],
        );
        NotifyOutcome::Skipped(SkipReason::UnresolvedTitle)
    }
}

fn describe(page: &PageRef) -> String {
    match page {
        PageRef::Page(page) => page.title.clone(),
        PageRef::Identity(identity) => format!(
            "#{} ({}:{})",
            identity.id, identity.namespace, identity.db_key
        ),
    }
}
