//! Help-desk data layer: one table per record type plus the compound
//! queries that need more than a single-row lookup.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use nesk_auth::{Identity, Principal, Role, SessionError, UserDirectory, retain_visible};
use nesk_core::{CategoryId, EmailAddress, Entity, PriorityId, TeamMemberId, TicketId, UserId};
use nesk_desk::{
    ActivityEntry, Category, CategoryPatch, EmailTemplate, KbArticle, Priority, ServerAssigned,
    Setting, TeamMember, Ticket, TicketFilters, TicketReply, TicketStatus, UserAccount,
    ValidUserPatch,
};

use crate::audit::{ActivityStore, AuditError};
use crate::store::{InMemoryTable, StoreError, StoreResult, Table};

/// How many records still point at a category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryDependents {
    pub tickets: usize,
    pub articles: usize,
    pub children: usize,
}

impl CategoryDependents {
    pub fn is_empty(&self) -> bool {
        self.tickets == 0 && self.articles == 0 && self.children == 0
    }
}

/// Outcome of a guarded category removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRemoval {
    Removed(Category),
    InUse(CategoryDependents),
    Missing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tickets: usize,
    pub open_tickets: usize,
    pub resolved_tickets: usize,
    pub total_users: usize,
    pub total_kb_articles: usize,
    pub published_kb_articles: usize,
    pub team_members: usize,
}

/// Ticket counts over a window, grouped four ways.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    /// Keyed by `YYYY-MM-DD` of the open date.
    pub by_date: BTreeMap<String, usize>,
}

/// Outcome of a category update that may re-parent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryUpdate {
    Updated(Category),
    InvalidParent,
    Missing,
}

/// All help-desk tables.
///
/// Methods that hold more than one table lock at a time take them in this
/// order: categories, priorities, tickets, articles, users, team.
#[derive(Debug)]
pub struct DeskStore {
    pub users: InMemoryTable<UserAccount>,
    pub tickets: InMemoryTable<Ticket>,
    pub replies: InMemoryTable<TicketReply>,
    pub categories: InMemoryTable<Category>,
    pub priorities: InMemoryTable<Priority>,
    pub articles: InMemoryTable<KbArticle>,
    pub settings: InMemoryTable<Setting>,
    pub templates: InMemoryTable<EmailTemplate>,
    pub team: InMemoryTable<TeamMember>,
    pub activity: InMemoryTable<ActivityEntry>,
}

impl Default for DeskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeskStore {
    pub fn new() -> Self {
        Self {
            users: InMemoryTable::new("user"),
            tickets: InMemoryTable::new("ticket"),
            replies: InMemoryTable::new("ticket reply"),
            categories: InMemoryTable::new("category"),
            priorities: InMemoryTable::new("priority"),
            articles: InMemoryTable::new("kb article"),
            settings: InMemoryTable::new("setting"),
            templates: InMemoryTable::new("email template"),
            team: InMemoryTable::new("team member"),
            activity: InMemoryTable::new("activity log"),
        }
    }

    /// A store with the stock priorities and categories.
    pub fn seeded() -> StoreResult<Self> {
        let store = Self::new();
        for (name, level) in [("Low", 1), ("Medium", 2), ("High", 3), ("Critical", 4)] {
            store.priorities.insert(Priority {
                id: PriorityId::new(),
                name: name.to_string(),
                level,
            })?;
        }
        for name in [
            "Getting Started",
            "Account Management",
            "Ticket Management",
            "Troubleshooting",
            "Billing & Subscriptions",
        ] {
            store.categories.insert(Category {
                id: CategoryId::new(),
                name: name.to_string(),
                parent_id: None,
            })?;
        }
        Ok(store)
    }

    // ── users ───────────────────────────────────────────────────────────────

    pub fn find_user_by_email(&self, email: &EmailAddress) -> StoreResult<Option<UserAccount>> {
        Ok(self
            .users
            .read()?
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    /// Resolve a user by email, creating a customer account when none
    /// exists. On an existing account the name is refreshed.
    pub fn upsert_user_by_email(
        &self,
        email: &EmailAddress,
        name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<UserAccount> {
        let mut rows = self.users.write()?;

        if let Some(user) = rows.values_mut().find(|u| &u.email == email) {
            user.name = Some(name.to_string());
            return Ok(user.clone());
        }

        let user = UserAccount::customer(email.clone(), Some(name.to_string()), now);
        rows.insert(user.id, user.clone());
        debug!(user_id = %user.id, "created customer account");
        Ok(user)
    }

    /// Apply a profile patch. An email already used by another account is a
    /// conflict.
    pub fn update_user(
        &self,
        id: &UserId,
        patch: &ValidUserPatch,
    ) -> StoreResult<Option<UserAccount>> {
        let mut rows = self.users.write()?;

        if let Some(email) = &patch.email {
            if rows.values().any(|u| &u.email == email && &u.id != id) {
                return Err(StoreError::Conflict("email is already in use".into()));
            }
        }

        Ok(rows.get_mut(id).map(|user| {
            patch.apply(user);
            user.clone()
        }))
    }

    /// Set a user's role. Returns the previous role.
    pub fn set_user_role(&self, id: &UserId, role: Role) -> StoreResult<Option<Role>> {
        self.users.modify(id, |user: &mut UserAccount| {
            let previous = user.role();
            user.role = ServerAssigned::assign(role);
            Ok::<_, StoreError>(previous)
        })
    }

    /// Remove a user together with their tickets and those tickets' replies.
    pub fn delete_user(&self, id: &UserId) -> StoreResult<Option<UserAccount>> {
        let Some(user) = self.users.remove(id)? else {
            return Ok(None);
        };

        let mut tickets = self.tickets.write()?;
        let owned: Vec<TicketId> = tickets
            .values()
            .filter(|t| &t.user_id == id)
            .map(|t| t.id)
            .collect();
        tickets.retain(|_, t| &t.user_id != id);
        drop(tickets);

        self.replies
            .write()?
            .retain(|_, r| !owned.contains(&r.ticket_id));

        Ok(Some(user))
    }

    // ── tickets ─────────────────────────────────────────────────────────────

    /// Replies on a ticket, oldest first, with internal notes removed unless
    /// `reader` is staff.
    pub fn replies_visible_to(
        &self,
        ticket_id: &TicketId,
        reader: &Principal,
    ) -> StoreResult<Vec<TicketReply>> {
        let mut replies = self.replies.find(|r: &TicketReply| &r.ticket_id == ticket_id)?;
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        retain_visible(reader, &mut replies);
        Ok(replies)
    }

    /// Staff ticket list, most recently updated first.
    pub fn list_tickets(
        &self,
        filters: &TicketFilters,
        status: Option<TicketStatus>,
    ) -> StoreResult<Vec<Ticket>> {
        let priority = match &filters.priority {
            Some(name) if !name.trim().is_empty() => Some(self.priority_ids_named(name)?),
            _ => None,
        };
        let category = match &filters.category {
            Some(name) if !name.trim().is_empty() => Some(self.category_ids_named(name)?),
            _ => None,
        };

        let mut tickets = self.tickets.find(|t: &Ticket| {
            status.is_none_or(|s| t.status == s)
                && priority
                    .as_ref()
                    .is_none_or(|ids| t.priority_id.is_some_and(|p| ids.contains(&p)))
                && category
                    .as_ref()
                    .is_none_or(|ids| t.category_id.is_some_and(|c| ids.contains(&c)))
                && filters.matches_search(t)
        })?;
        tickets.sort_by(|a, b| b.last_update.cmp(&a.last_update));
        Ok(tickets)
    }

    fn priority_ids_named(&self, name: &str) -> StoreResult<Vec<PriorityId>> {
        let name = name.trim();
        Ok(self
            .priorities
            .find(|p: &Priority| p.name.eq_ignore_ascii_case(name))?
            .into_iter()
            .map(|p| p.id)
            .collect())
    }

    fn category_ids_named(&self, name: &str) -> StoreResult<Vec<CategoryId>> {
        let name = name.trim();
        Ok(self
            .categories
            .find(|c: &Category| c.name.eq_ignore_ascii_case(name))?
            .into_iter()
            .map(|c| c.id)
            .collect())
    }

    pub fn priorities_by_level(&self) -> StoreResult<Vec<Priority>> {
        let mut priorities = self.priorities.list()?;
        priorities.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
        Ok(priorities)
    }

    pub fn categories_by_name(&self) -> StoreResult<Vec<Category>> {
        let mut categories = self.categories.list()?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    // ── categories ──────────────────────────────────────────────────────────

    pub fn category_dependents(&self, id: &CategoryId) -> StoreResult<CategoryDependents> {
        let children = self
            .categories
            .read()?
            .values()
            .filter(|c| c.parent_id == Some(*id))
            .count();
        let tickets = self.tickets_in(id)?;
        let articles = self.articles_in(id)?;
        Ok(CategoryDependents {
            tickets,
            articles,
            children,
        })
    }

    fn tickets_in(&self, id: &CategoryId) -> StoreResult<usize> {
        Ok(self.tickets.read()?.values().filter(|t| t.category_id == Some(*id)).count())
    }

    fn articles_in(&self, id: &CategoryId) -> StoreResult<usize> {
        Ok(self.articles.read()?.values().filter(|a| a.category_id == Some(*id)).count())
    }

    /// Run `write` with the category table read-locked, so `category` cannot
    /// be removed before the write lands. Returns `Ok(None)` without running
    /// `write` when the category does not exist.
    ///
    /// `write` must not touch the category table.
    pub fn with_category<R, E, F>(
        &self,
        category: Option<CategoryId>,
        write: F,
    ) -> Result<Option<R>, E>
    where
        F: FnOnce() -> Result<R, E>,
        E: From<StoreError>,
    {
        let categories = self.categories.read()?;
        if category.is_some_and(|id| !categories.contains_key(&id)) {
            return Ok(None);
        }
        let out = write()?;
        drop(categories);
        Ok(Some(out))
    }

    /// Insert a category whose parent, if any, exists. Returns `false` when
    /// the parent is missing.
    pub fn insert_category(&self, category: Category) -> StoreResult<bool> {
        let mut categories = self.categories.write()?;
        if category.parent_id.is_some_and(|parent| !categories.contains_key(&parent)) {
            return Ok(false);
        }
        if categories.contains_key(&category.id) {
            return Err(StoreError::Conflict("category already exists".into()));
        }
        categories.insert(category.id, category);
        Ok(true)
    }

    /// Apply `patch` to a category, checking a new parent under the same
    /// lock.
    pub fn update_category(
        &self,
        id: &CategoryId,
        patch: &CategoryPatch,
    ) -> StoreResult<CategoryUpdate> {
        let mut categories = self.categories.write()?;
        if let Some(Some(parent)) = patch.parent_id {
            if !categories.contains_key(&parent) {
                return Ok(CategoryUpdate::InvalidParent);
            }
        }
        Ok(categories.get_mut(id).map_or(CategoryUpdate::Missing, |category| {
            patch.apply(category);
            CategoryUpdate::Updated(category.clone())
        }))
    }

    /// Remove a category only if nothing references it. The category table
    /// stays locked from the dependents check until the removal.
    pub fn remove_category_if_unused(&self, id: &CategoryId) -> StoreResult<CategoryRemoval> {
        let mut categories = self.categories.write()?;
        if !categories.contains_key(id) {
            return Ok(CategoryRemoval::Missing);
        }

        let children = categories.values().filter(|c| c.parent_id == Some(*id)).count();
        let tickets = self.tickets_in(id)?;
        let articles = self.articles_in(id)?;
        let dependents = CategoryDependents {
            tickets,
            articles,
            children,
        };
        if !dependents.is_empty() {
            return Ok(CategoryRemoval::InUse(dependents));
        }

        Ok(categories
            .remove(id)
            .map_or(CategoryRemoval::Missing, CategoryRemoval::Removed))
    }

    // ── settings / templates / team ─────────────────────────────────────────

    /// Insert or update the setting stored under `key`.
    pub fn upsert_setting(
        &self,
        key: &str,
        value: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Setting> {
        let mut rows = self.settings.write()?;

        if let Some(setting) = rows.values_mut().find(|s| s.key == key) {
            setting.value = value.to_string();
            setting.category = category.to_string();
            setting.updated_at = now;
            return Ok(setting.clone());
        }

        let setting = Setting {
            id: nesk_core::SettingId::new(),
            key: key.to_string(),
            value: value.to_string(),
            category: category.to_string(),
            updated_at: now,
        };
        rows.insert(setting.id, setting.clone());
        Ok(setting)
    }

    pub fn settings_in(&self, category: Option<&str>) -> StoreResult<Vec<Setting>> {
        let mut settings = self
            .settings
            .find(|s: &Setting| category.is_none_or(|c| s.category == c))?;
        settings.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.key.cmp(&b.key)));
        Ok(settings)
    }

    /// Insert a template. Names are unique.
    pub fn insert_template(&self, template: EmailTemplate) -> StoreResult<()> {
        let mut rows = self.templates.write()?;
        if rows.values().any(|t| t.name == template.name) {
            return Err(StoreError::Conflict("template name is already in use".into()));
        }
        rows.insert(template.id, template);
        Ok(())
    }

    /// Insert a team member. Emails are unique.
    pub fn insert_team_member(&self, member: TeamMember) -> StoreResult<()> {
        let mut rows = self.team.write()?;
        if rows.values().any(|m| m.email == member.email) {
            return Err(StoreError::Conflict("email is already in use".into()));
        }
        rows.insert(member.id, member);
        Ok(())
    }

    /// Check that no other member already uses `email`.
    pub fn team_email_free(
        &self,
        email: &EmailAddress,
        except: &TeamMemberId,
    ) -> StoreResult<bool> {
        Ok(!self
            .team
            .read()?
            .values()
            .any(|m| &m.email == email && &m.id != except))
    }

    /// The team member for `email`, created on first use.
    pub fn ensure_team_member(
        &self,
        email: &EmailAddress,
        name: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> StoreResult<TeamMember> {
        let mut rows = self.team.write()?;
        if let Some(member) = rows.values().find(|m| &m.email == email) {
            return Ok(member.clone());
        }

        let member = TeamMember {
            id: TeamMemberId::new(),
            email: email.clone(),
            name: name.to_string(),
            role,
            created_at: now,
        };
        rows.insert(member.id, member.clone());
        Ok(member)
    }

    // ── knowledge base ──────────────────────────────────────────────────────

    /// Published articles, newest update first.
    pub fn published_articles(
        &self,
        category: Option<CategoryId>,
        search: Option<&str>,
    ) -> StoreResult<Vec<KbArticle>> {
        let mut articles = self.articles.find(|a: &KbArticle| {
            a.published
                && category.is_none_or(|c| a.category_id == Some(c))
                && search.is_none_or(|s| a.matches(s))
        })?;
        articles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(articles)
    }

    /// Categories that hold at least one published article, with counts.
    pub fn kb_categories(&self) -> StoreResult<Vec<(Category, usize)>> {
        let mut counts: BTreeMap<CategoryId, usize> = BTreeMap::new();
        for article in self.articles.read()?.values().filter(|a| a.published) {
            if let Some(category_id) = article.category_id {
                *counts.entry(category_id).or_default() += 1;
            }
        }

        let categories = self.categories.read()?;
        let mut out: Vec<(Category, usize)> = counts
            .into_iter()
            .filter_map(|(id, n)| categories.get(&id).map(|c| (c.clone(), n)))
            .collect();
        out.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(out)
    }

    // ── reports ─────────────────────────────────────────────────────────────

    pub fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        let tickets = self.tickets.read()?;
        let articles = self.articles.read()?;
        Ok(DashboardStats {
            total_tickets: tickets.len(),
            open_tickets: tickets.values().filter(|t| t.status == TicketStatus::Open).count(),
            resolved_tickets: tickets
                .values()
                .filter(|t| t.status == TicketStatus::Resolved)
                .count(),
            total_users: self.users.read()?.len(),
            total_kb_articles: articles.len(),
            published_kb_articles: articles.values().filter(|a| a.published).count(),
            team_members: self.team.read()?.len(),
        })
    }

    /// Stats over tickets opened in the last `days` days. A window reaching
    /// past the earliest representable time covers every ticket.
    pub fn ticket_stats(&self, days: u32, now: DateTime<Utc>) -> StoreResult<TicketStats> {
        let since = Duration::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let categories = self.categories.read()?;
        let priorities = self.priorities.read()?;

        let mut stats = TicketStats::default();
        for ticket in self.tickets.read()?.values().filter(|t| t.opened_at >= since) {
            stats.total += 1;
            *stats.by_status.entry(ticket.status.to_string()).or_default() += 1;

            let priority = ticket
                .priority_id
                .and_then(|id| priorities.get(&id))
                .map_or("None", |p| p.name.as_str());
            *stats.by_priority.entry(priority.to_string()).or_default() += 1;

            let category = ticket
                .category_id
                .and_then(|id| categories.get(&id))
                .map_or("Uncategorized", |c| c.name.as_str());
            *stats.by_category.entry(category.to_string()).or_default() += 1;

            let date = ticket.opened_at.format("%Y-%m-%d").to_string();
            *stats.by_date.entry(date).or_default() += 1;
        }
        Ok(stats)
    }
}

impl UserDirectory for DeskStore {
    fn identity(&self, user_id: &UserId) -> Result<Option<Identity>, SessionError> {
        self.users
            .get(user_id)
            .map(|user| user.map(|u| u.identity()))
            .map_err(|err| SessionError::Backend(err.to_string()))
    }
}

impl ActivityStore for DeskStore {
    fn append(&self, entry: ActivityEntry) -> Result<(), AuditError> {
        self.activity
            .insert(entry)
            .map_err(|err| AuditError::Unavailable(err.to_string()))
    }

    fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>, AuditError> {
        let mut entries = self
            .activity
            .list()
            .map_err(|err| AuditError::Unavailable(err.to_string()))?;
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id().cmp(a.id()))
        });
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, mpsc};
    use std::thread;

    use nesk_desk::{AuthorType, EntityType, NewActivity};

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::parse(raw).unwrap()
    }

    fn store_with_ticket() -> (DeskStore, UserAccount, Ticket) {
        let store = DeskStore::seeded().unwrap();
        let now = Utc::now();
        let user = store
            .upsert_user_by_email(&email("jane@example.com"), "Jane", now)
            .unwrap();
        let ticket = Ticket::open(user.id, "Login issue".into(), None, None, now);
        store.tickets.insert(ticket.clone()).unwrap();
        (store, user, ticket)
    }

    #[test]
    fn upsert_by_email_reuses_and_renames() {
        let store = DeskStore::new();
        let now = Utc::now();
        let first = store
            .upsert_user_by_email(&email("jane@example.com"), "Jane", now)
            .unwrap();
        let second = store
            .upsert_user_by_email(&email("JANE@example.com"), "Jane Doe", now)
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("Jane Doe"));
        assert_eq!(store.users.list().unwrap().len(), 1);
    }

    #[test]
    fn internal_replies_hidden_from_customers() {
        let (store, user, ticket) = store_with_ticket();
        let now = Utc::now();
        store
            .replies
            .insert(TicketReply::from_customer(ticket.id, user.id, "help".into(), now))
            .unwrap();
        store
            .replies
            .insert(TicketReply::from_staff(ticket.id, UserId::new(), "note".into(), true, now))
            .unwrap();

        let customer = Principal::authenticated(user.id, user.email.clone(), Role::User);
        let visible = store.replies_visible_to(&ticket.id, &customer).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].author_type, AuthorType::Customer);

        let staff =
            Principal::authenticated(UserId::new(), email("agent@example.com"), Role::Staff);
        assert_eq!(store.replies_visible_to(&ticket.id, &staff).unwrap().len(), 2);
    }

    #[test]
    fn category_in_use_is_not_removed() {
        let (store, _user, ticket) = store_with_ticket();
        let category = store.categories.list().unwrap().remove(0);
        store
            .tickets
            .modify(&ticket.id, |t: &mut Ticket| {
                t.category_id = Some(category.id);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let removal = store.remove_category_if_unused(&category.id).unwrap();
        assert!(matches!(removal, CategoryRemoval::InUse(d) if d.tickets == 1));
        assert!(store.categories.get(&category.id).unwrap().is_some());
    }

    #[test]
    fn category_reads_and_ticket_writes_interleave_without_stalling() {
        let (store, _user, ticket) = store_with_ticket();
        let category = store.categories.list().unwrap().remove(0);
        store
            .tickets
            .modify(&ticket.id, |t: &mut Ticket| {
                t.category_id = Some(category.id);
                Ok::<_, StoreError>(())
            })
            .unwrap();
        let store = Arc::new(store);
        let (done_tx, done_rx) = mpsc::channel();

        for worker in 0..6 {
            let store = Arc::clone(&store);
            let done = done_tx.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    match worker % 3 {
                        0 => {
                            store.category_dependents(&category.id).unwrap();
                            store.ticket_stats(30, Utc::now()).unwrap();
                        }
                        1 => {
                            let removal = store.remove_category_if_unused(&category.id);
                            assert!(matches!(removal, Ok(CategoryRemoval::InUse(_))));
                        }
                        _ => {
                            store
                                .tickets
                                .modify(&ticket.id, |t: &mut Ticket| {
                                    t.touch(Utc::now());
                                    Ok::<_, StoreError>(())
                                })
                                .unwrap();
                        }
                    }
                }
                done.send(()).unwrap();
            });
        }
        drop(done_tx);

        for _ in 0..6 {
            done_rx
                .recv_timeout(std::time::Duration::from_secs(20))
                .expect("store operations stalled");
        }
    }

    #[test]
    fn category_write_holds_off_removal_until_it_lands() {
        let (store, _user, ticket) = store_with_ticket();
        let category = store.categories.list().unwrap().remove(0);
        let store = Arc::new(store);
        let (started_tx, started_rx) = mpsc::channel();
        let (go_tx, go_rx) = mpsc::channel::<()>();

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .with_category(Some(category.id), || {
                        started_tx.send(()).unwrap();
                        go_rx.recv().unwrap();
                        store.tickets.modify(&ticket.id, |t: &mut Ticket| {
                            t.set_category(Some(category.id), Utc::now());
                            Ok::<_, StoreError>(())
                        })
                    })
                    .unwrap()
            })
        };
        started_rx.recv().unwrap();

        let remover = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.remove_category_if_unused(&category.id).unwrap())
        };
        thread::sleep(std::time::Duration::from_millis(50));
        go_tx.send(()).unwrap();

        assert!(writer.join().unwrap().is_some());
        let removal = remover.join().unwrap();
        assert!(matches!(removal, CategoryRemoval::InUse(d) if d.tickets == 1));
        assert!(store.categories.get(&category.id).unwrap().is_some());
    }

    #[test]
    fn with_category_skips_the_write_for_a_missing_category() {
        let (store, _user, _ticket) = store_with_ticket();
        let mut ran = false;
        let out = store
            .with_category(Some(CategoryId::new()), || {
                ran = true;
                Ok::<_, StoreError>(())
            })
            .unwrap();

        assert_eq!(out, None);
        assert!(!ran);
        assert_eq!(store.with_category(None, || Ok::<_, StoreError>(1)).unwrap(), Some(1));
    }

    #[test]
    fn category_parent_is_checked_on_insert_and_update() {
        let store = DeskStore::seeded().unwrap();
        let parent = store.categories.list().unwrap().remove(0);
        let orphan = Category {
            id: CategoryId::new(),
            name: "Orphan".into(),
            parent_id: Some(CategoryId::new()),
        };
        assert!(!store.insert_category(orphan.clone()).unwrap());
        assert!(store.categories.get(&orphan.id).unwrap().is_none());

        let child = Category {
            parent_id: Some(parent.id),
            ..orphan
        };
        assert!(store.insert_category(child.clone()).unwrap());

        let patch = CategoryPatch {
            parent_id: Some(Some(CategoryId::new())),
            ..Default::default()
        };
        assert_eq!(
            store.update_category(&child.id, &patch).unwrap(),
            CategoryUpdate::InvalidParent
        );

        let patch = CategoryPatch {
            parent_id: Some(None),
            ..Default::default()
        };
        assert!(matches!(
            store.update_category(&child.id, &patch).unwrap(),
            CategoryUpdate::Updated(c) if c.parent_id.is_none()
        ));
        assert_eq!(
            store.update_category(&CategoryId::new(), &patch).unwrap(),
            CategoryUpdate::Missing
        );
    }

    #[test]
    fn stats_window_beyond_calendar_covers_everything() {
        let (store, _user, _ticket) = store_with_ticket();
        let stats = store.ticket_stats(u32::MAX, Utc::now()).unwrap();
        assert_eq!(stats.total, 1);
    }

    #[test]
    fn list_tickets_filters_by_priority_name() {
        let (store, user, _ticket) = store_with_ticket();
        let high = store
            .priorities
            .find(|p: &Priority| p.name == "High")
            .unwrap()
            .remove(0);
        let urgent = Ticket::open(user.id, "Outage".into(), None, Some(high.id), Utc::now());
        store.tickets.insert(urgent.clone()).unwrap();

        let filters = TicketFilters {
            priority: Some("high".into()),
            ..Default::default()
        };
        let hits = store.list_tickets(&filters, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, urgent.id);
    }

    #[test]
    fn deleting_a_user_removes_their_tickets() {
        let (store, user, ticket) = store_with_ticket();
        store
            .replies
            .insert(TicketReply::from_customer(ticket.id, user.id, "hi".into(), Utc::now()))
            .unwrap();

        store.delete_user(&user.id).unwrap();

        assert!(store.tickets.get(&ticket.id).unwrap().is_none());
        assert!(store.replies.list().unwrap().is_empty());
    }

    #[test]
    fn update_user_rejects_taken_email() {
        let (store, user, _ticket) = store_with_ticket();
        store
            .upsert_user_by_email(&email("bob@example.com"), "Bob", Utc::now())
            .unwrap();

        let patch = ValidUserPatch {
            email: Some(email("bob@example.com")),
            ..Default::default()
        };
        assert!(matches!(
            store.update_user(&user.id, &patch),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn recent_activity_is_newest_first() {
        let store = DeskStore::new();
        let start = Utc::now();
        for (i, action) in ["create", "update", "delete"].into_iter().enumerate() {
            let entry = NewActivity::new(action, EntityType::Category)
                .into_entry(start + Duration::seconds(i as i64));
            store.append(entry).unwrap();
        }

        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "delete");
        assert_eq!(recent[1].action, "update");
    }
}
