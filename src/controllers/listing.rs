//! Paginated, signature-verified user listing.

use tokio::sync::watch;

use crate::client::UserApi;
use crate::error::ApiError;
use crate::types::{NewUser, Pagination, RoleFilter, StatusFilter, User, UserFilters, UserUpdate};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Success,
    Error(String),
}

/// Drives one listing view: which page is loaded, which records survived
/// verification, and how the client-side filters narrow them.
///
/// Pagination always reflects what the server reported, so the page count
/// can promise more rows than are shown once unverifiable records are
/// dropped.
pub struct UserListing<'a, A: UserApi + ?Sized> {
    api: &'a A,
    page: u32,
    limit: u32,
    filters: UserFilters,
    state: LoadState,
    users: Vec<User>,
    pagination: Option<Pagination>,
    deleting: watch::Sender<Option<String>>,
}

impl<'a, A: UserApi + ?Sized> UserListing<'a, A> {
    pub fn new(api: &'a A, limit: u32) -> Self {
        Self {
            api,
            page: 1,
            limit: limit.max(1),
            filters: UserFilters::default(),
            state: LoadState::Idle,
            users: Vec::new(),
            pagination: None,
            deleting: watch::Sender::new(None),
        }
    }

    /// Start with `filters` already applied, without fetching.
    pub fn with_filters(mut self, filters: UserFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn filters(&self) -> &UserFilters {
        &self.filters
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    /// Records that passed verification, before client-side filtering.
    pub fn verified_users(&self) -> &[User] {
        &self.users
    }

    /// Id of the record currently being deleted.
    pub fn deleting(&self) -> Option<String> {
        self.deleting.borrow().clone()
    }

    /// Follow the in-flight delete from outside while `delete_user` holds
    /// the listing.
    pub fn subscribe_deleting(&self) -> watch::Receiver<Option<String>> {
        self.deleting.subscribe()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn dismiss_error(&mut self) {
        if matches!(self.state, LoadState::Error(_)) {
            self.state = LoadState::Idle;
        }
    }

    /// Verified records of the current page that match the filters.
    pub fn visible_users(&self) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| self.filters.matches(u))
            .collect()
    }

    /// Fetch the current page and keep only records that verify.
    pub async fn load_users(&mut self) {
        self.state = LoadState::Loading;

        let page = match self.api.list_users(self.page, self.limit).await {
            Ok(page) => page,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        self.users = verify_records(self.api, page.data).await;
        self.pagination = Some(page.pagination);
        self.state = LoadState::Success;

        tracing::debug!(
            page = self.page,
            shown = self.users.len(),
            total = page.pagination.total,
            "users loaded"
        );
    }

    pub async fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
        self.load_users().await;
    }

    pub async fn set_search(&mut self, search: impl Into<String>) {
        self.filters.search = search.into();
        self.reset_and_reload().await;
    }

    pub async fn set_role_filter(&mut self, role: RoleFilter) {
        self.filters.role = role;
        self.reset_and_reload().await;
    }

    pub async fn set_status_filter(&mut self, status: StatusFilter) {
        self.filters.status = status;
        self.reset_and_reload().await;
    }

    async fn reset_and_reload(&mut self) {
        self.page = 1;
        self.load_users().await;
    }

    pub async fn create_user(&mut self, user: &NewUser) -> Result<User, ApiError> {
        let result = self.api.create_user(user).await;
        self.reload_after(result).await
    }

    pub async fn update_user(&mut self, id: &str, update: &UserUpdate) -> Result<User, ApiError> {
        let result = self.api.update_user(id, update).await;
        self.reload_after(result).await
    }

    /// Delete after `confirm` agrees. Returns `Ok(false)` when declined, in
    /// which case the backend is never called.
    pub async fn delete_user(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<bool, ApiError> {
        if !confirm(id) {
            return Ok(false);
        }

        self.deleting.send_replace(Some(id.to_string()));
        let result = self.api.delete_user(id).await;
        self.deleting.send_replace(None);

        self.reload_after(result).await.map(|()| true)
    }

    /// The page is reloaded whatever the mutation returned; a failed mutation
    /// still ends in the error state.
    async fn reload_after<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        self.load_users().await;
        if let Err(e) = &result {
            self.fail(e.clone());
        }
        result
    }

    fn fail(&mut self, err: ApiError) {
        tracing::warn!(error = %err, "user listing failed");
        self.state = LoadState::Error(err.to_string());
    }
}

/// Check each record with the backend, one at a time and in order.
///
/// Records missing a hash or signature are dropped without a call; a record
/// whose check fails or errors is dropped too.
pub async fn verify_records<A: UserApi + ?Sized>(api: &A, records: Vec<User>) -> Vec<User> {
    let mut verified = Vec::with_capacity(records.len());

    for record in records {
        if !record.has_crypto_fields() {
            tracing::debug!(id = %record.id, "skipping record without signature");
            continue;
        }

        match api.verify_signature(&record.email_hash, &record.signature).await {
            Ok(true) => verified.push(record),
            Ok(false) => tracing::debug!(id = %record.id, "signature rejected"),
            Err(e) => tracing::debug!(id = %record.id, error = %e, "verification failed"),
        }
    }

    verified
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::controllers::fake::{user, FakeApi, Verify};
    use crate::types::{Role, Status};

    fn users(n: usize) -> Vec<User> {
        (1..=n)
            .map(|i| user(&i.to_string(), &format!("user{i}@example.com")))
            .collect()
    }

    #[tokio::test]
    async fn test_fifteen_users_two_pages() {
        let api = FakeApi::with_users(users(15));
        let mut listing = UserListing::new(&api, 10);

        listing.load_users().await;
        let p = listing.pagination().unwrap();
        assert_eq!((p.page, p.total_pages), (1, 2));
        assert_eq!(listing.visible_users().len(), 10);
        assert_eq!(listing.state(), &LoadState::Success);

        listing.set_page(2).await;
        let p = listing.pagination().unwrap();
        assert_eq!((p.page, p.total_pages), (2, 2));
        assert_eq!(listing.visible_users().len(), 5);
        assert_eq!(listing.visible_users()[0].id, "11");
    }

    #[tokio::test]
    async fn test_records_without_crypto_fields_are_hidden() {
        let mut all = users(3);
        all[0].email_hash.clear();
        all[1].signature.clear();
        let api = FakeApi::with_users(all);
        let mut listing = UserListing::new(&api, 10);

        listing.load_users().await;
        let ids: Vec<&str> = listing.visible_users().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);
        // no verification call for incomplete records
        assert_eq!(api.verify_calls.lock().unwrap().as_slice(), ["hash-3"]);
    }

    #[tokio::test]
    async fn test_rejected_and_failing_verifications_are_excluded() {
        let api = FakeApi::with_users(users(4))
            .verdict("2", Verify::Invalid)
            .verdict("3", Verify::Fail);
        let mut listing = UserListing::new(&api, 10);

        listing.load_users().await;
        let ids: Vec<&str> = listing.visible_users().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
        assert_eq!(listing.state(), &LoadState::Success);
        // total still reflects the server
        assert_eq!(listing.pagination().unwrap().total, 4);
    }

    #[tokio::test]
    async fn test_verification_runs_in_list_order() {
        let api = FakeApi::with_users(users(5)).verdict("4", Verify::Fail);
        let mut listing = UserListing::new(&api, 10);

        listing.load_users().await;
        assert_eq!(
            api.verify_calls.lock().unwrap().as_slice(),
            ["hash-1", "hash-2", "hash-3", "hash-4", "hash-5"]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_sets_error() {
        let api = FakeApi {
            fail_list: Some(ApiError::Network),
            ..FakeApi::default()
        };
        let mut listing = UserListing::new(&api, 10);

        listing.load_users().await;
        assert_eq!(
            listing.error(),
            Some("Network error: Unable to connect to server")
        );

        listing.dismiss_error();
        assert_eq!(listing.state(), &LoadState::Idle);
    }

    #[tokio::test]
    async fn test_filter_changes_reset_to_first_page() {
        let api = FakeApi::with_users(users(25));
        let mut listing = UserListing::new(&api, 10);

        listing.set_page(3).await;
        listing.set_search("user2").await;
        assert_eq!(listing.page(), 1);

        listing.set_page(2).await;
        listing.set_role_filter(RoleFilter::Admin).await;
        assert_eq!(listing.page(), 1);

        listing.set_page(2).await;
        listing.set_status_filter(StatusFilter::Inactive).await;
        assert_eq!(listing.page(), 1);

        assert_eq!(
            api.list_calls(),
            vec![(3, 10), (1, 10), (2, 10), (1, 10), (2, 10), (1, 10)]
        );
    }

    #[tokio::test]
    async fn test_filters_apply_to_current_page_only() {
        let mut all = users(12);
        all[0].role = Role::Admin;
        all[11].role = Role::Admin;
        all[2].status = Status::Inactive;
        let api = FakeApi::with_users(all);
        let mut listing = UserListing::new(&api, 10);

        listing.set_role_filter(RoleFilter::Admin).await;
        let ids: Vec<&str> = listing.visible_users().iter().map(|u| u.id.as_str()).collect();
        // user 12 is an admin too, but lives on page 2
        assert_eq!(ids, vec!["1"]);
        assert_eq!(listing.pagination().unwrap().total, 12);

        listing.set_role_filter(RoleFilter::All).await;
        listing.set_search("INACTIVE").await;
        let ids: Vec<&str> = listing.visible_users().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[tokio::test]
    async fn test_create_and_update_reload_current_page() {
        let api = FakeApi::with_users(users(2));
        let mut listing = UserListing::new(&api, 10);
        listing.load_users().await;

        let created = listing
            .create_user(&NewUser {
                email: "new@example.com".into(),
                role: Role::Admin,
                status: Status::Active,
            })
            .await
            .unwrap();
        assert_eq!(listing.verified_users().len(), 3);

        listing
            .update_user(
                &created.id,
                &UserUpdate {
                    status: Some(Status::Inactive),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(listing.verified_users()[2].status, Status::Inactive);
        assert_eq!(api.list_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let api = FakeApi::with_users(users(2));
        let mut listing = UserListing::new(&api, 10);

        let deleted = listing.delete_user("1", |_| false).await.unwrap();
        assert!(!deleted);
        assert!(api.delete_calls.lock().unwrap().is_empty());
        assert!(api.list_calls().is_empty());

        let deleted = listing.delete_user("1", |id| id == "1").await.unwrap();
        assert!(deleted);
        assert!(listing.deleting().is_none());
        assert_eq!(listing.verified_users().len(), 1);
    }

    #[tokio::test]
    async fn test_mutation_failure_sets_error() {
        let api = FakeApi {
            fail_mutations: Some(ApiError::Validation),
            ..FakeApi::with_users(users(1))
        };
        let mut listing = UserListing::new(&api, 10);

        let err = listing.delete_user("1", |_| true).await.unwrap_err();
        assert_eq!(err, ApiError::Validation);
        assert_eq!(listing.error(), Some("Please check your input and try again"));
        assert!(listing.deleting().is_none());
        // the page was still refreshed
        assert_eq!(api.list_calls().len(), 1);
        assert_eq!(listing.verified_users().len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_reports_id_while_pending() {
        let gate = Arc::new(Notify::new());
        let api = FakeApi {
            delete_gate: Some(gate.clone()),
            ..FakeApi::with_users(users(2))
        };
        let mut listing = UserListing::new(&api, 10);
        let mut busy = listing.subscribe_deleting();

        let observe = async {
            busy.changed().await.unwrap();
            let seen = busy.borrow_and_update().clone();
            // nothing was deleted yet
            assert_eq!(api.users.lock().unwrap().len(), 2);
            gate.notify_one();
            seen
        };
        let (deleted, seen) = tokio::join!(listing.delete_user("2", |_| true), observe);

        assert!(deleted.unwrap());
        assert_eq!(seen.as_deref(), Some("2"));
        assert!(listing.deleting().is_none());
        assert_eq!(listing.verified_users().len(), 1);
    }
}
