//! Sink registration table.
//!
//! Insertion is check-and-set under the write lock, so two concurrent registrations
//! of the same sink can never both succeed. A registration's delivery mode lives in an
//! [`ArcSwap`]. Cookies are compared in constant time.

use crate::api::delivery::DeliveryMode;
use crate::control_plane::error::RegistrarError;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use uuid::Uuid;

pub(crate) struct Registration {
    sink: String,
    cookie: String,
    mode: ArcSwap<DeliveryMode>,
}

impl Registration {
    fn new(sink: &str, mode: DeliveryMode) -> Self {
        Self {
            sink: sink.to_string(),
            cookie: Uuid::new_v4().hyphenated().to_string(),
            mode: ArcSwap::from_pointee(mode),
        }
    }

    pub(crate) fn sink(&self) -> &str {
        &self.sink
    }

    pub(crate) fn cookie(&self) -> &str {
        &self.cookie
    }

    pub(crate) fn mode(&self) -> Arc<DeliveryMode> {
        self.mode.load_full()
    }

    pub(crate) fn set_mode(&self, mode: DeliveryMode) {
        self.mode.store(Arc::new(mode));
    }

    pub(crate) fn check_cookie(&self, cookie: &str) -> Result<(), RegistrarError> {
        if bool::from(self.cookie.as_bytes().ct_eq(cookie.as_bytes())) {
            Ok(())
        } else {
            Err(RegistrarError::BadCookie)
        }
    }
}

pub(crate) struct RegistrationTable {
    registrations: RwLock<HashMap<String, Arc<Registration>>>,
}

impl RegistrationTable {
    pub(crate) fn new() -> Self {
        Self {
            registrations: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn contains(&self, sink: &str) -> bool {
        self.registrations.read().await.contains_key(sink)
    }

    pub(crate) async fn get(&self, sink: &str) -> Option<Arc<Registration>> {
        self.registrations.read().await.get(sink).cloned()
    }

    /// Returns the new registration, or `None` if the sink already had one. An existing
    /// registration is never replaced.
    pub(crate) async fn insert_if_absent(
        &self,
        sink: &str,
        mode: DeliveryMode,
    ) -> Option<Arc<Registration>> {
        let mut registrations = self.registrations.write().await;
        if registrations.contains_key(sink) {
            return None;
        }
        let registration = Arc::new(Registration::new(sink, mode));
        registrations.insert(sink.to_string(), registration.clone());
        Some(registration)
    }

    /// Removes the registration only if `cookie` authorizes it; lookup, cookie check and
    /// removal happen under one write lock.
    pub(crate) async fn remove_authorized(
        &self,
        sink: &str,
        cookie: &str,
    ) -> Result<Arc<Registration>, RegistrarError> {
        let mut registrations = self.registrations.write().await;
        let Some(registration) = registrations.get(sink) else {
            return Err(RegistrarError::SinkNotRegistered(sink.to_string()));
        };
        registration.check_cookie(cookie)?;
        registrations
            .remove(sink)
            .ok_or_else(|| RegistrarError::SinkNotRegistered(sink.to_string()))
    }

    /// Swaps the delivery mode of the registration `cookie` authorizes, then runs
    /// `on_swapped` with the write lock still held.
    ///
    /// An unregister or re-register of `sink` cannot interleave, so `on_swapped` only
    /// ever sees the registration whose cookie was checked.
    pub(crate) async fn set_mode_authorized<F>(
        &self,
        sink: &str,
        cookie: &str,
        mode: DeliveryMode,
        on_swapped: F,
    ) -> Result<Arc<Registration>, RegistrarError>
    where
        F: FnOnce(&Registration),
    {
        let registrations = self.registrations.write().await;
        let Some(registration) = registrations.get(sink) else {
            return Err(RegistrarError::SinkNotRegistered(sink.to_string()));
        };
        registration.check_cookie(cookie)?;
        registration.set_mode(mode);
        on_swapped(registration);
        Ok(registration.clone())
    }

    /// Registration whose sink is the longest prefix of `requested_sink`.
    pub(crate) async fn longest_prefix_match(
        &self,
        requested_sink: &str,
    ) -> Option<Arc<Registration>> {
        self.registrations
            .read()
            .await
            .iter()
            .filter(|(sink, _)| requested_sink.starts_with(sink.as_str()))
            .max_by_key(|(sink, _)| sink.len())
            .map(|(_, registration)| registration.clone())
    }

    /// `(sink, mode)` pairs sorted by sink.
    pub(crate) async fn snapshot(&self) -> Vec<(String, Arc<DeliveryMode>)> {
        let mut rows: Vec<_> = self
            .registrations
            .read()
            .await
            .values()
            .map(|registration| (registration.sink.clone(), registration.mode()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    pub(crate) async fn len(&self) -> usize {
        self.registrations.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::RegistrationTable;
    use crate::api::delivery::DeliveryMode;
    use crate::control_plane::error::RegistrarError;
    use std::sync::Arc;

    struct Accepting;

    #[async_trait::async_trait]
    impl crate::api::delivery::ActiveRegistrationCallback for Accepting {
        async fn recv(
            &self,
            _bundle: &crate::bundle::Bundle,
        ) -> Result<(), crate::api::delivery::DeliveryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn insert_if_absent_never_replaces() {
        let table = RegistrationTable::new();

        let first = table
            .insert_if_absent("app", DeliveryMode::Passive)
            .await
            .expect("first insert");
        assert!(table.insert_if_absent("app", DeliveryMode::Passive).await.is_none());

        let current = table.get("app").await.expect("registered");
        assert_eq!(current.cookie(), first.cookie());
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn cookies_are_unique_per_registration() {
        let table = RegistrationTable::new();
        let a = table.insert_if_absent("a", DeliveryMode::Passive).await.expect("a");
        let b = table.insert_if_absent("b", DeliveryMode::Passive).await.expect("b");
        assert_ne!(a.cookie(), b.cookie());
        assert!(!a.cookie().is_empty());
    }

    #[tokio::test]
    async fn concurrent_inserts_for_one_sink_have_single_winner() {
        let table = Arc::new(RegistrationTable::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let table = table.clone();
            handles.push(tokio::spawn(async move {
                table.insert_if_absent("contended", DeliveryMode::Passive).await.is_some()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.expect("join") {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn remove_authorized_checks_cookie_before_removing() {
        let table = RegistrationTable::new();
        let registration = table
            .insert_if_absent("app", DeliveryMode::Passive)
            .await
            .expect("insert");

        assert_eq!(
            table.remove_authorized("app", "wrong").await.err(),
            Some(RegistrarError::BadCookie)
        );
        assert!(table.contains("app").await);

        assert!(table.remove_authorized("app", registration.cookie()).await.is_ok());
        assert_eq!(
            table.remove_authorized("app", registration.cookie()).await.err(),
            Some(RegistrarError::SinkNotRegistered("app".to_string()))
        );
    }

    #[test]
    fn cookie_check_rejects_near_misses() {
        let registration = super::Registration::new("app", DeliveryMode::Passive);
        let cookie = registration.cookie().to_string();
        assert!(registration.check_cookie(&cookie).is_ok());

        let mut same_length = cookie.clone().into_bytes();
        let last = same_length.len() - 1;
        same_length[last] = if same_length[last] == b'0' { b'1' } else { b'0' };
        let same_length = String::from_utf8(same_length).expect("ascii cookie");
        assert_eq!(
            registration.check_cookie(&same_length).err(),
            Some(RegistrarError::BadCookie)
        );

        assert_eq!(
            registration.check_cookie(&cookie[..cookie.len() - 1]).err(),
            Some(RegistrarError::BadCookie)
        );
        assert_eq!(
            registration.check_cookie(&format!("{cookie}0")).err(),
            Some(RegistrarError::BadCookie)
        );
        assert_eq!(
            registration.check_cookie("").err(),
            Some(RegistrarError::BadCookie)
        );
    }

    #[tokio::test]
    async fn set_mode_authorized_rejects_stale_cookie_after_reregistration() {
        let table = RegistrationTable::new();
        let stale = table
            .insert_if_absent("app", DeliveryMode::Passive)
            .await
            .expect("insert");
        table
            .remove_authorized("app", stale.cookie())
            .await
            .expect("remove");
        let current = table
            .insert_if_absent("app", DeliveryMode::Passive)
            .await
            .expect("reinsert");

        let mut swapped = false;
        let result = table
            .set_mode_authorized(
                "app",
                stale.cookie(),
                DeliveryMode::Active(Arc::new(Accepting)),
                |_| swapped = true,
            )
            .await;
        assert_eq!(result.err(), Some(RegistrarError::BadCookie));
        assert!(!swapped);
        assert!(!current.mode().is_active());

        let stored = table
            .set_mode_authorized(
                "app",
                current.cookie(),
                DeliveryMode::Active(Arc::new(Accepting)),
                |registration| swapped = registration.mode().is_active(),
            )
            .await
            .expect("authorized");
        assert!(swapped);
        assert!(Arc::ptr_eq(&stored, &current));
        assert!(current.mode().is_active());
    }

    #[tokio::test]
    async fn set_mode_authorized_on_missing_sink_runs_nothing() {
        let table = RegistrationTable::new();
        let mut swapped = false;
        let result = table
            .set_mode_authorized("ghost", "cookie", DeliveryMode::Passive, |_| swapped = true)
            .await;
        assert_eq!(
            result.err(),
            Some(RegistrarError::SinkNotRegistered("ghost".to_string()))
        );
        assert!(!swapped);
    }

    #[tokio::test]
    async fn mode_swaps_never_interleave_with_removal() {
        let table = Arc::new(RegistrationTable::new());
        let registration = table
            .insert_if_absent("app", DeliveryMode::Passive)
            .await
            .expect("insert");
        let cookie = registration.cookie().to_string();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let table = table.clone();
            let cookie = cookie.clone();
            handles.push(tokio::spawn(async move {
                let observer = table.clone();
                table
                    .set_mode_authorized(
                        "app",
                        &cookie,
                        DeliveryMode::Active(Arc::new(Accepting)),
                        |registration| {
                            // Removal needs the write lock, which is held here.
                            assert!(observer.registrations.try_read().is_err());
                            assert_eq!(registration.sink(), "app");
                        },
                    )
                    .await
                    .is_ok()
            }));
        }
        let remover = {
            let table = table.clone();
            tokio::spawn(async move { table.remove_authorized("app", &cookie).await.is_ok() })
        };

        assert!(remover.await.expect("join"));
        for handle in handles {
            handle.await.expect("join");
        }
        assert!(!table.contains("app").await);
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let table = RegistrationTable::new();
        table.insert_if_absent("app", DeliveryMode::Passive).await;
        table.insert_if_absent("app/sub", DeliveryMode::Passive).await;

        let matched = table.longest_prefix_match("app/sub/inbox").await.expect("match");
        assert_eq!(matched.sink(), "app/sub");

        let matched = table.longest_prefix_match("app/other").await.expect("match");
        assert_eq!(matched.sink(), "app");

        assert!(table.longest_prefix_match("other").await.is_none());
    }

    #[tokio::test]
    async fn mode_swap_is_visible_through_every_handle() {
        let table = RegistrationTable::new();
        let registration = table
            .insert_if_absent("app", DeliveryMode::Passive)
            .await
            .expect("insert");
        assert!(!registration.mode().is_active());

        let stored = table.get("app").await.expect("registered");
        stored.set_mode(DeliveryMode::Active(Arc::new(Accepting)));
        assert!(registration.mode().is_active());

        let snapshot = table.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].1.is_active());
    }
}
