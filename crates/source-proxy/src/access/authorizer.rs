use super::PermissionEvaluator;

use crate::auth::{ApiKey, KeyResolver};
use crate::error::ProxyResult;
use crate::resource::{ResourceId, address};

use std::fmt;

use http::Method;
use tracing::{debug, warn};

/// The access gate run before every object operation.
pub struct Authorizer {
    keys: Box<dyn KeyResolver>,
    permissions: Box<dyn PermissionEvaluator>,
}

impl Authorizer {
    #[must_use]
    pub fn new(keys: impl KeyResolver, permissions: impl PermissionEvaluator) -> Self {
        Self::from_parts(Box::new(keys), Box::new(permissions))
    }

    pub(crate) fn from_parts(keys: Box<dyn KeyResolver>, permissions: Box<dyn PermissionEvaluator>) -> Self {
        Self { keys, permissions }
    }

    /// Decides whether the holder of `api_key` may perform `method` on
    /// `prefix`/`filename`, returning the resource on success.
    ///
    /// A denial is logged on the `source_proxy::audit` target with the last
    /// four characters of the key. The full key is never logged.
    ///
    /// # Errors
    /// - `MissingCredential` if `api_key` is empty
    /// - `InvalidAddress` if the resource cannot be formed
    /// - `Forbidden` if the permission check fails
    pub async fn authorize(&self, api_key: &str, method: &Method, prefix: &str, filename: &str) -> ProxyResult<ResourceId> {
        if api_key.is_empty() {
            return Err(proxy_error!(MissingCredential, "apikey is required"));
        }

        let resource = address(prefix, filename)?;

        let api_key = ApiKey::from(api_key);
        let groups = self.keys.groups(&api_key).await;

        if !self.permissions.can(method, &resource, &groups).await {
            warn!(
                target: "source_proxy::audit",
                prefix,
                filename,
                %resource,
                api_key = api_key.last_four(),
                "forbidden request"
            );
            return Err(proxy_error!(Forbidden));
        }

        debug!(%method, %resource, groups = groups.len(), "authorized");
        Ok(resource)
    }
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ProxyErrorCode;
    use crate::auth::GroupSet;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedGroups(GroupSet);

    #[async_trait::async_trait]
    impl KeyResolver for FixedGroups {
        async fn groups(&self, _: &ApiKey) -> GroupSet {
            self.0.clone()
        }
    }

    #[derive(Clone)]
    struct Answer {
        allow: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Answer {
        fn new(allow: bool) -> Self {
            Self {
                allow,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait::async_trait]
    impl PermissionEvaluator for Answer {
        async fn can(&self, _: &Method, _: &ResourceId, _: &GroupSet) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.allow
        }
    }

    fn groups(names: &[&str]) -> GroupSet {
        names.iter().map(|&s| s.to_owned()).collect()
    }

    #[tokio::test]
    async fn empty_key_is_missing_credential() {
        let answer = Answer::new(true);
        let authorizer = Authorizer::new(FixedGroups(groups(&["readers"])), answer.clone());

        let err = authorizer.authorize("", &Method::GET, "tenant-a", "file.csv").await.unwrap_err();
        assert_eq!(err.code(), ProxyErrorCode::MissingCredential);
        assert_eq!(answer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_address_is_checked_before_permissions() {
        let answer = Answer::new(true);
        let authorizer = Authorizer::new(FixedGroups(GroupSet::new()), answer.clone());

        let err = authorizer.authorize("key-0001", &Method::GET, "", "file.csv").await.unwrap_err();
        assert_eq!(err.code(), ProxyErrorCode::InvalidAddress);
        assert_eq!(answer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denied_is_forbidden() {
        let answer = Answer::new(false);
        let authorizer = Authorizer::new(FixedGroups(groups(&["readers"])), answer.clone());

        let err = authorizer
            .authorize("key-0001", &Method::DELETE, "tenant-a", "file.csv")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProxyErrorCode::Forbidden);
        assert!(!err.to_string().contains("key-0001"));
        assert_eq!(answer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn allowed_returns_resource_for_any_group_count() {
        for set in [GroupSet::new(), groups(&["readers"]), groups(&["a", "b", "c"])] {
            let authorizer = Authorizer::new(FixedGroups(set), Answer::new(true));
            let resource = authorizer
                .authorize("key-0001", &Method::GET, "tenant-a", "file.csv")
                .await
                .unwrap();
            assert_eq!(resource.as_str(), "tenant-a/file.csv");
        }
    }

    #[tokio::test]
    async fn short_key_does_not_panic() {
        let authorizer = Authorizer::new(FixedGroups(GroupSet::new()), Answer::new(false));
        let err = authorizer.authorize("k", &Method::GET, "tenant-a", "").await.unwrap_err();
        assert_eq!(err.code(), ProxyErrorCode::Forbidden);
    }
}
