use super::PermissionEvaluator;

use crate::auth::GroupSet;
use crate::resource::{ResourceId, SEPARATOR};

use http::Method;
use serde::{Deserialize, Serialize};

/// Matches any group, any method, or (as a trailing character) any resource suffix.
pub const WILDCARD: &str = "*";

/// One grant: `group` may perform `methods` on `resource`.
///
/// - `resource` is either exact (`tenant-a/file.csv`) or ends with `*` to
///   match every resource starting with what precedes it (`tenant-a/*`).
///   A `prefix/*` pattern also matches the prefix-only resource `prefix`.
/// - `group` is a group name, or `*` for any caller including one without
///   groups.
/// - `methods` are HTTP method names compared case-insensitively; `*` allows
///   every method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub resource: String,
    pub group: String,
    pub methods: Vec<String>,
}

impl Rule {
    fn matches_resource(&self, resource: &ResourceId) -> bool {
        let id = resource.as_str();
        match self.resource.strip_suffix(WILDCARD) {
            Some(head) => id.starts_with(head) || head.strip_suffix(SEPARATOR) == Some(id),
            None => self.resource == id,
        }
    }

    fn matches_group(&self, groups: &GroupSet) -> bool {
        self.group == WILDCARD || groups.contains(&self.group)
    }

    fn matches_method(&self, method: &Method) -> bool {
        self.methods
            .iter()
            .any(|m| m == WILDCARD || m.eq_ignore_ascii_case(method.as_str()))
    }

    #[must_use]
    pub fn allows(&self, method: &Method, resource: &ResourceId, groups: &GroupSet) -> bool {
        self.matches_resource(resource) && self.matches_group(groups) && self.matches_method(method)
    }
}

/// An in-memory list of [`Rule`]s. Anything not granted is denied.
#[derive(Debug, Default, Clone)]
pub struct SimplePermissions {
    rules: Vec<Rule>,
}

impl SimplePermissions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn allow<I, M>(&mut self, resource: impl Into<String>, group: impl Into<String>, methods: I) -> &mut Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.rules.push(Rule {
            resource: resource.into(),
            group: group.into(),
            methods: methods.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn check(&self, method: &Method, resource: &ResourceId, groups: &GroupSet) -> bool {
        self.rules.iter().any(|rule| rule.allows(method, resource, groups))
    }
}

#[async_trait::async_trait]
impl PermissionEvaluator for SimplePermissions {
    async fn can(&self, method: &Method, resource: &ResourceId, groups: &GroupSet) -> bool {
        self.check(method, resource, groups)
    }
}
