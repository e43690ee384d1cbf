//! Policy contexts.
//!
//! A [`PolicyContext`] is a named container of three permission tiers:
//!
//! - **excluded**: permissions nobody may hold, whatever else says so
//! - **unchecked**: permissions every requester holds
//! - **per-role**: permissions granted to the holders of a role
//!
//! A context moves through a small lifecycle. It is configured while
//! [`State::Open`], answers decisions while [`State::InService`], and is wiped
//! when [`State::Deleted`]:
//!
//! ```text
//!            commit                 open_and_clear
//!   Open ───────────────▶ InService ───────────────▶ Open
//!    │                       │
//!    │ delete                │ delete
//!    ▼                       ▼
//!  Deleted ◀─────────────────┘
//!    │ open_and_clear
//!    ▼
//!   Open
//! ```
//!
//! Every context owns one read-write lock. Mutations take the write lock.
//! Decision reads go through a [`PolicyView`], which holds the read lock for as
//! long as it lives, so a whole evaluation sees one consistent configuration.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use warden_core::error::{Error, PolicyError, Result};
use warden_core::{Identity, Permission, PermissionSet, RoleMapper};

/// The role name that, when no role by that literal name exists, stands for every role.
pub const ALL_ROLES: &str = "*";

/// Lifecycle state of a policy context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Accepting configuration
    Open,

    /// Answering decisions
    InService,

    /// Wiped; only `open_and_clear` leaves this state
    Deleted,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Open => write!(f, "open"),
            State::InService => write!(f, "in service"),
            State::Deleted => write!(f, "deleted"),
        }
    }
}

/// Everything guarded by the context lock.
#[derive(Debug)]
struct ContextData {
    state: State,
    excluded: Option<PermissionSet>,
    unchecked: Option<PermissionSet>,
    roles: HashMap<String, PermissionSet>,
    linked: BTreeSet<String>,
    role_mapper: Option<Arc<dyn RoleMapper>>,
}

impl ContextData {
    fn wipe(&mut self) {
        self.excluded = None;
        self.unchecked = None;
        self.roles.clear();
        self.linked.clear();
    }
}

/// A named, lockable policy configuration.
pub struct PolicyContext {
    id: String,
    data: RwLock<ContextData>,
}

impl PolicyContext {
    /// Create a new, empty context in the [`State::Open`] state.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: RwLock::new(ContextData {
                state: State::Open,
                excluded: None,
                unchecked: None,
                roles: HashMap::new(),
                linked: BTreeSet::new(),
                role_mapper: None,
            }),
        }
    }

    /// Create a new context that resolves roles through the given mapper.
    pub fn with_role_mapper(id: impl Into<String>, mapper: Arc<dyn RoleMapper>) -> Self {
        let context = Self::new(id);
        context.data.write().role_mapper = Some(mapper);
        context
    }

    /// The context identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Take the read lock and return a view for decision reads.
    ///
    /// The lock is acquired recursively, so a view may be taken on a thread that
    /// already holds one without deadlocking behind a queued writer.
    pub fn read(&self) -> PolicyView<'_> {
        PolicyView {
            id: &self.id,
            data: self.data.read_recursive(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.data.read_recursive().state
    }

    /// Whether the context is accepting configuration.
    pub fn is_open(&self) -> bool {
        self.state() == State::Open
    }

    /// Whether the context is answering decisions.
    pub fn in_service(&self) -> bool {
        self.state() == State::InService
    }

    /// Replace the role mapper. Allowed in every state.
    pub fn set_role_mapper(&self, mapper: Option<Arc<dyn RoleMapper>>) {
        self.data.write().role_mapper = mapper;
    }

    /// The configured role mapper, if any.
    pub fn role_mapper(&self) -> Option<Arc<dyn RoleMapper>> {
        self.data.read_recursive().role_mapper.clone()
    }

    // ----- configuration ---------------------------------------------------

    fn write_open(&self) -> Result<RwLockWriteGuard<'_, ContextData>> {
        let data = self.data.write();
        if data.state != State::Open {
            return Err(PolicyError::Configuration {
                context: self.id.clone(),
                state: data.state.to_string(),
            }
            .into());
        }
        Ok(data)
    }

    /// Add a permission to the excluded tier.
    pub fn add_excluded(&self, permission: Permission) -> Result<()> {
        let mut data = self.write_open()?;
        data.excluded
            .get_or_insert_with(PermissionSet::new)
            .add(permission);
        Ok(())
    }

    /// Add every permission of a set to the excluded tier.
    pub fn add_excluded_all(&self, permissions: &PermissionSet) -> Result<()> {
        let mut data = self.write_open()?;
        if !permissions.is_empty() {
            data.excluded
                .get_or_insert_with(PermissionSet::new)
                .add_all(permissions);
        }
        Ok(())
    }

    /// Add a permission to the unchecked tier.
    pub fn add_unchecked(&self, permission: Permission) -> Result<()> {
        let mut data = self.write_open()?;
        data.unchecked
            .get_or_insert_with(PermissionSet::new)
            .add(permission);
        Ok(())
    }

    /// Add every permission of a set to the unchecked tier.
    pub fn add_unchecked_all(&self, permissions: &PermissionSet) -> Result<()> {
        let mut data = self.write_open()?;
        if !permissions.is_empty() {
            data.unchecked
                .get_or_insert_with(PermissionSet::new)
                .add_all(permissions);
        }
        Ok(())
    }

    /// Grant a permission to a role.
    pub fn add_to_role(&self, role: impl Into<String>, permission: Permission) -> Result<()> {
        let mut data = self.write_open()?;
        data.roles.entry(role.into()).or_default().add(permission);
        Ok(())
    }

    /// Grant every permission of a set to a role.
    pub fn add_all_to_role(&self, role: impl Into<String>, permissions: &PermissionSet) -> Result<()> {
        let mut data = self.write_open()?;
        if !permissions.is_empty() {
            data.roles.entry(role.into()).or_default().add_all(permissions);
        }
        Ok(())
    }

    /// Drop the excluded tier.
    pub fn remove_excluded(&self) -> Result<()> {
        self.write_open()?.excluded = None;
        Ok(())
    }

    /// Drop the unchecked tier.
    pub fn remove_unchecked(&self) -> Result<()> {
        self.write_open()?.unchecked = None;
        Ok(())
    }

    /// Remove a role and its permissions.
    ///
    /// [`ALL_ROLES`] removes a role literally named `*` when one exists, and
    /// every role otherwise.
    pub fn remove_role(&self, role: &str) -> Result<()> {
        let mut data = self.write_open()?;
        if data.roles.remove(role).is_none() && role == ALL_ROLES {
            data.roles.clear();
        }
        Ok(())
    }

    /// Record that this context is linked to another one.
    ///
    /// Links are bookkeeping only; they do not change how decisions are made.
    pub fn link_configuration(&self, other: impl Into<String>) -> Result<()> {
        let other = other.into();
        let mut data = self.write_open()?;
        debug!(context = %self.id, linked = %other, "Linked policy context");
        data.linked.insert(other);
        Ok(())
    }

    /// Identifiers of linked contexts.
    pub fn linked(&self) -> Vec<String> {
        self.data.read_recursive().linked.iter().cloned().collect()
    }

    // ----- lifecycle -------------------------------------------------------

    /// Return to [`State::Open`] without clearing anything.
    ///
    /// Fails on a deleted context; use [`PolicyContext::open_and_clear`] to
    /// revive one.
    pub fn open(&self) -> Result<()> {
        let mut data = self.data.write();
        if data.state == State::Deleted {
            return Err(PolicyError::Configuration {
                context: self.id.clone(),
                state: data.state.to_string(),
            }
            .into());
        }
        data.state = State::Open;
        debug!(context = %self.id, "Policy context opened");
        Ok(())
    }

    /// Wipe every tier and return to [`State::Open`].
    pub fn open_and_clear(&self) {
        self.reopen(true);
    }

    /// Reopen under a single write lock, wiping when asked to or when deleted.
    pub(crate) fn reopen(&self, clear: bool) {
        let mut data = self.data.write();
        if clear || data.state == State::Deleted {
            data.wipe();
        }
        data.state = State::Open;
        debug!(context = %self.id, clear, "Policy context reopened");
    }

    /// Wipe every tier and move to the terminal [`State::Deleted`].
    pub fn delete(&self) {
        let mut data = self.data.write();
        data.wipe();
        data.state = State::Deleted;
        debug!(context = %self.id, "Policy context deleted");
    }

    /// Put the context in service. Idempotent once in service.
    pub fn commit(&self) -> Result<()> {
        let mut data = self.data.write();
        if data.state == State::Deleted {
            return Err(PolicyError::Configuration {
                context: self.id.clone(),
                state: data.state.to_string(),
            }
            .into());
        }
        data.state = State::InService;
        debug!(context = %self.id, "Policy context committed");
        Ok(())
    }

    // ----- decision reads --------------------------------------------------

    /// See [`PolicyView::excludes`].
    pub fn excludes<'p>(&self, permission: impl Into<Option<&'p Permission>>) -> Result<bool> {
        self.read().excludes(permission)
    }

    /// See [`PolicyView::mandates`].
    pub fn mandates<'p>(&self, permission: impl Into<Option<&'p Permission>>) -> Result<bool> {
        self.read().mandates(permission)
    }

    /// See [`PolicyView::grants`].
    pub fn grants<'p>(
        &self,
        permission: impl Into<Option<&'p Permission>>,
        identities: &[Identity],
    ) -> Result<bool> {
        self.read().grants(permission, identities)
    }

    /// See [`PolicyView::roles_for`].
    pub fn roles_for(&self, identities: &[Identity]) -> Result<HashSet<String>> {
        self.read().roles_for(identities)
    }

    /// See [`PolicyView::resolved_permissions`].
    pub fn resolved_permissions(
        &self,
        delegate: Option<&PermissionSet>,
        domain: Option<&PermissionSet>,
        identities: &[Identity],
    ) -> Result<PermissionSet> {
        self.read()
            .resolved_permissions(delegate, domain, identities)
    }

    /// Snapshot of the excluded tier. Only while in service.
    pub fn excluded_policy(&self) -> Result<Option<PermissionSet>> {
        Ok(self.read().excluded_policy()?.cloned())
    }

    /// Snapshot of the unchecked tier. Only while in service.
    pub fn unchecked_policy(&self) -> Result<Option<PermissionSet>> {
        Ok(self.read().unchecked_policy()?.cloned())
    }

    /// Snapshot of the per-role tier. Only while in service.
    pub fn roles(&self) -> Result<HashMap<String, PermissionSet>> {
        Ok(self.read().roles()?.clone())
    }
}

impl fmt::Debug for PolicyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.data.try_read_recursive().map(|data| data.state);
        f.debug_struct("PolicyContext")
            .field("id", &self.id)
            .field("state", &state)
            .finish()
    }
}

impl fmt::Display for PolicyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A read-locked view of a policy context.
///
/// Holds the context's read lock until dropped. Evaluators receive a view so that
/// every read they make during one evaluation sees the same configuration.
pub struct PolicyView<'a> {
    id: &'a str,
    data: RwLockReadGuard<'a, ContextData>,
}

impl<'a> PolicyView<'a> {
    /// The context identifier.
    pub fn id(&self) -> &str {
        self.id
    }

    /// Lifecycle state at the time the view was taken.
    pub fn state(&self) -> State {
        self.data.state
    }

    fn check_in_service(&self) -> Result<()> {
        if self.data.state != State::InService {
            return Err(PolicyError::State {
                context: self.id.to_string(),
                state: self.data.state.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The excluded tier. Only while in service.
    pub fn excluded_policy(&self) -> Result<Option<&PermissionSet>> {
        self.check_in_service()?;
        Ok(self.data.excluded.as_ref())
    }

    /// The unchecked tier. Only while in service.
    pub fn unchecked_policy(&self) -> Result<Option<&PermissionSet>> {
        self.check_in_service()?;
        Ok(self.data.unchecked.as_ref())
    }

    /// The per-role tier. Only while in service.
    pub fn roles(&self) -> Result<&HashMap<String, PermissionSet>> {
        self.check_in_service()?;
        Ok(&self.data.roles)
    }

    /// Whether the permission is excluded.
    ///
    /// An absent permission is always excluded. Otherwise a permission is
    /// excluded when the excluded tier implies it, or when it implies any member
    /// of the excluded tier: asking for something broader than an exclusion is
    /// asking for the exclusion too.
    pub fn excludes<'p>(&self, permission: impl Into<Option<&'p Permission>>) -> Result<bool> {
        let Some(permission) = permission.into() else {
            return Ok(true);
        };
        trace!(context = %self.id, %permission, "excludes");

        let result = match self.excluded_policy()? {
            None => false,
            Some(excluded) => {
                excluded.implies(permission)
                    || excluded.iter().any(|member| permission.implies(member))
            }
        };

        trace!(context = %self.id, %permission, result, "excludes returned");
        Ok(result)
    }

    /// Whether the permission is granted to every requester.
    ///
    /// Never true for an absent or excluded permission.
    pub fn mandates<'p>(&self, permission: impl Into<Option<&'p Permission>>) -> Result<bool> {
        let Some(permission) = permission.into() else {
            return Ok(false);
        };
        trace!(context = %self.id, %permission, "mandates");

        if self.excludes(permission)? {
            return Ok(false);
        }
        let result = self
            .unchecked_policy()?
            .is_some_and(|unchecked| unchecked.implies(permission));

        trace!(context = %self.id, %permission, result, "mandates returned");
        Ok(result)
    }

    /// Roles bound to the identities by the context's role mapper.
    ///
    /// Empty when the context has no mapper. Not gated on the lifecycle state.
    /// A mapper failure surfaces as [`PolicyError::Evaluation`].
    pub fn roles_for(&self, identities: &[Identity]) -> Result<HashSet<String>> {
        let roles = match &self.data.role_mapper {
            Some(mapper) => mapper.roles(identities).map_err(|err| match err {
                err @ Error::Policy(PolicyError::Evaluation(_)) => err,
                other => Error::from(PolicyError::Evaluation(format!(
                    "role mapper failed in '{}': {}",
                    self.id, other
                ))),
            })?,
            None => HashSet::new(),
        };
        debug!(context = %self.id, ?identities, ?roles, "Resolved roles");
        Ok(roles)
    }

    /// Whether some role held by the identities grants the permission.
    pub fn grants<'p>(
        &self,
        permission: impl Into<Option<&'p Permission>>,
        identities: &[Identity],
    ) -> Result<bool> {
        let permission = permission.into();
        if self.excludes(permission)? {
            return Ok(false);
        }
        let Some(permission) = permission else {
            return Ok(false);
        };
        trace!(context = %self.id, %permission, "grants");

        let per_role = self.roles()?;
        if per_role.is_empty() {
            trace!(context = %self.id, "No role policy");
            return Ok(false);
        }

        let result = self
            .roles_for(identities)?
            .iter()
            .filter_map(|role| per_role.get(role))
            .any(|granted| granted.implies(permission));

        trace!(context = %self.id, %permission, result, "grants returned");
        Ok(result)
    }

    /// Every non-excluded permission held through this context.
    ///
    /// The union of `delegate`, `domain`, the unchecked tier and, when any
    /// identities are supplied, the sets of every role they resolve to. Only
    /// while in service.
    pub fn resolved_permissions(
        &self,
        delegate: Option<&PermissionSet>,
        domain: Option<&PermissionSet>,
        identities: &[Identity],
    ) -> Result<PermissionSet> {
        self.check_in_service()?;
        let mut resolved = PermissionSet::new();

        let mut collect = |source: &PermissionSet| -> Result<()> {
            for permission in source {
                if !self.excludes(permission)? {
                    resolved.add(permission.clone());
                }
            }
            Ok(())
        };

        if let Some(delegate) = delegate {
            collect(delegate)?;
        }
        if let Some(domain) = domain {
            collect(domain)?;
        }
        if let Some(unchecked) = self.data.unchecked.as_ref() {
            collect(unchecked)?;
        }
        if !identities.is_empty() {
            for role in self.roles_for(identities)? {
                if let Some(granted) = self.data.roles.get(&role) {
                    collect(granted)?;
                }
            }
        }

        trace!(context = %self.id, permissions = %resolved, "resolved permissions");
        Ok(resolved)
    }
}

impl fmt::Debug for PolicyView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyView")
            .field("id", &self.id)
            .field("state", &self.data.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::NameRoleMapper;

    fn perm(input: &str) -> Permission {
        Permission::parse(input).unwrap()
    }

    fn in_service(configure: impl FnOnce(&PolicyContext)) -> PolicyContext {
        let context = PolicyContext::with_role_mapper("app", Arc::new(NameRoleMapper));
        configure(&context);
        context.commit().unwrap();
        context
    }

    fn is_configuration_error(result: Result<()>) -> bool {
        matches!(result, Err(Error::Policy(PolicyError::Configuration { .. })))
    }

    #[test]
    fn test_absent_permission_is_excluded_in_every_state() {
        let context = PolicyContext::new("app");
        assert!(context.excludes(None).unwrap());
        context.commit().unwrap();
        assert!(context.excludes(None).unwrap());
        assert!(!context.mandates(None).unwrap());
        assert!(!context.grants(None, &[Identity::principal("admin")]).unwrap());
    }

    #[test]
    fn test_empty_exclusions_exclude_nothing() {
        let context = in_service(|_| {});
        assert!(!context.excludes(&perm("file:*:*")).unwrap());
    }

    #[test]
    fn test_exclusion_is_bidirectional() {
        let context = in_service(|c| c.add_excluded(perm("file:read:/secrets/key")).unwrap());

        // Broader than an exclusion
        assert!(context.excludes(&perm("file:*:/secrets/*")).unwrap());
        // Exactly an exclusion
        assert!(context.excludes(&perm("file:read:/secrets/key")).unwrap());
        // Unrelated
        assert!(!context.excludes(&perm("file:read:/tmp/x")).unwrap());
    }

    #[test]
    fn test_mandates_never_excluded() {
        let context = in_service(|c| {
            c.add_unchecked(perm("read:*")).unwrap();
            c.add_excluded(perm("read:private")).unwrap();
        });

        assert!(context.mandates(&perm("read:public")).unwrap());
        assert!(!context.mandates(&perm("read:private")).unwrap());
        assert!(!context.mandates(&perm("write:public")).unwrap());
    }

    #[test]
    fn test_grants_through_roles() {
        let context = in_service(|c| {
            c.add_to_role("admin", perm("write:*")).unwrap();
            c.add_excluded(perm("write:audit-log")).unwrap();
        });

        let admin = [Identity::principal("admin")];
        let guest = [Identity::principal("guest")];
        assert!(context.grants(&perm("write:any"), &admin).unwrap());
        assert!(!context.grants(&perm("write:any"), &guest).unwrap());
        assert!(!context.grants(&perm("write:audit-log"), &admin).unwrap());
    }

    #[test]
    fn test_grants_without_role_policy_or_mapper() {
        let context = in_service(|_| {});
        assert!(!context
            .grants(&perm("read:x"), &[Identity::principal("admin")])
            .unwrap());

        let unmapped = PolicyContext::new("plain");
        unmapped.add_to_role("admin", perm("read:x")).unwrap();
        unmapped.commit().unwrap();
        assert!(unmapped
            .roles_for(&[Identity::principal("admin")])
            .unwrap()
            .is_empty());
        assert!(!unmapped
            .grants(&perm("read:x"), &[Identity::principal("admin")])
            .unwrap());
    }

    #[derive(Debug)]
    struct UnreachableDirectory;

    impl RoleMapper for UnreachableDirectory {
        fn roles(&self, _identities: &[Identity]) -> Result<HashSet<String>> {
            Err(Error::Config("directory unreachable".to_string()))
        }
    }

    #[test]
    fn test_role_mapper_failure_is_evaluation_error() {
        let context = PolicyContext::with_role_mapper("app", Arc::new(UnreachableDirectory));
        context.add_to_role("admin", perm("write:*")).unwrap();
        context.commit().unwrap();

        let admin = [Identity::principal("admin")];
        match context.roles_for(&admin) {
            Err(Error::Policy(PolicyError::Evaluation(msg))) => {
                assert!(msg.contains("directory unreachable"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            context.grants(&perm("write:any"), &admin),
            Err(Error::Policy(PolicyError::Evaluation(_)))
        ));
    }

    #[test]
    fn test_reads_outside_service_are_state_errors() {
        let context = PolicyContext::new("app");
        let result = context.excludes(&perm("read:x"));
        assert!(matches!(result, Err(Error::Policy(PolicyError::State { .. }))));
        assert!(context.excluded_policy().is_err());
        assert!(context.unchecked_policy().is_err());
        assert!(context.roles().is_err());
        assert!(context.resolved_permissions(None, None, &[]).is_err());
    }

    #[test]
    fn test_mutations_require_open() {
        let context = in_service(|_| {});
        assert!(is_configuration_error(context.add_excluded(perm("read:x"))));
        assert!(is_configuration_error(context.add_unchecked(perm("read:x"))));
        assert!(is_configuration_error(context.add_to_role("r", perm("read:x"))));
        assert!(is_configuration_error(context.add_excluded_all(&PermissionSet::new())));
        assert!(is_configuration_error(context.remove_excluded()));
        assert!(is_configuration_error(context.remove_unchecked()));
        assert!(is_configuration_error(context.remove_role("r")));
        assert!(is_configuration_error(context.link_configuration("other")));
    }

    #[test]
    fn test_deleted_is_terminal_until_open_and_clear() {
        let context = in_service(|c| c.add_unchecked(perm("read:x")).unwrap());
        context.delete();
        assert_eq!(context.state(), State::Deleted);

        assert!(is_configuration_error(context.add_unchecked(perm("read:y"))));
        assert!(is_configuration_error(context.commit()));
        assert!(is_configuration_error(context.open()));

        context.open_and_clear();
        assert!(context.is_open());
        context.commit().unwrap();
        assert!(context.unchecked_policy().unwrap().is_none());
        assert!(context.roles().unwrap().is_empty());
    }

    #[test]
    fn test_open_and_clear_from_service() {
        let context = in_service(|c| {
            c.add_excluded(perm("read:x")).unwrap();
            c.add_to_role("admin", perm("read:y")).unwrap();
            c.link_configuration("other").unwrap();
        });

        context.open_and_clear();
        assert_eq!(context.state(), State::Open);
        assert!(context.linked().is_empty());

        context.commit().unwrap();
        assert!(context.excluded_policy().unwrap().is_none());
        assert!(context.roles().unwrap().is_empty());
    }

    #[test]
    fn test_commit_is_idempotent_and_open_keeps_data() {
        let context = in_service(|c| c.add_unchecked(perm("read:x")).unwrap());
        context.commit().unwrap();
        assert!(context.in_service());

        context.open().unwrap();
        context.add_unchecked(perm("read:y")).unwrap();
        context.commit().unwrap();
        assert_eq!(context.unchecked_policy().unwrap().map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_remove_role_wildcard() {
        let context = PolicyContext::new("app");
        context.add_to_role("admin", perm("read:a")).unwrap();
        context.add_to_role("*", perm("read:b")).unwrap();

        // The literal "*" role is removed, "admin" survives
        context.remove_role(ALL_ROLES).unwrap();
        context.commit().unwrap();
        let roles = context.roles().unwrap();
        assert!(roles.contains_key("admin"));
        assert!(!roles.contains_key("*"));

        context.open().unwrap();
        context.remove_role(ALL_ROLES).unwrap();
        context.commit().unwrap();
        assert!(context.roles().unwrap().is_empty());
    }

    #[test]
    fn test_resolved_permissions() {
        let context = in_service(|c| {
            c.add_excluded(perm("file:*:/secrets/*")).unwrap();
            c.add_unchecked(perm("read:public")).unwrap();
            c.add_to_role("admin", perm("write:any")).unwrap();
            c.add_to_role("admin", perm("file:read:/secrets/key")).unwrap();
        });

        let delegate = PermissionSet::parse_all(["net:connect:*"]).unwrap();
        let domain = PermissionSet::parse_all(["file:read:/secrets/other"]).unwrap();

        let resolved = context
            .resolved_permissions(Some(&delegate), Some(&domain), &[Identity::principal("admin")])
            .unwrap();
        let expected =
            PermissionSet::parse_all(["net:connect:*", "read:public", "write:any"]).unwrap();
        assert_eq!(resolved, expected);

        // No identities, no role permissions
        let resolved = context.resolved_permissions(None, None, &[]).unwrap();
        assert_eq!(resolved, PermissionSet::parse_all(["read:public"]).unwrap());
    }

    #[test]
    fn test_nested_views() {
        let context = in_service(|c| c.add_unchecked(perm("read:x")).unwrap());
        let outer = context.read();
        let inner = context.read();
        assert!(outer.mandates(&perm("read:x")).unwrap());
        assert!(inner.mandates(&perm("read:x")).unwrap());
        assert_eq!(outer.id(), "app");
    }
}
