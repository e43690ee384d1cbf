//! # Warden Core
//!
//! `warden_core` provides the building blocks shared by every part of the Warden
//! authorization engine: the error hierarchy, the permission model, requester
//! identities and the role-mapping contract.
//!
//! ## Core Principles
//!
//! 1. **Materialized permissions**: Warden never parses or compiles rules. A
//!    permission is a concrete `(kind, actions, target)` value, and the only
//!    question ever asked of it is whether it *implies* another one.
//!
//! 2. **Implication as a partial order**: `a.implies(b)` holds when `a` grants at
//!    least everything `b` asks for. Wildcards in the kind, the action list and the
//!    target widen a permission:
//!    ```text
//!    file:*:/secrets/*  implies  file:read:/secrets/key
//!    ```
//!
//! 3. **Supplied identities**: Requesters arrive with identity claims that have
//!    already been authenticated elsewhere. A [`RoleMapper`] turns those claims into
//!    role names.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Warden components
//! - **permission**: The `Permission` value type and its implication relation
//! - **permission_set**: Collections of permissions with an `implies` query
//! - **identity**: Identity claims and the requesting `Subject`
//! - **role**: The `RoleMapper` contract and stock mappers

pub mod error;
pub mod identity;
pub mod permission;
pub mod permission_set;
pub mod role;

// Re-export key types and traits for convenience
pub use error::{Error, PolicyError, Result};
pub use identity::{Identity, Subject};
pub use permission::{ActionSet, Permission};
pub use permission_set::PermissionSet;
pub use role::{NameRoleMapper, RoleMapper, StaticRoleMapper};
