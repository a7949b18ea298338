//! Backend traits and data types.
//!
//! The two external collaborators of the authentication core are modelled as
//! async traits. Implement them to plug in your own database driver or
//! directory client.
//!
//! # Traits
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`RelationalStore`] | Guest authentication, audit rows and membership queries |
//! | [`DirectoryService`] | Search-and-bind for institutional accounts |
//!
//! # Data Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DirectorySearch`] | Base DN, scope, escaped filter and attributes for one bind |
//! | [`DirectoryEntry`] | The bound entry and its requested attribute values |
//! | [`DirectoryError`] | Bind failure classes |
//!
//! # Mock Implementations
//!
//! Enable the `mocks` feature for in-memory implementations useful for testing:
//!
//! - [`MockRelationalStore`]
//! - [`MockDirectoryService`]

mod directory;
mod relational;

#[cfg(any(test, feature = "mocks"))]
mod directory_mock;
#[cfg(any(test, feature = "mocks"))]
mod relational_mock;

pub use directory::DirectoryEntry;
pub use directory::DirectoryError;
pub use directory::DirectorySearch;
pub use directory::DirectoryService;
pub use directory::build_user_filter;
pub use directory::escape_filter_value;
pub use relational::RelationalStore;
pub use relational::flag_from_text;

#[cfg(any(test, feature = "mocks"))]
pub use directory_mock::{MockAccount, MockDirectoryService};
#[cfg(any(test, feature = "mocks"))]
pub use relational_mock::MockRelationalStore;
